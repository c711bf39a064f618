use crate::app::{App, MenuItem};
use crate::state::messages::NetworkRequest;
use crossterm::event::KeyCode::Char;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use raynu_api::auth::AdminSection;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

pub async fn handle_key_bindings(
    key_event: KeyEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
) {
    let mut guard = app.lock().await;

    let request = if guard.state.notice.is_some() {
        guard.dismiss_notice();
        None
    } else if guard.state.admin.confirm.is_some() {
        handle_confirm(key_event, &mut guard)
    } else if guard.state.admin.form.is_some() {
        handle_form(key_event, &mut guard)
    } else if guard.is_typing() {
        handle_login(key_event, &mut guard)
    } else {
        handle_global(key_event, &mut guard)
    };

    if let Some(request) = request {
        drop(guard);
        let _ = network_requests.send(request).await;
    }
}

fn handle_confirm(key_event: KeyEvent, app: &mut App) -> Option<NetworkRequest> {
    match key_event.code {
        Char('y') | Char('Y') => app
            .state
            .admin
            .confirm
            .take()
            .map(|c| NetworkRequest::Admin(c.request)),
        Char('n') | Char('N') | KeyCode::Esc => {
            app.state.admin.confirm = None;
            None
        }
        _ => None,
    }
}

fn handle_form(key_event: KeyEvent, app: &mut App) -> Option<NetworkRequest> {
    let form = app.state.admin.form.as_mut()?;
    match (key_event.code, key_event.modifiers) {
        (KeyCode::Esc, _) => app.state.admin.form = None,
        (Char('s'), KeyModifiers::CONTROL) => return submit_form(app),
        (Char('r'), KeyModifiers::CONTROL) => form.remove_social(),
        (KeyCode::Enter, _) if form.editing_socials() => {
            if let Err(e) = form.add_social() {
                app.on_error(e.user_message());
            }
        }
        (KeyCode::Enter, _) => return submit_form(app),
        (KeyCode::Tab | KeyCode::Down, _) => form.focus_next(),
        (KeyCode::BackTab | KeyCode::Up, _) => form.focus_prev(),
        (KeyCode::Left, _) => form.cycle_choice(false),
        (KeyCode::Right, _) => form.cycle_choice(true),
        (KeyCode::Backspace, _) => form.backspace(),
        (Char(c), _) => form.input_char(c),
        _ => {}
    }
    None
}

fn submit_form(app: &mut App) -> Option<NetworkRequest> {
    match app.state.admin.submit_form() {
        Ok(request) => request.map(NetworkRequest::Admin),
        Err(e) => {
            app.on_error(e.user_message());
            None
        }
    }
}

fn handle_login(key_event: KeyEvent, app: &mut App) -> Option<NetworkRequest> {
    let login = &mut app.state.login;
    match key_event.code {
        KeyCode::Esc => {
            let previous = match app.state.previous_tab {
                MenuItem::Admin => MenuItem::Standings,
                tab => tab,
            };
            app.update_tab(previous);
        }
        KeyCode::Enter => match login.credentials() {
            Ok((email, password)) => {
                login.password.clear();
                return Some(NetworkRequest::Login { email, password });
            }
            Err(message) => app.on_error(message),
        },
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => login.toggle_focus(),
        KeyCode::Backspace => login.backspace(),
        Char('c') if key_event.modifiers == KeyModifiers::CONTROL => {
            crate::cleanup_terminal();
            std::process::exit(0);
        }
        Char(c) => login.input_char(c),
        _ => {}
    }
    None
}

fn handle_global(key_event: KeyEvent, app: &mut App) -> Option<NetworkRequest> {
    let access = app.admin_access();
    let section = app.state.admin.current_section(&access);

    match (app.state.active_tab, key_event.code, key_event.modifiers) {
        // Quit
        (_, Char('q'), _) | (_, Char('c'), KeyModifiers::CONTROL) => {
            crate::cleanup_terminal();
            std::process::exit(0);
        }

        // Tab switching
        (_, Char('1'), _) => app.update_tab(MenuItem::Standings),
        (_, Char('2'), _) => app.update_tab(MenuItem::Bracket),
        (_, Char('3'), _) => app.update_tab(MenuItem::Teams),
        (_, Char('4'), _) => app.update_tab(MenuItem::Casters),
        (_, Char('5'), _) => {
            app.update_tab(MenuItem::Admin);
            if app.state.session.is_some() && !app.state.admin.loaded {
                return Some(NetworkRequest::LoadAdmin);
            }
        }
        (_, Char('?'), _) => app.update_tab(MenuItem::Help),
        (MenuItem::Help, KeyCode::Esc, _) => app.exit_help(),

        // Admin console
        (MenuItem::Admin, Char('h') | KeyCode::Left, _) => app.state.admin.cycle_section(&access, false),
        (MenuItem::Admin, Char('l') | KeyCode::Right, _) => app.state.admin.cycle_section(&access, true),
        (MenuItem::Admin, Char('j') | KeyCode::Down, _) => {
            if let Some(section) = section {
                app.state.admin.select_down(section);
            }
        }
        (MenuItem::Admin, Char('k') | KeyCode::Up, _) => app.state.admin.select_up(),
        (MenuItem::Admin, Char('n'), _) => {
            if let Some(section) = section {
                app.state.admin.open_new(section);
            }
        }
        (MenuItem::Admin, Char('e') | KeyCode::Enter, _) => {
            if let Some(section) = section {
                app.state.admin.open_edit(section);
            }
        }
        (MenuItem::Admin, Char('d'), _) => {
            if let Some(section) = section {
                let claims = app.state.session.as_ref().map(|s| s.claims.clone());
                app.state.admin.ask_delete(section, claims.as_ref());
            }
        }
        (MenuItem::Admin, Char('m'), _) if section == Some(AdminSection::Teams) => {
            app.state.admin.open_add_member()
        }
        (MenuItem::Admin, Char('M'), _) if section == Some(AdminSection::Teams) => {
            app.state.admin.open_remove_member()
        }
        (MenuItem::Admin, Char('g'), _) if section == Some(AdminSection::Matches) => app
            .state
            .admin
            .ask_generate_playoffs("Create the playoff semifinals from the current standings?"),
        (MenuItem::Admin, Char('o'), _) if app.state.session.is_some() => {
            return Some(NetworkRequest::Logout);
        }
        (MenuItem::Admin, Char('r'), _) if app.state.session.is_some() => {
            return Some(NetworkRequest::LoadAdmin);
        }

        // Public pages
        (_, Char('j') | KeyCode::Down, _) => app.select_down(),
        (_, Char('k') | KeyCode::Up, _) => app.select_up(),
        (_, Char('r'), _) => return Some(NetworkRequest::Refresh),

        // Global
        (_, Char('f'), _) => app.toggle_full_screen(),
        (_, Char('"'), _) => app.toggle_show_logs(),

        _ => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::admin::{AdminRequest, Confirm};
    use crate::state::app_settings::AppSettings;
    use crate::state::app_state::AppState;
    use raynu_api::config::SiteConfig;

    fn app() -> App {
        App { settings: AppSettings::default(), config: SiteConfig::default(), state: AppState::new() }
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn notice_swallows_next_key() {
        let mut app = app();
        app.show_notice("saved");
        let shared = Arc::new(Mutex::new(app));
        let (tx, mut rx) = mpsc::channel(4);
        handle_key_bindings(press(Char('r')), &shared, &tx).await;
        assert!(rx.try_recv().is_err(), "the key only closed the notice");
        assert!(shared.lock().await.state.notice.is_none());
    }

    #[test]
    fn confirm_yes_sends_request() {
        let mut app = app();
        app.state.admin.confirm = Some(Confirm {
            prompt: "Delete?".into(),
            request: AdminRequest::DeleteTeam { id: "t1".into() },
        });
        let request = handle_confirm(press(Char('y')), &mut app);
        assert!(matches!(
            request,
            Some(NetworkRequest::Admin(AdminRequest::DeleteTeam { ref id })) if id == "t1"
        ));
        assert!(app.state.admin.confirm.is_none());
    }

    #[test]
    fn confirm_no_cancels() {
        let mut app = app();
        app.state.admin.confirm = Some(Confirm {
            prompt: "Delete?".into(),
            request: AdminRequest::DeleteTeam { id: "t1".into() },
        });
        assert!(handle_confirm(press(KeyCode::Esc), &mut app).is_none());
        assert!(app.state.admin.confirm.is_none());
    }

    #[test]
    fn login_requires_both_fields() {
        let mut app = app();
        app.update_tab(MenuItem::Admin);
        for c in "staff@raynu.gg".chars() {
            handle_login(press(Char(c)), &mut app);
        }
        assert!(handle_login(press(KeyCode::Enter), &mut app).is_none());
        assert!(app.state.notice.as_ref().is_some_and(|n| n.is_error));

        app.dismiss_notice();
        handle_login(press(KeyCode::Tab), &mut app);
        handle_login(press(Char('x')), &mut app);
        let request = handle_login(press(KeyCode::Enter), &mut app);
        assert!(matches!(
            request,
            Some(NetworkRequest::Login { ref email, ref password }) if email == "staff@raynu.gg" && password == "x"
        ));
        assert!(app.state.login.password.is_empty());
    }

    #[test]
    fn login_escape_leaves_admin_tab() {
        let mut app = app();
        app.update_tab(MenuItem::Teams);
        app.update_tab(MenuItem::Admin);
        handle_login(press(KeyCode::Esc), &mut app);
        assert_eq!(app.state.active_tab, MenuItem::Teams);
    }

    #[test]
    fn invalid_form_stays_open_with_error() {
        let mut app = app();
        app.state.admin.open_new(AdminSection::Teams);
        assert!(handle_form(press(KeyCode::Enter), &mut app).is_none());
        assert!(app.state.admin.form.is_some());
        assert!(app.state.notice.as_ref().is_some_and(|n| n.is_error));
    }

    #[test]
    fn refresh_key_reloads_public_pages() {
        let mut app = app();
        assert!(matches!(handle_global(press(Char('r')), &mut app), Some(NetworkRequest::Refresh)));
        app.update_tab(MenuItem::Bracket);
        handle_global(press(Char('?')), &mut app);
        handle_global(press(KeyCode::Esc), &mut app);
        assert_eq!(app.state.active_tab, MenuItem::Bracket);
    }
}

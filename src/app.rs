use crate::state::app_settings::AppSettings;
use crate::state::app_state::{AppState, Notice, Session};
use raynu_api::admin::AdminFetch;
use raynu_api::auth::{AdminAccess, admin_gate};
use raynu_api::client::{FetchSource, PublicData};
use raynu_api::config::SiteConfig;

const PLAYOFF_PROMPT: &str =
    "Only one group-stage match is left. Generate the playoff semifinals now?";

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum MenuItem {
    #[default]
    Standings,
    Bracket,
    Teams,
    Casters,
    Admin,
    Help,
}

pub struct App {
    pub settings: AppSettings,
    pub config: SiteConfig,
    pub state: AppState,
}

impl App {
    pub fn new(config: SiteConfig) -> Self {
        let settings = AppSettings::load();

        let app = Self {
            state: AppState::new(),
            config,
            settings,
        };

        if let Some(level) = app.settings.log_level {
            log::set_max_level(level);
            tui_logger::set_default_level(level);
        }

        app
    }

    // -----------------------------------------------------------------------
    // Network response handlers, called from main_ui_loop
    // -----------------------------------------------------------------------

    pub fn on_public_loaded(&mut self, data: PublicData, source: Option<FetchSource>) {
        self.state.last_error = None;
        self.state.public.load(data, source, &self.config);
    }

    pub fn on_session_changed(&mut self, session: Option<Session>) {
        if session.is_none() {
            self.state.admin.reset();
        }
        self.state.login = Default::default();
        self.state.session = session;
    }

    pub fn on_admin_loaded(&mut self, fetch: AdminFetch) {
        let current = self.state.admin.current_section(&self.admin_access());
        let failed = self.state.admin.on_loaded(fetch, current);
        self.state.last_error = (!failed.is_empty()).then(|| failed.join("; "));
    }

    pub fn on_admin_updated(&mut self, fetch: AdminFetch, message: String, offer_playoffs: bool) {
        self.on_admin_loaded(fetch);
        self.show_notice(message);
        if offer_playoffs {
            self.state.admin.ask_generate_playoffs(PLAYOFF_PROMPT);
        }
    }

    pub fn show_notice(&mut self, message: impl Into<String>) {
        self.state.notice = Some(Notice { message: message.into(), is_error: false });
    }

    pub fn on_error(&mut self, message: String) {
        self.state.notice = Some(Notice { message: message.clone(), is_error: true });
        self.state.last_error = Some(message);
    }

    pub fn dismiss_notice(&mut self) {
        self.state.notice = None;
    }

    /// Console access for the current token. Expiry is not checked here.
    pub fn admin_access(&self) -> AdminAccess {
        admin_gate(self.state.session.as_ref().map(|s| s.token.as_str()))
    }

    /// True when key presses go to a text field rather than the bindings.
    pub fn is_typing(&self) -> bool {
        self.state.admin.form.is_some()
            || (self.state.active_tab == MenuItem::Admin && self.state.session.is_none())
    }

    // -----------------------------------------------------------------------
    // Tab management
    // -----------------------------------------------------------------------

    pub fn update_tab(&mut self, next: MenuItem) {
        if self.state.active_tab == next {
            return;
        }
        self.state.previous_tab = self.state.active_tab;
        self.state.active_tab = next;
    }

    pub fn exit_help(&mut self) {
        if self.state.active_tab == MenuItem::Help {
            self.state.active_tab = self.state.previous_tab;
        }
    }

    pub fn toggle_show_logs(&mut self) {
        self.state.show_logs = !self.state.show_logs;
    }

    pub fn toggle_full_screen(&mut self) {
        self.settings.full_screen = !self.settings.full_screen;
    }

    // -----------------------------------------------------------------------
    // Public page navigation
    // -----------------------------------------------------------------------

    pub fn select_down(&mut self) {
        let public = &mut self.state.public;
        match self.state.active_tab {
            MenuItem::Teams if public.selected_team + 1 < public.teams.len() => {
                public.selected_team += 1
            }
            MenuItem::Casters if public.selected_caster + 1 < public.casters.len() => {
                public.selected_caster += 1
            }
            MenuItem::Bracket => public.next_slot(),
            _ => {}
        }
    }

    pub fn select_up(&mut self) {
        let public = &mut self.state.public;
        match self.state.active_tab {
            MenuItem::Teams => public.selected_team = public.selected_team.saturating_sub(1),
            MenuItem::Casters => public.selected_caster = public.selected_caster.saturating_sub(1),
            MenuItem::Bracket => public.prev_slot(),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raynu_api::auth::Claims;
    use raynu_api::{Match, Team};

    fn app() -> App {
        App { settings: AppSettings::default(), config: SiteConfig::default(), state: AppState::new() }
    }

    fn fetch(matches: Vec<Match>) -> AdminFetch {
        AdminFetch {
            teams: Ok(vec![Team { id: "a".into(), ..Default::default() }]),
            matches: Ok(matches),
            casters: Ok(Vec::new()),
            users: Ok(Vec::new()),
            sanctions: Ok(Vec::new()),
            logs: Ok(Vec::new()),
        }
    }

    #[test]
    fn help_returns_to_previous_tab() {
        let mut app = app();
        app.update_tab(MenuItem::Bracket);
        app.update_tab(MenuItem::Help);
        app.exit_help();
        assert_eq!(app.state.active_tab, MenuItem::Bracket);
    }

    #[test]
    fn login_screen_captures_keys_until_signed_in() {
        let mut app = app();
        assert!(!app.is_typing());
        app.update_tab(MenuItem::Admin);
        assert!(app.is_typing());
        app.on_session_changed(Some(Session { token: "t".into(), claims: Claims::default() }));
        assert!(!app.is_typing());
    }

    #[test]
    fn admin_update_offers_playoffs() {
        let mut app = app();
        app.on_admin_updated(fetch(Vec::new()), "Score saved.".into(), true);
        assert_eq!(app.state.notice.as_ref().map(|n| n.message.as_str()), Some("Score saved."));
        assert!(app.state.admin.confirm.is_some());
        assert!(app.state.last_error.is_none());
    }

    #[test]
    fn signing_out_clears_console() {
        let mut app = app();
        app.on_admin_loaded(fetch(Vec::new()));
        assert!(app.state.admin.loaded);
        app.on_session_changed(None);
        assert!(!app.state.admin.loaded);
        assert_eq!(app.admin_access(), AdminAccess::Denied);
    }
}

mod app;
mod components;
mod draw;
mod keys;
mod state;
mod ui;

use crate::app::{App, MenuItem};
use crate::state::messages::{NetworkRequest, NetworkResponse, UiEvent};
use crate::state::network::{LoadingState, NetworkWorker};
use crossterm::event::{self as crossterm_event, Event};
use crossterm::{cursor, execute, terminal};
use log::{debug, error};
use raynu_api::BRACKET_GROUPS;
use raynu_api::auth::TokenStore;
use raynu_api::client::RaynuClient;
use raynu_api::config::SiteConfig;
use raynu_api::standings::standings_tables;
use std::io::Stdout;
use std::sync::Arc;
use std::{io, panic};
use tokio::sync::{Mutex, mpsc};
use tui::{Terminal, backend::CrosstermBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = SiteConfig::from_env();
    if handle_cli_args(&config).await {
        return Ok(());
    }

    better_panic::install();

    let backend = CrosstermBackend::new(io::stdout());
    let terminal = Terminal::new(backend)?;

    setup_panic_hook();
    setup_terminal();

    tui_logger::init_logger(log::LevelFilter::Debug)?;
    tui_logger::set_default_level(log::LevelFilter::Error);

    let client = RaynuClient::new(config.clone());
    let app = Arc::new(Mutex::new(App::new(config)));

    let (ui_event_tx, ui_event_rx) = mpsc::channel::<UiEvent>(100);
    let (network_req_tx, network_req_rx) = mpsc::channel::<NetworkRequest>(100);
    let (network_resp_tx, network_resp_rx) = mpsc::channel::<NetworkResponse>(100);

    // Input handler thread
    let input_handler = tokio::spawn(input_handler_task(ui_event_tx.clone()));

    // Network thread
    let network_worker =
        NetworkWorker::new(client, TokenStore::default(), network_req_rx, network_resp_tx);
    let network_task = tokio::spawn(network_worker.run());

    // Restore the session and load the public pages on startup
    let _ = ui_event_tx.send(UiEvent::AppStarted).await;

    main_ui_loop(terminal, app, ui_event_rx, network_req_tx, network_resp_rx).await;

    input_handler.abort();
    network_task.abort();

    Ok(())
}

async fn handle_cli_args(config: &SiteConfig) -> bool {
    let mut args = std::env::args().skip(1);
    let Some(arg) = args.next() else {
        return false;
    };

    match arg.as_str() {
        "-h" | "--help" => {
            println!("{}", usage_text());
            true
        }
        "-V" | "--version" => {
            println!("raynu-tui {}", env!("CARGO_PKG_VERSION"));
            true
        }
        "--config" => {
            println!("{config}");
            true
        }
        "--standings" => {
            let client = RaynuClient::new(config.clone());
            match client.fetch_teams().await {
                Ok(teams) => {
                    let standings = standings_tables(&teams, &BRACKET_GROUPS, config);
                    println!("{}", components::standings::render_text(&standings));
                    true
                }
                Err(e) => {
                    eprintln!("Could not load teams: {}", e.user_message());
                    std::process::exit(1);
                }
            }
        }
        _ => {
            eprintln!("Unknown argument: {arg}\n\n{}", usage_text());
            std::process::exit(2);
        }
    }
}

fn usage_text() -> &'static str {
    "raynu-tui - Raynu community tournament in the terminal

Usage:
  raynu-tui
  raynu-tui --standings   Print the group standings and exit
  raynu-tui --config      Print the resolved site configuration and exit
  raynu-tui --help
  raynu-tui --version

Environment:
  RAYNU_API_BASE_URL       Live API base (empty disables it)
  RAYNU_SERVER_BASE_URL    Base for uploaded media paths
  RAYNU_STATIC_BASE_URL    Static JSON mirror, URL or local directory (empty disables it)
  RAYNU_TEAM_LOGO          Placeholder team logo
  RAYNU_CASTER_PHOTO       Placeholder caster photo
  RAYNU_TOURNAMENT_LOGO    Tournament logo
  RAYNU_HTTP_TIMEOUT_SECS  Request timeout in seconds (default 10)
  RAYNU_LOG                Log level for the log pane (error|warn|info|debug|trace)"
}

async fn main_ui_loop(
    mut terminal: Terminal<CrosstermBackend<Stdout>>,
    app: Arc<Mutex<App>>,
    mut ui_events: mpsc::Receiver<UiEvent>,
    network_requests: mpsc::Sender<NetworkRequest>,
    mut network_responses: mpsc::Receiver<NetworkResponse>,
) {
    let mut loading = LoadingState::default();

    loop {
        tokio::select! {
            Some(ui_event) = ui_events.recv() => {
                let should_redraw = handle_ui_event(ui_event, &app, &network_requests).await;
                if should_redraw && !loading.is_loading {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            Some(response) = network_responses.recv() => {
                let should_redraw =
                    handle_network_response(response, &app, &network_requests, &mut loading).await;
                if should_redraw {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }
        }
    }
}

async fn handle_ui_event(
    ui_event: UiEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
) -> bool {
    match ui_event {
        UiEvent::AppStarted => {
            let _ = network_requests.send(NetworkRequest::RestoreSession).await;
            let _ = network_requests.send(NetworkRequest::LoadPublic).await;
            true
        }
        UiEvent::KeyPressed(key_event) => {
            keys::handle_key_bindings(key_event, app, network_requests).await;
            true
        }
        UiEvent::Resize => true,
    }
}

async fn handle_network_response(
    response: NetworkResponse,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
    loading: &mut LoadingState,
) -> bool {
    match response {
        NetworkResponse::LoadingStateChanged { loading_state } => {
            *loading = loading_state;
            return true;
        }
        NetworkResponse::PublicLoaded { data, source } => {
            debug!("public data loaded from {source:?}");
            app.lock().await.on_public_loaded(data, source);
        }
        NetworkResponse::SessionChanged { session } => {
            let mut guard = app.lock().await;
            let wants_console =
                session.is_some() && guard.state.active_tab == MenuItem::Admin;
            guard.on_session_changed(session);
            drop(guard);
            if wants_console {
                let _ = network_requests.send(NetworkRequest::LoadAdmin).await;
            }
        }
        NetworkResponse::AdminLoaded { fetch } => {
            app.lock().await.on_admin_loaded(fetch);
        }
        NetworkResponse::AdminUpdated { fetch, message, offer_playoffs } => {
            app.lock().await.on_admin_updated(fetch, message, offer_playoffs);
            // standings and bracket read the same collections
            let _ = network_requests.send(NetworkRequest::LoadPublic).await;
        }
        NetworkResponse::Notice { message } => {
            app.lock().await.show_notice(message);
        }
        NetworkResponse::Error { message } => {
            error!("Network error: {message}");
            app.lock().await.on_error(message);
        }
    }
    !loading.is_loading
}

async fn input_handler_task(ui_events: mpsc::Sender<UiEvent>) {
    loop {
        if let Ok(event) = crossterm_event::read() {
            let ui_event = match event {
                Event::Key(key_event) => Some(UiEvent::KeyPressed(key_event)),
                Event::Resize(_, _) => Some(UiEvent::Resize),
                _ => None,
            };

            if let Some(ui_event) = ui_event
                && ui_events.send(ui_event).await.is_err()
            {
                break;
            }
        }
    }
}

fn setup_terminal() {
    let mut stdout = io::stdout();
    let _ = execute!(stdout, cursor::Hide);
    let _ = execute!(stdout, terminal::EnterAlternateScreen);
    let _ = execute!(stdout, terminal::Clear(terminal::ClearType::All));
    if let Err(e) = terminal::enable_raw_mode() {
        eprintln!("could not enable raw mode: {e}");
    }
}

pub fn cleanup_terminal() {
    let mut stdout = io::stdout();
    let _ = execute!(stdout, cursor::MoveTo(0, 0));
    let _ = execute!(stdout, terminal::Clear(terminal::ClearType::All));
    let _ = execute!(stdout, terminal::LeaveAlternateScreen);
    let _ = execute!(stdout, cursor::Show);
    let _ = terminal::disable_raw_mode();
}

fn setup_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        cleanup_terminal();
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));
}

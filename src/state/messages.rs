use crate::state::admin::AdminRequest;
use crate::state::app_state::Session;
use crate::state::network::LoadingState;
use crossterm::event::KeyEvent;
use raynu_api::admin::AdminFetch;
use raynu_api::client::{FetchSource, PublicData};

#[derive(Debug, Clone)]
pub enum NetworkRequest {
    LoadPublic,
    /// Reload public data and, when signed in, the console.
    Refresh,
    RestoreSession,
    Login { email: String, password: String },
    Logout,
    LoadAdmin,
    Admin(AdminRequest),
}

#[derive(Debug)]
pub enum NetworkResponse {
    LoadingStateChanged { loading_state: LoadingState },
    PublicLoaded { data: PublicData, source: Option<FetchSource> },
    SessionChanged { session: Option<Session> },
    AdminLoaded { fetch: AdminFetch },
    /// A console mutation went through and the console was reloaded.
    AdminUpdated { fetch: AdminFetch, message: String, offer_playoffs: bool },
    Notice { message: String },
    Error { message: String },
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    KeyPressed(KeyEvent),
    Resize,
    AppStarted,
}

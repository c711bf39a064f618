use crate::state::admin::AdminRequest;
use crate::state::app_state::Session;
use crate::state::messages::{NetworkRequest, NetworkResponse};
use chrono::Utc;
use log::{debug, error, info, warn};
use raynu_api::admin::AdminFetch;
use raynu_api::auth::{NavState, TokenStore, logout, nav_state};
use raynu_api::bracket::needs_playoff_prompt;
use raynu_api::client::{ApiError, ApiResult, RaynuClient};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
pub const ERROR_CHAR: char = '!';

#[derive(Debug, Copy, Clone)]
pub struct LoadingState {
    pub is_loading: bool,
    pub spinner_char: char,
}

impl Default for LoadingState {
    fn default() -> Self {
        Self { is_loading: false, spinner_char: ' ' }
    }
}

/// Owns the HTTP client and the stored token; handles one request at a time.
pub struct NetworkWorker {
    client: RaynuClient,
    store: TokenStore,
    token: Option<String>,
    requests: mpsc::Receiver<NetworkRequest>,
    responses: mpsc::Sender<NetworkResponse>,
    is_loading: Arc<AtomicBool>,
}

impl NetworkWorker {
    pub fn new(
        client: RaynuClient,
        store: TokenStore,
        requests: mpsc::Receiver<NetworkRequest>,
        responses: mpsc::Sender<NetworkResponse>,
    ) -> Self {
        Self {
            client,
            store,
            token: None,
            requests,
            responses,
            is_loading: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            self.start_loading_animation().await;

            let result = match request {
                NetworkRequest::LoadPublic => self.handle_load_public().await,
                NetworkRequest::Refresh => self.handle_refresh().await,
                NetworkRequest::RestoreSession => self.handle_restore_session().await,
                NetworkRequest::Login { email, password } => self.handle_login(email, password).await,
                NetworkRequest::Logout => self.handle_logout().await,
                NetworkRequest::LoadAdmin => self.handle_load_admin().await,
                NetworkRequest::Admin(request) => self.handle_admin(request).await,
            };

            debug!("network request complete");
            self.stop_loading_animation(result.is_ok()).await;

            if let Err(err) = &result
                && self.rejects_session(err)
            {
                warn!("stored token is no longer usable, signing out");
                self.drop_session().await;
            }

            let response = result.unwrap_or_else(|err| NetworkResponse::Error {
                message: err.user_message(),
            });

            if let Err(e) = self.responses.send(response).await {
                error!("Failed to send network response: {e}");
                break;
            }
        }
    }

    async fn handle_load_public(&self) -> ApiResult<NetworkResponse> {
        debug!("loading teams, matches and casters");
        let data = self.client.fetch_public().await;
        Ok(NetworkResponse::PublicLoaded { data, source: self.client.last_source() })
    }

    async fn handle_refresh(&self) -> ApiResult<NetworkResponse> {
        let admin = async {
            match self.token.as_deref() {
                Some(token) => Some(self.client.fetch_all(token).await),
                None => None,
            }
        };
        let (data, fetch) = futures_util::join!(self.client.fetch_public(), admin);
        if let Some(fetch) = fetch {
            self.send(NetworkResponse::AdminLoaded { fetch }).await;
        }
        Ok(NetworkResponse::PublicLoaded { data, source: self.client.last_source() })
    }

    async fn handle_restore_session(&mut self) -> ApiResult<NetworkResponse> {
        let stored = self.store.load();
        let session = match nav_state(stored.as_deref(), Utc::now()) {
            NavState::Staff(claims) => stored.map(|token| Session { token, claims }),
            NavState::Discard => {
                info!("discarding stored token");
                logout(&self.store)?;
                None
            }
            NavState::LoggedOut => None,
        };
        self.token = session.as_ref().map(|s| s.token.clone());
        Ok(NetworkResponse::SessionChanged { session })
    }

    async fn handle_login(&mut self, email: String, password: String) -> ApiResult<NetworkResponse> {
        self.client.login(&self.store, &email, &password).await?;
        let response = self.handle_restore_session().await?;
        if self.token.is_none() {
            return Ok(NetworkResponse::Notice {
                message: "This account has no access to the admin console.".into(),
            });
        }
        Ok(response)
    }

    async fn handle_logout(&mut self) -> ApiResult<NetworkResponse> {
        logout(&self.store)?;
        self.token = None;
        Ok(NetworkResponse::SessionChanged { session: None })
    }

    async fn handle_load_admin(&self) -> ApiResult<NetworkResponse> {
        let token = self.token()?;
        Ok(NetworkResponse::AdminLoaded { fetch: self.client.fetch_all(token).await })
    }

    async fn handle_admin(&self, request: AdminRequest) -> ApiResult<NetworkResponse> {
        let token = self.token()?;
        let client = &self.client;
        let mut message = request.success_message().to_string();
        let is_score = matches!(request, AdminRequest::UpdateScore { .. });

        match request {
            AdminRequest::CreateTeam(form) => client.create_team(token, &form).await?,
            AdminRequest::UpdateTeam { id, form } => client.update_team(token, &id, &form).await?,
            AdminRequest::DeleteTeam { id } => client.delete_team(token, &id).await?,
            AdminRequest::AddMember { team, name, role } => {
                client.add_member(token, &team, &name, role).await?
            }
            AdminRequest::RemoveMember { team, name } => client.remove_member(token, &team, &name).await?,
            AdminRequest::CreateMatch(form) => client.create_match(token, &form).await?,
            AdminRequest::UpdateScore { id, score1, score2 } => {
                client.update_score(token, &id, score1, score2).await?
            }
            AdminRequest::GeneratePlayoffs { teams } => {
                let report = client.generate_playoffs(token, &teams).await?;
                if !report.is_complete() {
                    warn!("playoff generation stopped after {:?}", report.created);
                }
                message = report.summary();
            }
            AdminRequest::SaveCaster { editing, existing, form } => {
                client.save_caster(token, editing.as_deref(), existing, &form).await?
            }
            AdminRequest::DeleteCaster { id } => client.delete_caster(token, &id).await?,
            AdminRequest::SaveUser { editing, form } => {
                client.save_user(token, editing.as_deref(), &form).await?
            }
            AdminRequest::DeleteUser { id, current_user } => {
                client.delete_user(token, &id, current_user.as_deref()).await?
            }
            AdminRequest::CreateSanction(form) => client.create_sanction(token, &form).await?,
            AdminRequest::DeleteSanction { id } => client.delete_sanction(token, &id).await?,
        }

        let fetch: AdminFetch = client.fetch_all(token).await;
        let offer_playoffs = is_score
            && fetch.matches.as_ref().is_ok_and(|matches| needs_playoff_prompt(matches));
        Ok(NetworkResponse::AdminUpdated { fetch, message, offer_playoffs })
    }

    fn token(&self) -> ApiResult<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| ApiError::Unauthorized("Please sign in first.".into()))
    }

    /// A 401, or a held token that has since expired. A 403 only refuses
    /// the one action and keeps the session.
    fn rejects_session(&self, err: &ApiError) -> bool {
        let Some(token) = self.token.as_deref() else {
            return false;
        };
        matches!(err, ApiError::Unauthorized(_))
            || matches!(nav_state(Some(token), Utc::now()), NavState::Discard)
    }

    async fn drop_session(&mut self) {
        if let Err(e) = logout(&self.store) {
            error!("could not clear stored token: {e}");
        }
        self.token = None;
        self.send(NetworkResponse::SessionChanged { session: None }).await;
    }

    async fn send(&self, response: NetworkResponse) {
        if let Err(e) = self.responses.send(response).await {
            error!("Failed to send network response: {e}");
        }
    }

    async fn start_loading_animation(&self) {
        self.is_loading.store(true, Ordering::Relaxed);

        let mut loading_state =
            LoadingState { is_loading: true, spinner_char: SPINNER_CHARS[0] };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged { loading_state })
            .await;

        let responses = self.responses.clone();
        let is_loading = self.is_loading.clone();

        tokio::spawn(async move {
            let mut spinner_index = 1;
            let mut interval = tokio::time::interval(Duration::from_millis(33));
            loop {
                interval.tick().await;
                if !is_loading.load(Ordering::Relaxed) {
                    break;
                }
                loading_state.spinner_char = SPINNER_CHARS[spinner_index];
                spinner_index = (spinner_index + 1) % SPINNER_CHARS.len();
                let _ = responses
                    .send(NetworkResponse::LoadingStateChanged { loading_state })
                    .await;
            }
        });
    }

    async fn stop_loading_animation(&self, is_ok: bool) {
        self.is_loading.store(false, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(15)).await;

        let spinner_char = if is_ok { ' ' } else { ERROR_CHAR };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged {
                loading_state: LoadingState { is_loading: false, spinner_char },
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raynu_api::config::SiteConfig;

    /// Payload `{"id":"u1","email":"manager@raynu.gg","roles":["manager"]}`, no expiry.
    const MANAGER_TOKEN: &str =
        "header.eyJpZCI6InUxIiwiZW1haWwiOiJtYW5hZ2VyQHJheW51LmdnIiwicm9sZXMiOlsibWFuYWdlciJdfQ.sig";

    fn signed_in_store(name: &str) -> TokenStore {
        let path = std::env::temp_dir()
            .join(format!("raynu-worker-{}-{name}", std::process::id()))
            .join("token");
        let store = TokenStore::new(path);
        store.save(MANAGER_TOKEN).unwrap();
        store
    }

    /// Restore the stored session, run `request`, and collect every
    /// response except spinner updates.
    async fn run_signed_in(
        server: &mockito::Server,
        store: TokenStore,
        request: NetworkRequest,
    ) -> Vec<NetworkResponse> {
        let client = RaynuClient::new(SiteConfig {
            api_base_url: server.url(),
            static_fallback_base_url: String::new(),
            ..Default::default()
        });
        let (req_tx, req_rx) = mpsc::channel(4);
        let (resp_tx, mut resp_rx) = mpsc::channel(64);
        let worker = NetworkWorker::new(client, store, req_rx, resp_tx);

        req_tx.send(NetworkRequest::RestoreSession).await.unwrap();
        req_tx.send(request).await.unwrap();
        drop(req_tx);
        let task = tokio::spawn(worker.run());

        let mut responses = Vec::new();
        while let Some(response) = resp_rx.recv().await {
            if !matches!(response, NetworkResponse::LoadingStateChanged { .. }) {
                responses.push(response);
            }
        }
        task.await.unwrap();
        responses
    }

    #[tokio::test]
    async fn forbidden_action_keeps_the_session() {
        let mut server = mockito::Server::new_async().await;
        let delete = server
            .mock("DELETE", "/teams/t1")
            .match_header("authorization", format!("Bearer {MANAGER_TOKEN}").as_str())
            .with_status(403)
            .with_body(r#"{"message":"Only admins can delete teams"}"#)
            .create_async()
            .await;
        let reload = server.mock("GET", "/teams").expect(0).create_async().await;

        let store = signed_in_store("forbidden");
        let responses = run_signed_in(
            &server,
            store.clone(),
            NetworkRequest::Admin(AdminRequest::DeleteTeam { id: "t1".into() }),
        )
        .await;

        delete.assert_async().await;
        reload.assert_async().await;
        assert_eq!(responses.len(), 2, "{responses:?}");
        assert!(matches!(responses[0], NetworkResponse::SessionChanged { session: Some(_) }));
        assert!(matches!(
            &responses[1],
            NetworkResponse::Error { message } if message == "Only admins can delete teams"
        ));
        assert_eq!(store.load().as_deref(), Some(MANAGER_TOKEN));
        store.clear().unwrap();
    }

    #[tokio::test]
    async fn rejected_token_signs_out() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/teams/t1")
            .with_status(401)
            .with_body(r#"{"message":"Token expired"}"#)
            .create_async()
            .await;

        let store = signed_in_store("unauthorized");
        let responses = run_signed_in(
            &server,
            store.clone(),
            NetworkRequest::Admin(AdminRequest::DeleteTeam { id: "t1".into() }),
        )
        .await;

        assert_eq!(responses.len(), 3, "{responses:?}");
        assert!(matches!(responses[1], NetworkResponse::SessionChanged { session: None }));
        assert!(matches!(
            &responses[2],
            NetworkResponse::Error { message } if message == "Token expired"
        ));
        assert!(store.load().is_none());
    }
}

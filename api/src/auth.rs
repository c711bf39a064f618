//! Bearer-token handling for the admin console.
//!
//! Tokens are decoded without verifying their signature. The decoded claims
//! only decide what the terminal shows; the server checks every request.

use crate::client::{ApiError, ApiResult, RaynuClient, SiteAdapter};
use crate::Role;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;

const UNKNOWN_LOGIN_ERROR: &str = "Unknown login error";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Claims {
    /// Subject id: `id`, `_id` or `sub`, in that order.
    pub id: Option<String>,
    pub email: Option<String>,
    pub roles: Vec<Role>,
    /// Expiry in seconds since the epoch.
    pub exp: Option<i64>,
}

#[derive(Deserialize)]
struct RawClaims {
    id: Option<String>,
    #[serde(rename = "_id")]
    mongo_id: Option<String>,
    sub: Option<String>,
    email: Option<String>,
    #[serde(default)]
    roles: Vec<Role>,
    exp: Option<f64>,
}

impl Claims {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_staff(&self) -> bool {
        self.has_role(Role::Admin) || self.has_role(Role::Manager)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.exp
            .is_some_and(|exp| exp.saturating_mul(1000) < now.timestamp_millis())
    }
}

/// Decode the payload segment of a `header.payload.signature` token.
/// Anything malformed yields `None`.
pub fn decode_token(token: &str) -> Option<Claims> {
    let payload = token.trim().split('.').nth(1)?;
    let payload = payload.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .ok()?;
    let raw: RawClaims = serde_json::from_slice(&bytes).ok()?;
    Some(Claims {
        id: raw.id.or(raw.mongo_id).or(raw.sub),
        email: raw.email,
        roles: raw.roles,
        exp: raw.exp.map(|e| e as i64),
    })
}

/// What the navigation shows for a stored token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavState {
    LoggedOut,
    /// The stored token was unusable and should be discarded.
    Discard,
    Staff(Claims),
}

/// Navigation gate: a session counts only if the token decodes, has not
/// expired, and carries a staff role. A missing `exp` never expires.
pub fn nav_state(token: Option<&str>, now: DateTime<Utc>) -> NavState {
    let Some(token) = token.filter(|t| !t.trim().is_empty()) else {
        return NavState::LoggedOut;
    };
    match decode_token(token) {
        Some(claims) if !claims.is_expired(now) && claims.is_staff() => NavState::Staff(claims),
        _ => NavState::Discard,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AdminSection {
    Matches,
    Teams,
    Sanctions,
    Casters,
    Users,
    Logs,
}

impl AdminSection {
    pub const ALL: [AdminSection; 6] = [
        AdminSection::Matches,
        AdminSection::Teams,
        AdminSection::Sanctions,
        AdminSection::Casters,
        AdminSection::Users,
        AdminSection::Logs,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            AdminSection::Matches => "Matches",
            AdminSection::Teams => "Teams",
            AdminSection::Sanctions => "Sanctions",
            AdminSection::Casters => "Casters",
            AdminSection::Users => "Users",
            AdminSection::Logs => "Logs",
        }
    }

    fn admin_only(&self) -> bool {
        matches!(self, AdminSection::Casters | AdminSection::Users | AdminSection::Logs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAccess {
    Denied,
    Granted { claims: Claims, sections: Vec<AdminSection> },
}

/// Console gate. Unlike [`nav_state`] this does not look at expiry; an
/// expired token still opens the console and the server rejects its calls.
pub fn admin_gate(token: Option<&str>) -> AdminAccess {
    let Some(claims) = token.filter(|t| !t.trim().is_empty()).and_then(decode_token) else {
        return AdminAccess::Denied;
    };
    let is_admin = claims.has_role(Role::Admin);
    let sections = if claims.is_staff() {
        AdminSection::ALL
            .into_iter()
            .filter(|s| is_admin || !s.admin_only())
            .collect()
    } else {
        Vec::new()
    };
    AdminAccess::Granted { claims, sections }
}

/// The one piece of local state: the bearer token, kept in a plain file.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new(default_token_path())
    }
}

impl TokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn load(&self) -> Option<String> {
        std::fs::read_to_string(&self.path)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn save(&self, token: &str) -> ApiResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| ApiError::Io(e, parent.display().to_string()))?;
        }
        std::fs::write(&self.path, token).map_err(|e| ApiError::Io(e, self.path.display().to_string()))
    }

    pub fn clear(&self) -> ApiResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::Io(e, self.path.display().to_string())),
        }
    }
}

fn default_token_path() -> PathBuf {
    if let Ok(config_dir) = std::env::var("XDG_CONFIG_HOME")
        && !config_dir.trim().is_empty()
    {
        return PathBuf::from(config_dir).join("raynu").join("token");
    }
    if let Ok(home) = std::env::var("HOME")
        && !home.trim().is_empty()
    {
        return PathBuf::from(home).join(".config").join("raynu").join("token");
    }
    PathBuf::from("raynu_token")
}

impl RaynuClient {
    /// Exchange credentials for a bearer token and persist it.
    pub async fn login(&self, store: &TokenStore, email: &str, password: &str) -> ApiResult<Claims> {
        let url = self.build_api_url("/auth/login");
        let request = self
            .http()
            .post(&url)
            .json(&json!({ "email": email, "password": password }));

        let body = self.execute(request, &url).await.map_err(|e| match e {
            ApiError::Api { message, .. } | ApiError::Unauthorized(message)
                if message.starts_with("HTTP ") =>
            {
                ApiError::Unauthorized(UNKNOWN_LOGIN_ERROR.into())
            }
            ApiError::Api { message, .. } => ApiError::Unauthorized(message),
            other => other,
        })?;

        let token = body
            .get("token")
            .and_then(|t| t.as_str())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Unauthorized(UNKNOWN_LOGIN_ERROR.into()))?;

        store.save(token)?;
        let claims = decode_token(token).unwrap_or_default();
        info!("logged in as {}", claims.email.as_deref().unwrap_or(email));
        Ok(claims)
    }
}

pub fn logout(store: &TokenStore) -> ApiResult<()> {
    debug!("clearing stored token at {}", store.path().display());
    store.clear()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use chrono::TimeZone;

    fn token_with(payload: serde_json::Value) -> String {
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("eyJhbGciOiJIUzI1NiJ9.{body}.sig")
    }

    fn temp_store(tag: &str) -> TokenStore {
        let dir = std::env::temp_dir().join(format!("raynu-auth-{tag}-{}", std::process::id()));
        TokenStore::new(dir.join("token"))
    }

    #[test]
    fn decodes_url_safe_and_standard_payloads() {
        let claims = decode_token(&token_with(json!({"id": "u1", "roles": ["admin"], "exp": 10})))
            .unwrap();
        assert_eq!(claims.id.as_deref(), Some("u1"));
        assert_eq!(claims.roles, vec![Role::Admin]);
        assert_eq!(claims.exp, Some(10));

        let padded = base64::engine::general_purpose::STANDARD.encode(r#"{"sub":"s","roles":[]}"#);
        let claims = decode_token(&format!("h.{padded}.s")).unwrap();
        assert_eq!(claims.id.as_deref(), Some("s"));
    }

    #[test]
    fn malformed_tokens_do_not_decode() {
        assert!(decode_token("").is_none());
        assert!(decode_token("no-dots").is_none());
        assert!(decode_token("a.%%%.c").is_none());
        let not_json = URL_SAFE_NO_PAD.encode("hello");
        assert!(decode_token(&format!("a.{not_json}.c")).is_none());
    }

    #[test]
    fn nav_rejects_expired_and_non_staff_tokens() {
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap();
        let past = now.timestamp() - 60;
        let future = now.timestamp() + 60;

        assert_eq!(nav_state(None, now), NavState::LoggedOut);
        assert_eq!(nav_state(Some("garbage"), now), NavState::Discard);

        let expired = token_with(json!({"roles": ["admin"], "exp": past}));
        assert_eq!(nav_state(Some(&expired), now), NavState::Discard);

        let viewer = token_with(json!({"roles": ["viewer"], "exp": future}));
        assert_eq!(nav_state(Some(&viewer), now), NavState::Discard);

        let manager = token_with(json!({"roles": ["manager"], "exp": future}));
        assert!(matches!(nav_state(Some(&manager), now), NavState::Staff(_)));

        let no_exp = token_with(json!({"roles": ["admin"]}));
        assert!(matches!(nav_state(Some(&no_exp), now), NavState::Staff(_)));
    }

    #[test]
    fn admin_gate_splits_sections_by_role() {
        assert_eq!(admin_gate(None), AdminAccess::Denied);
        assert_eq!(admin_gate(Some("x.y")), AdminAccess::Denied);

        let manager = token_with(json!({"roles": ["manager"]}));
        let AdminAccess::Granted { sections, .. } = admin_gate(Some(&manager)) else {
            panic!("manager should be granted");
        };
        assert_eq!(
            sections,
            vec![AdminSection::Matches, AdminSection::Teams, AdminSection::Sanctions]
        );

        let admin = token_with(json!({"roles": ["admin"]}));
        let AdminAccess::Granted { sections, .. } = admin_gate(Some(&admin)) else {
            panic!("admin should be granted");
        };
        assert_eq!(sections, AdminSection::ALL.to_vec());
    }

    #[test]
    fn admin_gate_ignores_expiry() {
        let expired = token_with(json!({"roles": ["admin"], "exp": 1}));
        assert!(matches!(admin_gate(Some(&expired)), AdminAccess::Granted { .. }));
    }

    #[test]
    fn token_store_round_trip_and_clear() {
        let store = temp_store("store");
        assert_eq!(store.load(), None);
        store.save("abc.def.ghi").unwrap();
        assert_eq!(store.load().as_deref(), Some("abc.def.ghi"));
        logout(&store).unwrap();
        assert_eq!(store.load(), None);
        store.clear().unwrap();
    }

    #[tokio::test]
    async fn login_stores_returned_token() {
        let mut server = mockito::Server::new_async().await;
        let token = token_with(json!({"id": "u1", "email": "ops@raynu.gg", "roles": ["admin"]}));
        let m = server
            .mock("POST", "/auth/login")
            .match_body(mockito::Matcher::PartialJson(
                json!({"email": "ops@raynu.gg", "password": "pw"}),
            ))
            .with_status(200)
            .with_body(json!({ "token": token }).to_string())
            .create_async()
            .await;

        let api = RaynuClient::new(SiteConfig { api_base_url: server.url(), ..Default::default() });
        let store = temp_store("login");
        let claims = api.login(&store, "ops@raynu.gg", "pw").await.unwrap();
        m.assert_async().await;
        assert_eq!(claims.email.as_deref(), Some("ops@raynu.gg"));
        assert_eq!(store.load(), Some(token));
        store.clear().unwrap();
    }

    #[tokio::test]
    async fn login_surfaces_server_message_or_fallback() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/login")
            .match_body(mockito::Matcher::PartialJson(json!({"email": "a@b.c"})))
            .with_status(400)
            .with_body(r#"{"message":"Credenciales inválidas"}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/auth/login")
            .match_body(mockito::Matcher::PartialJson(json!({"email": "x@y.z"})))
            .with_status(500)
            .create_async()
            .await;

        let api = RaynuClient::new(SiteConfig { api_base_url: server.url(), ..Default::default() });
        let store = temp_store("login-fail");

        let err = api.login(&store, "a@b.c", "pw").await.unwrap_err();
        assert_eq!(err.user_message(), "Credenciales inválidas");

        let err = api.login(&store, "x@y.z", "pw").await.unwrap_err();
        assert_eq!(err.user_message(), UNKNOWN_LOGIN_ERROR);
        assert_eq!(store.load(), None);
    }
}

//! Authenticated admin operations.
//!
//! Every call carries the bearer token. Input is validated locally first and
//! rejected with [`ApiError::Validation`] before any request goes out.

use crate::bracket::plan_playoff_matches;
use crate::client::{ApiError, ApiResult, RaynuClient, SiteAdapter};
use crate::{AuditLog, Caster, Match, Member, MemberRole, PlayoffRound, Role, Sanction, Team, User};
use log::{debug, error, info};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const MAX_CASTERS: usize = 6;

/// Platforms offered by the social link editor. Anything else goes through
/// [`OTHER_PLATFORM`] with a custom name.
pub const SOCIAL_PLATFORMS: [&str; 7] =
    ["twitch", "youtube", "twitter", "instagram", "tiktok", "facebook", "kick"];
pub const OTHER_PLATFORM: &str = "other";

// ---------------------------------------------------------------------------
// Console data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct AdminData {
    pub teams: Vec<Team>,
    pub matches: Vec<Match>,
    pub casters: Vec<Caster>,
    pub users: Vec<User>,
    pub sanctions: Vec<Sanction>,
    pub logs: Vec<AuditLog>,
}

/// One reload of all six collections. Each may fail on its own.
#[derive(Debug)]
pub struct AdminFetch {
    pub teams: ApiResult<Vec<Team>>,
    pub matches: ApiResult<Vec<Match>>,
    pub casters: ApiResult<Vec<Caster>>,
    pub users: ApiResult<Vec<User>>,
    pub sanctions: ApiResult<Vec<Sanction>>,
    pub logs: ApiResult<Vec<AuditLog>>,
}

impl AdminData {
    /// Replace every collection that loaded. Failed ones keep their previous
    /// contents; their errors are returned.
    pub fn merge(&mut self, fetch: AdminFetch) -> Vec<String> {
        fn take<T>(slot: &mut Vec<T>, res: ApiResult<Vec<T>>, key: &str, errors: &mut Vec<String>) {
            match res {
                Ok(items) => *slot = items,
                Err(e) => {
                    error!("error fetching {key}: {e}");
                    errors.push(format!("{key}: {e}"));
                }
            }
        }

        let mut errors = Vec::new();
        take(&mut self.teams, fetch.teams, "teams", &mut errors);
        take(&mut self.matches, fetch.matches, "matches", &mut errors);
        take(&mut self.casters, fetch.casters, "casters", &mut errors);
        take(&mut self.users, fetch.users, "users", &mut errors);
        take(&mut self.sanctions, fetch.sanctions, "sanctions", &mut errors);
        take(&mut self.logs, fetch.logs, "logs", &mut errors);
        errors
    }

    pub fn team(&self, id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id)
    }

    pub fn team_name(&self, id: &str) -> String {
        self.team(id).map_or_else(|| "Unknown team".to_string(), |t| t.name.clone())
    }

    /// Matches still waiting for a score.
    pub fn pending_matches(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter().filter(|m| !m.is_finished)
    }
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamForm {
    pub name: String,
    pub motto: String,
    pub group: String,
    pub logo: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchForm {
    pub team1: String,
    pub team2: String,
    pub match_date: String,
    pub group: Option<String>,
    pub is_playoff: bool,
    pub playoff_round: Option<PlayoffRound>,
    pub format: Option<String>,
}

impl MatchForm {
    fn validate(&self) -> ApiResult<()> {
        if self.is_playoff && self.playoff_round.is_none() {
            return Err(ApiError::Validation("A playoff round must be selected.".into()));
        }
        Ok(())
    }

    fn body(&self) -> Value {
        let mut body = json!({
            "team1": self.team1,
            "team2": self.team2,
            "matchDate": self.match_date,
            "isPlayoff": self.is_playoff,
        });
        if let Some(group) = self.group.as_deref().filter(|g| !g.is_empty()) {
            body["group"] = json!(group);
        }
        if self.is_playoff
            && let Some(round) = self.playoff_round
        {
            body["playoffRound"] = json!(round);
        }
        if let Some(format) = self.format.as_deref().filter(|f| !f.is_empty()) {
            body["format"] = json!(format);
        }
        body
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CasterForm {
    pub name: String,
    pub description: String,
    pub photo: Option<PathBuf>,
    pub socials: BTreeMap<String, String>,
}

impl CasterForm {
    pub fn from_caster(caster: &Caster) -> Self {
        Self {
            name: caster.name.clone(),
            description: caster.description.clone(),
            photo: None,
            socials: caster.socials.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserForm {
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl Default for UserForm {
    fn default() -> Self {
        Self { email: String::new(), password: String::new(), role: Role::Manager }
    }
}

impl UserForm {
    pub fn from_user(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            password: String::new(),
            // the form only offers admin and manager; anything else edits as manager
            role: user
                .roles
                .iter()
                .copied()
                .find(|r| matches!(r, Role::Admin | Role::Manager))
                .unwrap_or(Role::Manager),
        }
    }

    fn body(&self, updating: bool) -> Value {
        let mut body = json!({ "email": self.email, "role": self.role.label() });
        if !(updating && self.password.is_empty()) {
            body["password"] = json!(self.password);
        }
        body
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanctionForm {
    pub team: String,
    pub reason: String,
    pub penalty: String,
}

/// Add a social link to a caster being edited.
///
/// `platform` is one of [`SOCIAL_PLATFORMS`] or [`OTHER_PLATFORM`]; for the
/// latter `other_name` supplies the platform, lower-cased.
pub fn add_social(
    socials: &mut BTreeMap<String, String>,
    platform: &str,
    other_name: &str,
    url: &str,
) -> ApiResult<()> {
    let platform = if platform == OTHER_PLATFORM {
        let name = other_name.trim().to_lowercase();
        if name.is_empty() {
            return Err(ApiError::Validation(
                "You must name the platform when choosing 'Other'.".into(),
            ));
        }
        name
    } else {
        platform.trim().to_string()
    };
    let url = url.trim();

    if platform.is_empty() || url.is_empty() {
        return Err(ApiError::Validation("Platform and URL are required.".into()));
    }
    if reqwest::Url::parse(url).is_err() {
        return Err(ApiError::Validation("The URL is not valid.".into()));
    }
    if socials.contains_key(&platform) {
        return Err(ApiError::Validation(format!(
            "A social link for \"{platform}\" already exists."
        )));
    }
    socials.insert(platform, url.to_string());
    Ok(())
}

/// Outcome of generating the playoff semifinals. The requests are sent one by
/// one, so a failure can leave earlier matches created.
#[derive(Debug)]
pub struct PlayoffReport {
    pub created: Vec<PlayoffRound>,
    pub failed: Option<(PlayoffRound, ApiError)>,
}

impl PlayoffReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_none()
    }

    pub fn summary(&self) -> String {
        match &self.failed {
            None => "Playoff stage generated.".to_string(),
            Some((round, e)) => {
                let created: Vec<&str> = self.created.iter().map(|r| r.label()).collect();
                let created = if created.is_empty() { "none".to_string() } else { created.join(", ") };
                format!("Creating {round} failed: {}. Already created: {created}.", e.user_message())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

impl RaynuClient {
    /// Reload everything the console shows. The six requests run concurrently.
    pub async fn fetch_all(&self, token: &str) -> AdminFetch {
        let (teams, matches, casters, users, sanctions, logs) = futures_util::join!(
            self.fetch_authed_collection::<Team>(token, "teams"),
            self.fetch_authed_collection::<Match>(token, "matches"),
            self.fetch_authed_collection::<Caster>(token, "casters"),
            self.fetch_authed_collection::<User>(token, "users"),
            self.fetch_authed_collection::<Sanction>(token, "sanctions"),
            self.fetch_authed_collection::<AuditLog>(token, "logs"),
        );
        AdminFetch { teams, matches, casters, users, sanctions, logs }
    }

    pub async fn create_team(&self, token: &str, form: &TeamForm) -> ApiResult<()> {
        let multipart = team_multipart(form).await?;
        self.send_multipart(token, Method::POST, "/teams", multipart).await?;
        info!("created team {}", form.name);
        Ok(())
    }

    pub async fn update_team(&self, token: &str, id: &str, form: &TeamForm) -> ApiResult<()> {
        let multipart = team_multipart(form).await?;
        self.send_multipart(token, Method::PUT, &format!("/teams/{id}"), multipart).await?;
        info!("updated team {id}");
        Ok(())
    }

    pub async fn delete_team(&self, token: &str, id: &str) -> ApiResult<()> {
        self.send_json(token, Method::DELETE, &format!("/teams/{id}"), None).await?;
        info!("deleted team {id}");
        Ok(())
    }

    pub async fn add_member(&self, token: &str, team: &Team, name: &str, role: MemberRole) -> ApiResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::Validation("The member name is required.".into()));
        }
        let mut members = team.members.clone();
        members.push(Member { name: name.to_string(), role });
        self.put_members(token, &team.id, &members).await
    }

    pub async fn remove_member(&self, token: &str, team: &Team, name: &str) -> ApiResult<()> {
        let members: Vec<Member> = team.members.iter().filter(|m| m.name != name).cloned().collect();
        self.put_members(token, &team.id, &members).await
    }

    async fn put_members(&self, token: &str, team_id: &str, members: &[Member]) -> ApiResult<()> {
        let body = json!({ "members": members });
        self.send_json(token, Method::PUT, &format!("/teams/{team_id}"), Some(body)).await?;
        Ok(())
    }

    pub async fn create_match(&self, token: &str, form: &MatchForm) -> ApiResult<()> {
        form.validate()?;
        self.send_json(token, Method::POST, "/matches", Some(form.body())).await?;
        Ok(())
    }

    /// Record a final score; the match is marked finished.
    pub async fn update_score(&self, token: &str, id: &str, score1: u32, score2: u32) -> ApiResult<()> {
        let body = json!({ "scoreTeam1": score1, "scoreTeam2": score2, "isFinished": true });
        self.send_json(token, Method::PUT, &format!("/matches/{id}"), Some(body)).await?;
        Ok(())
    }

    /// Create both upper-bracket semifinals from the current standings.
    ///
    /// Fails without sending anything when a group lacks two teams. Otherwise
    /// the two matches are posted in order and the report says how far it got.
    pub async fn generate_playoffs(&self, token: &str, teams: &[Team]) -> ApiResult<PlayoffReport> {
        let plan = plan_playoff_matches(teams)?;
        let mut report = PlayoffReport { created: Vec::new(), failed: None };
        for planned in plan {
            let body = serde_json::to_value(&planned)
                .map_err(|e| ApiError::Other(format!("could not encode match: {e}")))?;
            match self.send_json(token, Method::POST, "/matches", Some(body)).await {
                Ok(_) => report.created.push(planned.playoff_round),
                Err(e) => {
                    error!("creating playoff match {} failed: {e}", planned.playoff_round);
                    report.failed = Some((planned.playoff_round, e));
                    break;
                }
            }
        }
        Ok(report)
    }

    /// Create a caster, or update `editing` when set. The caster cap applies
    /// to creation only.
    pub async fn save_caster(
        &self,
        token: &str,
        editing: Option<&str>,
        existing: usize,
        form: &CasterForm,
    ) -> ApiResult<()> {
        if editing.is_none() && existing >= MAX_CASTERS {
            return Err(ApiError::Validation(format!(
                "No more than {MAX_CASTERS} casters can be added."
            )));
        }
        let socials = serde_json::to_string(&form.socials)
            .map_err(|e| ApiError::Other(format!("could not encode socials: {e}")))?;
        let mut multipart = Form::new()
            .text("name", form.name.clone())
            .text("description", form.description.clone())
            .text("socials", socials);
        if let Some(path) = &form.photo {
            multipart = multipart.part("photo", file_part(path).await?);
        }
        let (method, endpoint) = match editing {
            Some(id) => (Method::PUT, format!("/casters/{id}")),
            None => (Method::POST, "/casters".to_string()),
        };
        self.send_multipart(token, method, &endpoint, multipart).await?;
        Ok(())
    }

    pub async fn delete_caster(&self, token: &str, id: &str) -> ApiResult<()> {
        self.send_json(token, Method::DELETE, &format!("/casters/{id}"), None).await?;
        Ok(())
    }

    /// Create a user, or update `editing` when set. An empty password leaves
    /// the stored one unchanged on update.
    pub async fn save_user(&self, token: &str, editing: Option<&str>, form: &UserForm) -> ApiResult<()> {
        let (method, endpoint) = match editing {
            Some(id) => (Method::PUT, format!("/users/{id}")),
            None => (Method::POST, "/users".to_string()),
        };
        self.send_json(token, method, &endpoint, Some(form.body(editing.is_some()))).await?;
        Ok(())
    }

    /// `current_user` is the token subject; nobody can delete themselves.
    pub async fn delete_user(&self, token: &str, id: &str, current_user: Option<&str>) -> ApiResult<()> {
        if current_user == Some(id) {
            return Err(ApiError::Validation("You cannot delete your own account.".into()));
        }
        self.send_json(token, Method::DELETE, &format!("/users/{id}"), None).await?;
        Ok(())
    }

    pub async fn create_sanction(&self, token: &str, form: &SanctionForm) -> ApiResult<()> {
        let body = json!({ "team": form.team, "reason": form.reason, "penalty": form.penalty });
        self.send_json(token, Method::POST, "/sanctions", Some(body)).await?;
        Ok(())
    }

    pub async fn delete_sanction(&self, token: &str, id: &str) -> ApiResult<()> {
        self.send_json(token, Method::DELETE, &format!("/sanctions/{id}"), None).await?;
        Ok(())
    }

    async fn fetch_authed_collection<T: serde::de::DeserializeOwned>(
        &self,
        token: &str,
        key: &str,
    ) -> ApiResult<Vec<T>> {
        let body = self.send_json(token, Method::GET, &format!("/{key}"), None).await?;
        Ok(crate::wire::extract_collection(body, key))
    }

    async fn send_json(
        &self,
        token: &str,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> ApiResult<Value> {
        let url = self.build_api_url(endpoint);
        debug!("{method} {url}");
        let mut request = self.http().request(method, &url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        self.execute(request, &url).await
    }

    async fn send_multipart(
        &self,
        token: &str,
        method: Method,
        endpoint: &str,
        form: Form,
    ) -> ApiResult<Value> {
        let url = self.build_api_url(endpoint);
        debug!("{method} {url} (multipart)");
        let request = self.http().request(method, &url).bearer_auth(token).multipart(form);
        self.execute(request, &url).await
    }
}

async fn team_multipart(form: &TeamForm) -> ApiResult<Form> {
    let mut multipart = Form::new()
        .text("name", form.name.clone())
        .text("motto", form.motto.clone())
        .text("group", form.group.clone());
    if let Some(path) = &form.logo {
        multipart = multipart.part("logo", file_part(path).await?);
    }
    Ok(multipart)
}

async fn file_part(path: &Path) -> ApiResult<Part> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ApiError::Io(e, path.display().to_string()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(Part::bytes(bytes).file_name(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TeamStats;
    use crate::config::SiteConfig;
    use mockito::Matcher;

    const TOKEN: &str = "header.payload.sig";

    fn client(server: &mockito::Server) -> RaynuClient {
        RaynuClient::new(SiteConfig { api_base_url: server.url(), ..Default::default() })
    }

    fn team(id: &str, group: &str, points: i32) -> Team {
        Team {
            id: id.into(),
            name: id.into(),
            group: group.into(),
            stats: TeamStats { points, ..Default::default() },
            ..Default::default()
        }
    }

    #[test]
    fn socials_validation() {
        let mut socials = BTreeMap::new();
        add_social(&mut socials, "twitch", "", "https://twitch.tv/raynu").unwrap();
        add_social(&mut socials, OTHER_PLATFORM, "  Kick ", "https://kick.com/raynu").unwrap();
        assert_eq!(socials.get("kick").map(String::as_str), Some("https://kick.com/raynu"));

        assert!(matches!(
            add_social(&mut socials, OTHER_PLATFORM, " ", "https://x.y"),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(add_social(&mut socials, "", "", "https://x.y"), Err(ApiError::Validation(_))));
        assert!(matches!(
            add_social(&mut socials, "youtube", "", "not a url"),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            add_social(&mut socials, "twitch", "", "https://twitch.tv/other"),
            Err(ApiError::Validation(_))
        ));
        assert_eq!(socials.len(), 2);
    }

    #[test]
    fn user_body_omits_blank_password_on_update_only() {
        let form = UserForm { email: "a@b.c".into(), password: String::new(), role: Role::Admin };
        assert!(form.body(true).get("password").is_none());
        assert_eq!(form.body(false)["password"], "");
        assert_eq!(form.body(true)["role"], "admin");
    }

    #[test]
    fn editing_user_with_unknown_first_role_keeps_manager() {
        let user = User {
            id: "u1".into(),
            email: "m@raynu.gg".into(),
            roles: vec![Role::Other, Role::Manager],
        };
        assert_eq!(UserForm::from_user(&user).role, Role::Manager);

        let user = User { roles: vec![Role::Other], ..user };
        assert_eq!(UserForm::from_user(&user).role, Role::Manager);

        let user = User { roles: vec![Role::Other, Role::Admin], ..user };
        assert_eq!(UserForm::from_user(&user).role, Role::Admin);
    }

    #[test]
    fn match_body_includes_round_only_for_playoffs() {
        let form = MatchForm {
            team1: "a".into(),
            team2: "b".into(),
            match_date: "2025-08-01T18:00".into(),
            playoff_round: Some(PlayoffRound::GrandFinal),
            ..Default::default()
        };
        assert!(form.body().get("playoffRound").is_none());
        let form = MatchForm { is_playoff: true, ..form };
        assert_eq!(form.body()["playoffRound"], "grand-final");
        assert!(MatchForm { is_playoff: true, ..Default::default() }.validate().is_err());
    }

    #[test]
    fn merge_keeps_previous_data_for_failed_collections() {
        let mut data = AdminData { users: vec![User { id: "u1".into(), ..Default::default() }], ..Default::default() };
        let errors = data.merge(AdminFetch {
            teams: Ok(vec![team("t1", "A", 0)]),
            matches: Ok(vec![]),
            casters: Ok(vec![]),
            users: Err(ApiError::Api { status: 403, message: "HTTP 403".into(), url: "/users".into() }),
            sanctions: Ok(vec![]),
            logs: Ok(vec![]),
        });
        assert_eq!(errors.len(), 1);
        assert_eq!(data.users.len(), 1);
        assert_eq!(data.teams.len(), 1);
        assert_eq!(data.team_name("t1"), "t1");
        assert_eq!(data.team_name("zz"), "Unknown team");
    }

    #[tokio::test]
    async fn mutations_send_bearer_token_and_surface_server_message() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("DELETE", "/teams/t1")
            .match_header("authorization", "Bearer header.payload.sig")
            .with_status(409)
            .with_body(r#"{"message":"Team has matches"}"#)
            .create_async()
            .await;

        let err = client(&server).delete_team(TOKEN, "t1").await.unwrap_err();
        m.assert_async().await;
        assert_eq!(err.user_message(), "Team has matches");
    }

    #[tokio::test]
    async fn score_update_marks_match_finished() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("PUT", "/matches/m7")
            .match_body(Matcher::Json(json!({"scoreTeam1": 2, "scoreTeam2": 0, "isFinished": true})))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        client(&server).update_score(TOKEN, "m7", 2, 0).await.unwrap();
        m.assert_async().await;
    }

    #[tokio::test]
    async fn team_create_is_multipart() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/teams")
            .match_header("content-type", Matcher::Regex("^multipart/form-data".into()))
            .match_body(Matcher::Regex("Night Owls".into()))
            .with_status(201)
            .create_async()
            .await;
        let form = TeamForm { name: "Night Owls".into(), group: "A".into(), ..Default::default() };
        client(&server).create_team(TOKEN, &form).await.unwrap();
        m.assert_async().await;
    }

    #[tokio::test]
    async fn member_changes_put_the_full_list() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("PUT", "/teams/t1")
            .match_body(Matcher::Json(json!({"members": [
                {"name": "kai", "role": "player"},
                {"name": "rin", "role": "stand-in"}
            ]})))
            .with_status(200)
            .create_async()
            .await;

        let mut t = team("t1", "A", 0);
        t.members.push(Member { name: "kai".into(), role: MemberRole::Player });
        let api = client(&server);
        api.add_member(TOKEN, &t, " rin ", MemberRole::StandIn).await.unwrap();
        m.assert_async().await;

        assert!(matches!(
            api.add_member(TOKEN, &t, "  ", MemberRole::Coach).await,
            Err(ApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn caster_cap_applies_to_create_only() {
        let mut server = mockito::Server::new_async().await;
        let create = server.mock("POST", "/casters").expect(0).create_async().await;
        let update = server.mock("PUT", "/casters/c1").with_status(200).create_async().await;

        let api = client(&server);
        let form = CasterForm { name: "Vox".into(), ..Default::default() };
        assert!(matches!(
            api.save_caster(TOKEN, None, MAX_CASTERS, &form).await,
            Err(ApiError::Validation(_))
        ));
        api.save_caster(TOKEN, Some("c1"), MAX_CASTERS, &form).await.unwrap();
        create.assert_async().await;
        update.assert_async().await;
    }

    #[tokio::test]
    async fn self_delete_is_blocked_locally() {
        let mut server = mockito::Server::new_async().await;
        let m = server.mock("DELETE", "/users/u1").expect(0).create_async().await;
        let err = client(&server).delete_user(TOKEN, "u1", Some("u1")).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        m.assert_async().await;
    }

    #[tokio::test]
    async fn playoffs_post_both_semis_in_order() {
        let mut server = mockito::Server::new_async().await;
        let sf1 = server
            .mock("POST", "/matches")
            .match_body(Matcher::PartialJson(json!({
                "team1": "a1", "team2": "b2", "playoffRound": "ub-sf-1",
                "isPlayoff": true, "format": "bo3", "matchDate": "2025-08-10T16:00:00-05:00"
            })))
            .with_status(201)
            .create_async()
            .await;
        let sf2 = server
            .mock("POST", "/matches")
            .match_body(Matcher::PartialJson(json!({
                "team1": "b1", "team2": "a2", "playoffRound": "ub-sf-2"
            })))
            .with_status(201)
            .create_async()
            .await;

        let teams = vec![team("a1", "A", 9), team("a2", "A", 6), team("b1", "B", 9), team("b2", "B", 3)];
        let report = client(&server).generate_playoffs(TOKEN, &teams).await.unwrap();
        sf1.assert_async().await;
        sf2.assert_async().await;
        assert!(report.is_complete());
        assert_eq!(report.created, vec![PlayoffRound::UpperSemi1, PlayoffRound::UpperSemi2]);
    }

    #[tokio::test]
    async fn playoff_partial_failure_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/matches")
            .match_body(Matcher::PartialJson(json!({"playoffRound": "ub-sf-1"})))
            .with_status(201)
            .create_async()
            .await;
        server
            .mock("POST", "/matches")
            .match_body(Matcher::PartialJson(json!({"playoffRound": "ub-sf-2"})))
            .with_status(500)
            .with_body(r#"{"message":"db down"}"#)
            .create_async()
            .await;

        let teams = vec![team("a1", "A", 9), team("a2", "A", 6), team("b1", "B", 9), team("b2", "B", 3)];
        let report = client(&server).generate_playoffs(TOKEN, &teams).await.unwrap();
        assert_eq!(report.created, vec![PlayoffRound::UpperSemi1]);
        assert!(report.summary().contains("db down"));
        assert!(report.summary().contains("ub-sf-1"));
    }

    #[tokio::test]
    async fn playoffs_need_two_teams_per_group() {
        let mut server = mockito::Server::new_async().await;
        let m = server.mock("POST", "/matches").expect(0).create_async().await;
        let teams = vec![team("a1", "A", 9), team("a2", "A", 6), team("b1", "B", 9)];
        assert!(client(&server).generate_playoffs(TOKEN, &teams).await.is_err());
        m.assert_async().await;
    }

    #[tokio::test]
    async fn fetch_all_reads_each_envelope() {
        let mut server = mockito::Server::new_async().await;
        for (path, body) in [
            ("/teams", r#"{"teams":[{"_id":"t1"}]}"#),
            ("/matches", r#"{"matches":[]}"#),
            ("/casters", r#"{"casters":[]}"#),
            ("/users", r#"{"users":[{"_id":"u1","email":"a@b.c","roles":["admin"]}]}"#),
            ("/sanctions", r#"{"sanctions":[{"_id":"s1","team":"t1","reason":"late","penalty":"-1"}]}"#),
        ] {
            server
                .mock("GET", path)
                .match_header("authorization", "Bearer header.payload.sig")
                .with_status(200)
                .with_body(body)
                .create_async()
                .await;
        }
        server.mock("GET", "/logs").with_status(403).create_async().await;

        let fetch = client(&server).fetch_all(TOKEN).await;
        let mut data = AdminData::default();
        let errors = data.merge(fetch);
        assert_eq!(errors.len(), 1);
        assert_eq!(data.teams[0].id, "t1");
        assert_eq!(data.users[0].roles, vec![Role::Admin]);
        assert_eq!(data.sanctions[0].penalty, "-1");
    }
}

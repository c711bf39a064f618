use chrono::{DateTime, NaiveDateTime};
use raynu_api::admin::{
    AdminData, AdminFetch, CasterForm, MatchForm, OTHER_PLATFORM, SOCIAL_PLATFORMS, SanctionForm,
    TeamForm, UserForm, add_social,
};
use raynu_api::auth::{AdminAccess, AdminSection, Claims};
use raynu_api::client::{ApiError, ApiResult};
use raynu_api::{BRACKET_GROUPS, Caster, Match, MemberRole, PlayoffRound, Role, Team, User};
use std::collections::BTreeMap;
use std::path::PathBuf;

const MATCH_FORMATS: [&str; 3] = ["bo1", "bo3", "bo5"];

// ---------------------------------------------------------------------------
// Requests handed to the network worker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum AdminRequest {
    CreateTeam(TeamForm),
    UpdateTeam { id: String, form: TeamForm },
    DeleteTeam { id: String },
    AddMember { team: Team, name: String, role: MemberRole },
    RemoveMember { team: Team, name: String },
    CreateMatch(MatchForm),
    UpdateScore { id: String, score1: u32, score2: u32 },
    GeneratePlayoffs { teams: Vec<Team> },
    SaveCaster { editing: Option<String>, existing: usize, form: CasterForm },
    DeleteCaster { id: String },
    SaveUser { editing: Option<String>, form: UserForm },
    DeleteUser { id: String, current_user: Option<String> },
    CreateSanction(SanctionForm),
    DeleteSanction { id: String },
}

impl AdminRequest {
    pub fn success_message(&self) -> &'static str {
        match self {
            AdminRequest::CreateTeam(_) => "Team created.",
            AdminRequest::UpdateTeam { .. } => "Team updated.",
            AdminRequest::DeleteTeam { .. } => "Team deleted.",
            AdminRequest::AddMember { .. } => "Member added.",
            AdminRequest::RemoveMember { .. } => "Member removed.",
            AdminRequest::CreateMatch(_) => "Match created.",
            AdminRequest::UpdateScore { .. } => "Score saved.",
            AdminRequest::GeneratePlayoffs { .. } => "Playoff stage generated.",
            AdminRequest::SaveCaster { editing: Some(_), .. } => "Caster updated.",
            AdminRequest::SaveCaster { editing: None, .. } => "Caster created.",
            AdminRequest::DeleteCaster { .. } => "Caster deleted.",
            AdminRequest::SaveUser { editing: Some(_), .. } => "User updated.",
            AdminRequest::SaveUser { editing: None, .. } => "User created.",
            AdminRequest::DeleteUser { .. } => "User deleted.",
            AdminRequest::CreateSanction(_) => "Sanction created.",
            AdminRequest::DeleteSanction { .. } => "Sanction deleted.",
        }
    }
}

/// A destructive request waiting for a yes/no answer.
#[derive(Debug, Clone)]
pub struct Confirm {
    pub prompt: String,
    pub request: AdminRequest,
}

// ---------------------------------------------------------------------------
// Form fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Field {
    pub label: &'static str,
    pub input: String,
    pub secret: bool,
    /// `(shown, sent)` pairs. Empty for free text.
    pub choices: Vec<(String, String)>,
    pub selected: usize,
}

impl Field {
    fn text(label: &'static str, value: impl Into<String>) -> Self {
        Self { label, input: value.into(), ..Self::default() }
    }

    fn secret(label: &'static str) -> Self {
        Self { label, secret: true, ..Self::default() }
    }

    fn choice(label: &'static str, choices: Vec<(String, String)>, current: &str) -> Self {
        let selected = choices.iter().position(|(_, v)| v == current).unwrap_or(0);
        Self { label, choices, selected, ..Self::default() }
    }

    pub fn is_choice(&self) -> bool {
        !self.choices.is_empty()
    }

    pub fn value(&self) -> &str {
        if self.choices.is_empty() {
            self.input.trim()
        } else {
            self.choices.get(self.selected).map_or("", |(_, v)| v.as_str())
        }
    }

    pub fn display(&self) -> String {
        if let Some((shown, _)) = self.choices.get(self.selected) {
            format!("< {shown} >")
        } else if self.secret {
            "*".repeat(self.input.chars().count())
        } else {
            self.input.clone()
        }
    }

    fn cycle(&mut self, forward: bool) {
        let len = self.choices.len();
        if len == 0 {
            return;
        }
        self.selected = if forward { (self.selected + 1) % len } else { (self.selected + len - 1) % len };
    }
}

fn same(values: &[&str]) -> Vec<(String, String)> {
    values.iter().map(|v| (v.to_string(), v.to_string())).collect()
}

fn team_choices(teams: &[Team]) -> Vec<(String, String)> {
    teams.iter().map(|t| (format!("{} ({})", t.name, t.group), t.id.clone())).collect()
}

fn required<'a>(value: &'a str, what: &str) -> ApiResult<&'a str> {
    if value.is_empty() {
        return Err(ApiError::Validation(format!("{what} is required.")));
    }
    Ok(value)
}

fn optional_path(value: &str) -> Option<PathBuf> {
    (!value.is_empty()).then(|| PathBuf::from(value))
}

/// Accepts RFC 3339 or a plain `YYYY-MM-DD HH:MM` local time.
fn normalize_match_date(value: &str) -> ApiResult<String> {
    if DateTime::parse_from_rfc3339(value).is_ok() {
        return Ok(value.to_string());
    }
    ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.format("%Y-%m-%dT%H:%M").to_string())
        .ok_or_else(|| ApiError::Validation("Use YYYY-MM-DD HH:MM for the match date.".into()))
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum FormKind {
    Team { editing: Option<String> },
    AddMember { team_id: String },
    RemoveMember { team_id: String },
    Match,
    Score { match_id: String },
    Caster { editing: Option<String> },
    User { editing: Option<String> },
    Sanction,
}

pub enum FormOutcome {
    Send(AdminRequest),
    Confirm(Confirm),
}

#[derive(Debug, Clone)]
pub struct FormState {
    pub kind: FormKind,
    pub title: String,
    pub fields: Vec<Field>,
    pub focus: usize,
    /// Social links of the caster being edited.
    pub socials: BTreeMap<String, String>,
}

impl FormState {
    fn new(kind: FormKind, title: impl Into<String>, fields: Vec<Field>) -> Self {
        Self { kind, title: title.into(), fields, focus: 0, socials: BTreeMap::new() }
    }

    pub fn team(editing: Option<&Team>) -> Self {
        let groups = same(&BRACKET_GROUPS);
        let (title, name, motto, group) = match editing {
            Some(t) => (
                format!("Edit team {}", t.name),
                t.name.as_str(),
                t.motto.as_deref().unwrap_or_default(),
                t.group.as_str(),
            ),
            None => ("New team".to_string(), "", "", ""),
        };
        Self::new(
            FormKind::Team { editing: editing.map(|t| t.id.clone()) },
            title,
            vec![
                Field::text("Name", name),
                Field::text("Motto", motto),
                Field::choice("Group", groups, group),
                Field::text("Logo file", ""),
            ],
        )
    }

    pub fn add_member(team: &Team) -> Self {
        let roles = MemberRole::SELECTABLE
            .iter()
            .map(|r| (r.label().to_string(), r.label().to_string()))
            .collect();
        Self::new(
            FormKind::AddMember { team_id: team.id.clone() },
            format!("Add member to {}", team.name),
            vec![Field::text("Name", ""), Field::choice("Role", roles, "player")],
        )
    }

    pub fn remove_member(team: &Team) -> Option<Self> {
        if team.members.is_empty() {
            return None;
        }
        let members = team
            .members
            .iter()
            .map(|m| (format!("{} ({})", m.name, m.role.label()), m.name.clone()))
            .collect();
        Some(Self::new(
            FormKind::RemoveMember { team_id: team.id.clone() },
            format!("Remove member from {}", team.name),
            vec![Field::choice("Member", members, "")],
        ))
    }

    pub fn new_match(teams: &[Team]) -> Self {
        let mut groups = vec![("none".to_string(), String::new())];
        groups.extend(same(&BRACKET_GROUPS));
        let mut rounds = vec![("none".to_string(), String::new())];
        rounds.extend(PlayoffRound::ALL.iter().map(|r| (r.label().to_string(), r.label().to_string())));
        Self::new(
            FormKind::Match,
            "New match",
            vec![
                Field::choice("Team 1", team_choices(teams), ""),
                Field::choice("Team 2", team_choices(teams), ""),
                Field::text("Date", ""),
                Field::choice("Group", groups, ""),
                Field::choice("Playoff", same(&["no", "yes"]), "no"),
                Field::choice("Round", rounds, ""),
                Field::choice("Format", same(&MATCH_FORMATS), "bo3"),
            ],
        )
    }

    pub fn score(m: &Match, data: &AdminData) -> Self {
        let name = |r: &Option<raynu_api::TeamRef>| {
            r.as_ref().map_or_else(|| "TBD".to_string(), |r| data.team_name(r.id()))
        };
        let (s1, s2) = m.final_score().map_or((String::new(), String::new()), |(a, b)| {
            (a.to_string(), b.to_string())
        });
        Self::new(
            FormKind::Score { match_id: m.id.clone() },
            format!("Score: {} vs {}", name(&m.team1), name(&m.team2)),
            vec![Field::text("Team 1 score", s1), Field::text("Team 2 score", s2)],
        )
    }

    pub fn caster(editing: Option<&Caster>) -> Self {
        let mut platforms = same(&SOCIAL_PLATFORMS);
        platforms.push((OTHER_PLATFORM.to_string(), OTHER_PLATFORM.to_string()));
        let existing = editing.map(CasterForm::from_caster).unwrap_or_default();
        let mut form = Self::new(
            FormKind::Caster { editing: editing.map(|c| c.id.clone()) },
            editing.map_or_else(|| "New caster".to_string(), |c| format!("Edit caster {}", c.name)),
            vec![
                Field::text("Name", existing.name),
                Field::text("Description", existing.description),
                Field::text("Photo file", ""),
                Field::choice("Platform", platforms, ""),
                Field::text("Other platform", ""),
                Field::text("Link URL", ""),
            ],
        );
        form.socials = existing.socials;
        form
    }

    pub fn user(editing: Option<&User>) -> Self {
        let existing = editing.map(UserForm::from_user).unwrap_or_default();
        let roles = [Role::Admin, Role::Manager]
            .iter()
            .map(|r| (r.label().to_string(), r.label().to_string()))
            .collect();
        let mut password = Field::secret("Password");
        password.input = existing.password;
        Self::new(
            FormKind::User { editing: editing.map(|u| u.id.clone()) },
            editing.map_or_else(|| "New user".to_string(), |u| format!("Edit user {}", u.email)),
            vec![
                Field::text("Email", existing.email),
                password,
                Field::choice("Role", roles, existing.role.label()),
            ],
        )
    }

    pub fn sanction(teams: &[Team]) -> Self {
        Self::new(
            FormKind::Sanction,
            "New sanction",
            vec![
                Field::choice("Team", team_choices(teams), ""),
                Field::text("Reason", ""),
                Field::text("Penalty", ""),
            ],
        )
    }

    // -- editing ------------------------------------------------------------

    pub fn focused(&self) -> Option<&Field> {
        self.fields.get(self.focus)
    }

    pub fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn focus_prev(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    pub fn input_char(&mut self, c: char) {
        if let Some(field) = self.fields.get_mut(self.focus)
            && !field.is_choice()
        {
            field.input.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.input.pop();
        }
    }

    pub fn cycle_choice(&mut self, forward: bool) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.cycle(forward);
        }
    }

    fn value(&self, label: &str) -> &str {
        self.fields.iter().find(|f| f.label == label).map_or("", Field::value)
    }

    fn clear(&mut self, label: &str) {
        if let Some(field) = self.fields.iter_mut().find(|f| f.label == label) {
            field.input.clear();
        }
    }

    /// True while the caster social editor has the focus.
    pub fn editing_socials(&self) -> bool {
        matches!(self.kind, FormKind::Caster { .. })
            && self
                .focused()
                .is_some_and(|f| matches!(f.label, "Platform" | "Other platform" | "Link URL"))
    }

    pub fn add_social(&mut self) -> ApiResult<()> {
        let platform = self.value("Platform").to_string();
        let other = self.value("Other platform").to_string();
        let url = self.value("Link URL").to_string();
        add_social(&mut self.socials, &platform, &other, &url)?;
        self.clear("Other platform");
        self.clear("Link URL");
        Ok(())
    }

    pub fn remove_social(&mut self) {
        let platform = match self.value("Platform") {
            OTHER_PLATFORM => self.value("Other platform").to_lowercase(),
            p => p.to_string(),
        };
        self.socials.remove(&platform);
    }

    // -- submission ---------------------------------------------------------

    /// Validate the form and turn it into the request to send. Nothing is
    /// sent when validation fails.
    pub fn submit(&self, data: &AdminData) -> ApiResult<FormOutcome> {
        let request = match &self.kind {
            FormKind::Team { editing } => {
                let form = TeamForm {
                    name: required(self.value("Name"), "The team name")?.to_string(),
                    motto: self.value("Motto").to_string(),
                    group: required(self.value("Group"), "The group")?.to_string(),
                    logo: optional_path(self.value("Logo file")),
                };
                match editing {
                    Some(id) => AdminRequest::UpdateTeam { id: id.clone(), form },
                    None => AdminRequest::CreateTeam(form),
                }
            }
            FormKind::AddMember { team_id } => {
                let team = data
                    .team(team_id)
                    .ok_or_else(|| ApiError::NotFound(format!("team {team_id}")))?;
                AdminRequest::AddMember {
                    team: team.clone(),
                    name: required(self.value("Name"), "The member name")?.to_string(),
                    role: MemberRole::from(self.value("Role").to_string()),
                }
            }
            FormKind::RemoveMember { team_id } => {
                let team = data
                    .team(team_id)
                    .ok_or_else(|| ApiError::NotFound(format!("team {team_id}")))?;
                let name = required(self.value("Member"), "A member")?.to_string();
                return Ok(FormOutcome::Confirm(Confirm {
                    prompt: format!("Remove {name} from {}?", team.name),
                    request: AdminRequest::RemoveMember { team: team.clone(), name },
                }));
            }
            FormKind::Match => {
                let team1 = required(self.value("Team 1"), "Team 1")?;
                let team2 = required(self.value("Team 2"), "Team 2")?;
                if team1 == team2 {
                    return Err(ApiError::Validation("A team cannot play against itself.".into()));
                }
                let match_date = normalize_match_date(required(self.value("Date"), "The match date")?)?;
                let non_empty = |v: &str| (!v.is_empty()).then(|| v.to_string());
                AdminRequest::CreateMatch(MatchForm {
                    team1: team1.to_string(),
                    team2: team2.to_string(),
                    match_date,
                    group: non_empty(self.value("Group")),
                    is_playoff: self.value("Playoff") == "yes",
                    playoff_round: PlayoffRound::from_label(self.value("Round")),
                    format: non_empty(self.value("Format")),
                })
            }
            FormKind::Score { match_id } => {
                let parse = |label: &str| {
                    self.value(label)
                        .parse::<u32>()
                        .map_err(|_| ApiError::Validation("Scores must be whole numbers.".into()))
                };
                AdminRequest::UpdateScore {
                    id: match_id.clone(),
                    score1: parse("Team 1 score")?,
                    score2: parse("Team 2 score")?,
                }
            }
            FormKind::Caster { editing } => AdminRequest::SaveCaster {
                editing: editing.clone(),
                existing: data.casters.len(),
                form: CasterForm {
                    name: required(self.value("Name"), "The caster name")?.to_string(),
                    description: self.value("Description").to_string(),
                    photo: optional_path(self.value("Photo file")),
                    socials: self.socials.clone(),
                },
            },
            FormKind::User { editing } => {
                let password = self.value("Password");
                if editing.is_none() {
                    required(password, "A password")?;
                }
                AdminRequest::SaveUser {
                    editing: editing.clone(),
                    form: UserForm {
                        email: required(self.value("Email"), "The email")?.to_string(),
                        password: password.to_string(),
                        role: if self.value("Role") == "admin" { Role::Admin } else { Role::Manager },
                    },
                }
            }
            FormKind::Sanction => AdminRequest::CreateSanction(SanctionForm {
                team: required(self.value("Team"), "A team")?.to_string(),
                reason: required(self.value("Reason"), "The reason")?.to_string(),
                penalty: required(self.value("Penalty"), "The penalty")?.to_string(),
            }),
        };
        Ok(FormOutcome::Send(request))
    }
}

// ---------------------------------------------------------------------------
// Console state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct AdminState {
    pub data: AdminData,
    pub loaded: bool,
    /// Index into the sections the current role may see.
    pub section: usize,
    pub selected: usize,
    pub form: Option<FormState>,
    pub confirm: Option<Confirm>,
}

impl AdminState {
    /// Returns the collections that failed to load. The selection is kept
    /// inside `current`, the section on screen.
    pub fn on_loaded(&mut self, fetch: AdminFetch, current: Option<AdminSection>) -> Vec<String> {
        let failed = self.data.merge(fetch);
        self.loaded = true;
        self.form = None;
        self.clamp_selection(current);
        failed
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn current_section(&self, access: &AdminAccess) -> Option<AdminSection> {
        match access {
            AdminAccess::Granted { sections, .. } => sections.get(self.section).copied(),
            AdminAccess::Denied => None,
        }
    }

    pub fn cycle_section(&mut self, access: &AdminAccess, forward: bool) {
        let AdminAccess::Granted { sections, .. } = access else {
            return;
        };
        let len = sections.len();
        if len == 0 {
            return;
        }
        self.section = if forward { (self.section + 1) % len } else { (self.section + len - 1) % len };
        self.selected = 0;
    }

    pub fn row_count(&self, section: AdminSection) -> usize {
        match section {
            AdminSection::Matches => self.data.matches.len(),
            AdminSection::Teams => self.data.teams.len(),
            AdminSection::Sanctions => self.data.sanctions.len(),
            AdminSection::Casters => self.data.casters.len(),
            AdminSection::Users => self.data.users.len(),
            AdminSection::Logs => self.data.logs.len(),
        }
    }

    pub fn select_down(&mut self, section: AdminSection) {
        if self.selected + 1 < self.row_count(section) {
            self.selected += 1;
        }
    }

    pub fn select_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn clamp_selection(&mut self, section: Option<AdminSection>) {
        let rows = section.map_or(0, |s| self.row_count(s));
        self.selected = self.selected.min(rows.saturating_sub(1));
    }

    pub fn selected_team(&self) -> Option<&Team> {
        self.data.teams.get(self.selected)
    }

    pub fn selected_match(&self) -> Option<&Match> {
        self.data.matches.get(self.selected)
    }

    /// True when the selected user row is the signed-in account.
    pub fn selected_is_self(&self, claims: Option<&Claims>) -> bool {
        let Some(me) = claims.and_then(|c| c.id.as_deref()) else {
            return false;
        };
        self.data.users.get(self.selected).is_some_and(|u| u.id == me)
    }

    // -- actions ------------------------------------------------------------

    pub fn open_new(&mut self, section: AdminSection) {
        self.form = match section {
            AdminSection::Teams => Some(FormState::team(None)),
            AdminSection::Matches => Some(FormState::new_match(&self.data.teams)),
            AdminSection::Casters => Some(FormState::caster(None)),
            AdminSection::Users => Some(FormState::user(None)),
            AdminSection::Sanctions => Some(FormState::sanction(&self.data.teams)),
            AdminSection::Logs => None,
        };
    }

    pub fn open_edit(&mut self, section: AdminSection) {
        let form = match section {
            AdminSection::Teams => self.selected_team().map(|t| FormState::team(Some(t))),
            AdminSection::Matches => self.selected_match().map(|m| FormState::score(m, &self.data)),
            AdminSection::Casters => self.data.casters.get(self.selected).map(|c| FormState::caster(Some(c))),
            AdminSection::Users => self.data.users.get(self.selected).map(|u| FormState::user(Some(u))),
            AdminSection::Sanctions | AdminSection::Logs => None,
        };
        if form.is_some() {
            self.form = form;
        }
    }

    pub fn open_add_member(&mut self) {
        if let Some(team) = self.selected_team() {
            self.form = Some(FormState::add_member(team));
        }
    }

    pub fn open_remove_member(&mut self) {
        if let Some(form) = self.selected_team().and_then(FormState::remove_member) {
            self.form = Some(form);
        }
    }

    pub fn ask_delete(&mut self, section: AdminSection, claims: Option<&Claims>) {
        let selected = self.selected;
        let confirm = match section {
            AdminSection::Teams => self.data.teams.get(selected).map(|t| Confirm {
                prompt: format!("Delete team {}?", t.name),
                request: AdminRequest::DeleteTeam { id: t.id.clone() },
            }),
            AdminSection::Casters => self.data.casters.get(selected).map(|c| Confirm {
                prompt: format!("Delete caster {}?", c.name),
                request: AdminRequest::DeleteCaster { id: c.id.clone() },
            }),
            AdminSection::Users => self
                .data
                .users
                .get(selected)
                .filter(|_| !self.selected_is_self(claims))
                .map(|u| Confirm {
                    prompt: format!("Delete user {}?", u.email),
                    request: AdminRequest::DeleteUser {
                        id: u.id.clone(),
                        current_user: claims.and_then(|c| c.id.clone()),
                    },
                }),
            AdminSection::Sanctions => self.data.sanctions.get(selected).map(|s| {
                let team = s.team.as_ref().map_or_else(String::new, |t| self.data.team_name(t.id()));
                Confirm {
                    prompt: format!("Delete the sanction for {team}?"),
                    request: AdminRequest::DeleteSanction { id: s.id.clone() },
                }
            }),
            AdminSection::Matches | AdminSection::Logs => None,
        };
        if confirm.is_some() {
            self.confirm = confirm;
        }
    }

    pub fn ask_generate_playoffs(&mut self, prompt: impl Into<String>) {
        self.confirm = Some(Confirm {
            prompt: prompt.into(),
            request: AdminRequest::GeneratePlayoffs { teams: self.data.teams.clone() },
        });
    }

    /// Submit the open form. On success the form closes and the request (or
    /// its confirmation) is returned.
    pub fn submit_form(&mut self) -> ApiResult<Option<AdminRequest>> {
        let Some(form) = &self.form else {
            return Ok(None);
        };
        match form.submit(&self.data)? {
            FormOutcome::Send(request) => {
                self.form = None;
                Ok(Some(request))
            }
            FormOutcome::Confirm(confirm) => {
                self.form = None;
                self.confirm = Some(confirm);
                Ok(None)
            }
        }
    }
}

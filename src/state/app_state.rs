use crate::app::MenuItem;
use crate::state::admin::AdminState;
use raynu_api::auth::Claims;
use raynu_api::bracket::{BracketView, build_bracket};
use raynu_api::client::{FetchSource, PublicData};
use raynu_api::config::SiteConfig;
use raynu_api::standings::{Standings, standings_tables};
use raynu_api::{BRACKET_GROUPS, Caster, Match, PlayoffRound, Team};

// ---------------------------------------------------------------------------
// Public pages
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct PublicState {
    pub loaded: bool,
    pub source: Option<FetchSource>,
    pub teams: Vec<Team>,
    pub matches: Vec<Match>,
    pub casters: Vec<Caster>,
    pub standings: Option<Result<Standings, String>>,
    pub bracket: Option<Result<BracketView, String>>,
    pub casters_error: Option<String>,
    pub selected_team: usize,
    pub selected_caster: usize,
    /// Index into [`PlayoffRound::ALL`].
    pub selected_slot: usize,
}

impl PublicState {
    /// Store a fresh load and rebuild the derived views. Each view fails on
    /// its own: standings need teams, the bracket needs teams and matches.
    pub fn load(&mut self, data: PublicData, source: Option<FetchSource>, config: &SiteConfig) {
        self.loaded = true;
        self.source = source;

        let teams_error = data.teams.as_ref().err().map(|e| e.user_message());
        let matches_error = data.matches.as_ref().err().map(|e| e.user_message());
        if let Ok(teams) = data.teams {
            self.teams = teams;
        }
        if let Ok(matches) = data.matches {
            self.matches = matches;
        }
        match data.casters {
            Ok(casters) => {
                self.casters = casters;
                self.casters_error = None;
            }
            Err(e) => self.casters_error = Some(e.user_message()),
        }

        self.standings = Some(match &teams_error {
            Some(e) => Err(e.clone()),
            None => Ok(standings_tables(&self.teams, &BRACKET_GROUPS, config)),
        });
        self.bracket = Some(match teams_error.or(matches_error) {
            Some(e) => Err(e),
            None => Ok(build_bracket(&self.teams, &self.matches, config)),
        });

        self.selected_team = self.selected_team.min(self.teams.len().saturating_sub(1));
        self.selected_caster = self.selected_caster.min(self.casters.len().saturating_sub(1));
    }

    pub fn selected_round(&self) -> PlayoffRound {
        PlayoffRound::ALL[self.selected_slot % PlayoffRound::ALL.len()]
    }

    pub fn next_slot(&mut self) {
        self.selected_slot = (self.selected_slot + 1) % PlayoffRound::ALL.len();
    }

    pub fn prev_slot(&mut self) {
        let len = PlayoffRound::ALL.len();
        self.selected_slot = (self.selected_slot + len - 1) % len;
    }
}

// ---------------------------------------------------------------------------
// Session and login
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub claims: Claims,
}

#[derive(Debug, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// 0 = email, 1 = password.
    pub focus: usize,
}

impl LoginForm {
    pub fn input_char(&mut self, c: char) {
        self.focused_mut().push(c);
    }

    pub fn backspace(&mut self) {
        self.focused_mut().pop();
    }

    pub fn toggle_focus(&mut self) {
        self.focus = 1 - self.focus.min(1);
    }

    /// Credentials to send, or a reason not to send them.
    pub fn credentials(&self) -> Result<(String, String), String> {
        let email = self.email.trim();
        if email.is_empty() || self.password.is_empty() {
            return Err("Email and password are required.".into());
        }
        Ok((email.to_string(), self.password.clone()))
    }

    fn focused_mut(&mut self) -> &mut String {
        if self.focus == 0 { &mut self.email } else { &mut self.password }
    }
}

/// A modal message; any key dismisses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub is_error: bool,
}

// ---------------------------------------------------------------------------
// Root app state
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct AppState {
    pub active_tab: MenuItem,
    pub previous_tab: MenuItem,
    pub show_logs: bool,
    pub last_error: Option<String>,
    pub notice: Option<Notice>,
    pub public: PublicState,
    pub session: Option<Session>,
    pub login: LoginForm,
    pub admin: AdminState,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

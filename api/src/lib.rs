pub mod admin;
pub mod auth;
pub mod bracket;
pub mod client;
pub mod config;
pub mod standings;
pub mod wire;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::wire::{de_lenient_score, de_null_default, de_playoff_round, de_stringish};

// ---------------------------------------------------------------------------
// Domain types (server-owned read model)
// ---------------------------------------------------------------------------

/// Groups that feed the playoff bracket. Any other label is kept on the team
/// but never seeded.
pub const BRACKET_GROUPS: [&str; 2] = ["A", "B"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Team {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    #[serde(default, deserialize_with = "de_null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "de_null_default")]
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motto: Option<String>,
    #[serde(default, deserialize_with = "de_null_default")]
    pub members: Vec<Member>,
    #[serde(default, deserialize_with = "de_null_default")]
    pub stats: TeamStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

/// Aggregate group-stage stats. Missing or null counters read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStats {
    #[serde(default, deserialize_with = "de_null_default")]
    pub points: i32,
    #[serde(default, deserialize_with = "de_null_default")]
    pub games_won: i32,
    #[serde(default, deserialize_with = "de_null_default")]
    pub games_lost: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    #[serde(default)]
    pub role: MemberRole,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MemberRole {
    Coach,
    #[default]
    Player,
    StandIn,
    Other(String),
}

impl MemberRole {
    pub const SELECTABLE: [MemberRole; 3] =
        [MemberRole::Player, MemberRole::Coach, MemberRole::StandIn];

    pub fn label(&self) -> &str {
        match self {
            MemberRole::Coach => "coach",
            MemberRole::Player => "player",
            MemberRole::StandIn => "stand-in",
            MemberRole::Other(s) => s.as_str(),
        }
    }

    /// Roster position: coach, players, stand-ins, then anything else.
    pub fn roster_rank(&self) -> u8 {
        match self {
            MemberRole::Coach => 0,
            MemberRole::Player => 1,
            MemberRole::StandIn => 2,
            MemberRole::Other(_) => 3,
        }
    }
}

impl From<String> for MemberRole {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "coach" => MemberRole::Coach,
            "player" => MemberRole::Player,
            "stand-in" | "standin" | "suplente" => MemberRole::StandIn,
            _ => MemberRole::Other(s),
        }
    }
}

impl From<MemberRole> for String {
    fn from(role: MemberRole) -> Self {
        role.label().to_string()
    }
}

/// A reference to a team as it appears inside matches and sanctions: either
/// the bare id or the populated team document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TeamRef {
    Id(String),
    Embedded(Box<Team>),
}

impl TeamRef {
    pub fn id(&self) -> &str {
        match self {
            TeamRef::Id(id) => id,
            TeamRef::Embedded(team) => &team.id,
        }
    }

    /// Resolve against the canonical team list. An embedded document whose id
    /// is unknown is kept as-is; an unknown bare id resolves to nothing.
    pub fn resolve<'a>(&'a self, teams: &'a [Team]) -> Option<&'a Team> {
        let known = teams.iter().find(|t| t.id == self.id());
        match self {
            TeamRef::Id(_) => known,
            TeamRef::Embedded(team) => known.or(Some(team.as_ref())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    #[serde(default)]
    pub team1: Option<TeamRef>,
    #[serde(default)]
    pub team2: Option<TeamRef>,
    #[serde(default)]
    pub match_date: Option<String>,
    #[serde(default, deserialize_with = "de_null_default")]
    pub is_finished: bool,
    #[serde(default)]
    pub result: Option<MatchResult>,
    #[serde(default)]
    pub winner: Option<TeamRef>,
    #[serde(default, deserialize_with = "de_null_default")]
    pub is_playoff: bool,
    #[serde(default, deserialize_with = "de_playoff_round")]
    pub playoff_round: Option<PlayoffRound>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

impl Match {
    pub fn scheduled_at(&self) -> Option<DateTime<Utc>> {
        self.match_date
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Score pair, only once the match is finished.
    pub fn final_score(&self) -> Option<(u32, u32)> {
        if !self.is_finished {
            return None;
        }
        let result = self.result.as_ref()?;
        Some((
            result.score_team1.unwrap_or_default(),
            result.score_team2.unwrap_or_default(),
        ))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    #[serde(default, deserialize_with = "de_lenient_score")]
    pub score_team1: Option<u32>,
    #[serde(default, deserialize_with = "de_lenient_score")]
    pub score_team2: Option<u32>,
}

/// The fixed set of bracket slots. Ordered upper bracket → lower bracket →
/// grand final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PlayoffRound {
    #[serde(rename = "ub-sf-1")]
    UpperSemi1,
    #[serde(rename = "ub-sf-2")]
    UpperSemi2,
    #[serde(rename = "ub-final")]
    UpperFinal,
    #[serde(rename = "lb-r1-1")]
    LowerRound1Match1,
    #[serde(rename = "lb-r1-2")]
    LowerRound1Match2,
    #[serde(rename = "lb-qf-1")]
    LowerQuarter1,
    #[serde(rename = "lb-qf-2")]
    LowerQuarter2,
    #[serde(rename = "lb-sf-1")]
    LowerSemi,
    #[serde(rename = "lb-final")]
    LowerFinal,
    #[serde(rename = "grand-final")]
    GrandFinal,
}

impl PlayoffRound {
    pub const ALL: [PlayoffRound; 10] = [
        PlayoffRound::UpperSemi1,
        PlayoffRound::UpperSemi2,
        PlayoffRound::UpperFinal,
        PlayoffRound::LowerRound1Match1,
        PlayoffRound::LowerRound1Match2,
        PlayoffRound::LowerQuarter1,
        PlayoffRound::LowerQuarter2,
        PlayoffRound::LowerSemi,
        PlayoffRound::LowerFinal,
        PlayoffRound::GrandFinal,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PlayoffRound::UpperSemi1 => "ub-sf-1",
            PlayoffRound::UpperSemi2 => "ub-sf-2",
            PlayoffRound::UpperFinal => "ub-final",
            PlayoffRound::LowerRound1Match1 => "lb-r1-1",
            PlayoffRound::LowerRound1Match2 => "lb-r1-2",
            PlayoffRound::LowerQuarter1 => "lb-qf-1",
            PlayoffRound::LowerQuarter2 => "lb-qf-2",
            PlayoffRound::LowerSemi => "lb-sf-1",
            PlayoffRound::LowerFinal => "lb-final",
            PlayoffRound::GrandFinal => "grand-final",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.label() == label)
    }

    pub fn is_upper(&self) -> bool {
        matches!(
            self,
            PlayoffRound::UpperSemi1 | PlayoffRound::UpperSemi2 | PlayoffRound::UpperFinal
        )
    }
}

impl fmt::Display for PlayoffRound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Caster {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    #[serde(default, deserialize_with = "de_null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "de_null_default")]
    pub description: String,
    #[serde(default)]
    pub photo: Option<String>,
    /// Platform name (lower-case) → profile URL.
    #[serde(default, deserialize_with = "de_null_default")]
    pub socials: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    #[serde(other)]
    Other,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    #[serde(default, deserialize_with = "de_null_default")]
    pub email: String,
    #[serde(default, deserialize_with = "de_null_default")]
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sanction {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    #[serde(default)]
    pub team: Option<TeamRef>,
    #[serde(default, deserialize_with = "de_stringish")]
    pub reason: String,
    #[serde(default, deserialize_with = "de_stringish")]
    pub penalty: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    #[serde(default, deserialize_with = "de_stringish")]
    pub action: String,
    #[serde(default, deserialize_with = "de_stringish")]
    pub details: String,
    #[serde(default, deserialize_with = "de_stringish")]
    pub user: String,
    #[serde(default, deserialize_with = "de_null_default")]
    pub roles: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl AuditLog {
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

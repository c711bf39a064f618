//! Double-elimination bracket built from group standings and persisted
//! playoff matches.
//!
//! The slot template is fixed: the top two of groups A and B enter the upper
//! bracket, the third of each group starts in the lower bracket. A slot shows
//! the persisted match for its round when one exists; before that, the
//! seed-determined slots show the projected pairing.

use crate::client::ApiError;
use crate::config::{AssetKey, SiteConfig};
use crate::standings::{TieBreak, rank_group};
use crate::{Match, PlayoffRound, Team};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

pub const BRACKET_PENDING_MESSAGE: &str = "The bracket will be revealed once the group stage \
     ends and enough teams have qualified.";

const UPPER_SEMI_1_DATE: &str = "2025-08-10T16:00:00-05:00";
const UPPER_SEMI_2_DATE: &str = "2025-08-10T19:30:00-05:00";
const PLAYOFF_FORMAT: &str = "bo3";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Outcome {
    #[default]
    Undecided,
    Winner,
    Loser,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotSide {
    /// `None` is an undetermined side ("TBD").
    pub team: Option<Team>,
    pub logo: String,
    pub score: Option<u32>,
    pub outcome: Outcome,
}

impl SlotSide {
    fn for_team(team: Option<Team>, config: &SiteConfig) -> Self {
        let logo = team
            .as_ref()
            .map(|t| config.with_default(t.logo.as_deref(), AssetKey::TeamLogo))
            .unwrap_or_default();
        SlotSide { team, logo, score: None, outcome: Outcome::Undecided }
    }

    pub fn name(&self) -> &str {
        self.team.as_ref().map_or("TBD", |t| t.name.as_str())
    }

    pub fn points(&self) -> Option<i32> {
        self.team.as_ref().map(|t| t.stats.points)
    }

    fn id(&self) -> Option<&str> {
        self.team.as_ref().map(|t| t.id.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSource {
    /// A match stored on the server for this round.
    Persisted,
    /// Pairing projected from the group standings.
    Seeded,
    Undetermined,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BracketSlot {
    pub round: PlayoffRound,
    pub source: SlotSource,
    pub match_id: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub format: Option<String>,
    pub finished: bool,
    pub top: SlotSide,
    pub bottom: SlotSide,
}

impl BracketSlot {
    fn undetermined(round: PlayoffRound) -> Self {
        BracketSlot {
            round,
            source: SlotSource::Undetermined,
            match_id: None,
            scheduled_at: None,
            format: None,
            finished: false,
            top: SlotSide::default(),
            bottom: SlotSide::default(),
        }
    }

    fn seeded(round: PlayoffRound, top: Option<&Team>, bottom: Option<&Team>, config: &SiteConfig) -> Self {
        BracketSlot {
            source: SlotSource::Seeded,
            top: SlotSide::for_team(top.cloned(), config),
            bottom: SlotSide::for_team(bottom.cloned(), config),
            ..Self::undetermined(round)
        }
    }

    fn persisted(round: PlayoffRound, m: &Match, teams: &[Team], config: &SiteConfig) -> Self {
        let side = |r: &Option<crate::TeamRef>| {
            SlotSide::for_team(r.as_ref().and_then(|r| r.resolve(teams)).cloned(), config)
        };
        let mut top = side(&m.team1);
        let mut bottom = side(&m.team2);

        if let Some((s1, s2)) = m.final_score() {
            top.score = Some(s1);
            bottom.score = Some(s2);
        }

        let winner = m
            .winner
            .as_ref()
            .and_then(|w| w.resolve(teams))
            .map(|t| t.id.as_str());
        if m.is_finished
            && let Some(winner) = winner
        {
            if top.id() == Some(winner) {
                top.outcome = Outcome::Winner;
                bottom.outcome = Outcome::Loser;
            } else if bottom.id() == Some(winner) {
                top.outcome = Outcome::Loser;
                bottom.outcome = Outcome::Winner;
            }
        }

        BracketSlot {
            round,
            source: SlotSource::Persisted,
            match_id: Some(m.id.clone()),
            scheduled_at: m.scheduled_at(),
            format: m.format.clone(),
            finished: m.is_finished,
            top,
            bottom,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BracketRound {
    pub title: &'static str,
    pub slots: Vec<BracketSlot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bracket {
    pub upper: Vec<BracketRound>,
    pub lower: Vec<BracketRound>,
    pub grand_final: BracketSlot,
}

impl Bracket {
    pub fn slot(&self, round: PlayoffRound) -> Option<&BracketSlot> {
        self.upper
            .iter()
            .chain(self.lower.iter())
            .flat_map(|r| r.slots.iter())
            .chain(std::iter::once(&self.grand_final))
            .find(|s| s.round == round)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BracketView {
    /// Not enough qualified teams; show the message instead of any slot.
    Pending { message: String },
    Ready(Bracket),
}

/// Lay out the full bracket, or explain why it cannot be shown yet.
pub fn build_bracket(teams: &[Team], matches: &[Match], config: &SiteConfig) -> BracketView {
    let group_a = rank_group(teams, "A", TieBreak::PointsWins);
    let group_b = rank_group(teams, "B", TieBreak::PointsWins);

    let (Some(a1), Some(a2), Some(b1), Some(b2)) = (
        group_a.first().copied(),
        group_a.get(1).copied(),
        group_b.first().copied(),
        group_b.get(1).copied(),
    ) else {
        return pending();
    };
    let (Some(a3), Some(b3)) = (group_a.get(2).copied(), group_b.get(2).copied()) else {
        return pending();
    };

    let mut persisted: HashMap<PlayoffRound, &Match> = HashMap::new();
    for m in matches.iter().filter(|m| m.is_playoff) {
        if let Some(round) = m.playoff_round {
            persisted.insert(round, m);
        }
    }

    let slot = |round: PlayoffRound| -> BracketSlot {
        if let Some(m) = persisted.get(&round) {
            return BracketSlot::persisted(round, m, teams, config);
        }
        match round {
            PlayoffRound::UpperSemi1 => BracketSlot::seeded(round, Some(a1), Some(b2), config),
            PlayoffRound::UpperSemi2 => BracketSlot::seeded(round, Some(b1), Some(a2), config),
            PlayoffRound::LowerRound1Match1 => BracketSlot::seeded(round, Some(a3), None, config),
            PlayoffRound::LowerRound1Match2 => BracketSlot::seeded(round, Some(b3), None, config),
            _ => BracketSlot::undetermined(round),
        }
    };

    let round = |title: &'static str, rounds: &[PlayoffRound]| BracketRound {
        title,
        slots: rounds.iter().map(|r| slot(*r)).collect(),
    };

    use PlayoffRound::*;
    let bracket = Bracket {
        upper: vec![
            round("Upper Bracket - Semifinal", &[UpperSemi1, UpperSemi2]),
            round("Upper Bracket - Final", &[UpperFinal]),
        ],
        lower: vec![
            round("Lower Bracket - Round 1", &[LowerRound1Match1, LowerRound1Match2]),
            round("Lower Bracket - Quarterfinal", &[LowerQuarter1, LowerQuarter2]),
            round("Lower Bracket - Semifinal", &[LowerSemi]),
            round("Lower Bracket - Final", &[LowerFinal]),
        ],
        grand_final: slot(GrandFinal),
    };
    BracketView::Ready(bracket)
}

fn pending() -> BracketView {
    BracketView::Pending { message: BRACKET_PENDING_MESSAGE.into() }
}

/// Body of a playoff match to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedMatch {
    pub team1: String,
    pub team2: String,
    pub match_date: String,
    pub is_playoff: bool,
    pub playoff_round: PlayoffRound,
    pub format: String,
}

/// Upper-bracket semifinals derived from the current standings.
pub fn plan_playoff_matches(teams: &[Team]) -> Result<Vec<PlannedMatch>, ApiError> {
    let group_a = rank_group(teams, "A", TieBreak::PointsWins);
    let group_b = rank_group(teams, "B", TieBreak::PointsWins);

    let (Some(a1), Some(a2), Some(b1), Some(b2)) = (
        group_a.first().copied(),
        group_a.get(1).copied(),
        group_b.first().copied(),
        group_b.get(1).copied(),
    ) else {
        return Err(ApiError::Validation(
            "Not every group has qualified teams. Make sure the group stage matches are finished."
                .into(),
        ));
    };

    let planned = |round, team1: &Team, team2: &Team, date: &str| PlannedMatch {
        team1: team1.id.clone(),
        team2: team2.id.clone(),
        match_date: date.into(),
        is_playoff: true,
        playoff_round: round,
        format: PLAYOFF_FORMAT.into(),
    };

    Ok(vec![
        planned(PlayoffRound::UpperSemi1, a1, b2, UPPER_SEMI_1_DATE),
        planned(PlayoffRound::UpperSemi2, b1, a2, UPPER_SEMI_2_DATE),
    ])
}

/// True when exactly one group-stage match is still open.
pub fn needs_playoff_prompt(matches: &[Match]) -> bool {
    matches.iter().filter(|m| !m.is_finished && !m.is_playoff).count() == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MatchResult, TeamRef, TeamStats};

    fn team(id: &str, group: &str, points: i32) -> Team {
        Team {
            id: id.into(),
            name: id.to_uppercase(),
            group: group.into(),
            stats: TeamStats { points, ..Default::default() },
            ..Default::default()
        }
    }

    fn six_teams() -> Vec<Team> {
        vec![
            team("a3", "A", 6),
            team("a1", "A", 10),
            team("b2", "B", 7),
            team("a2", "A", 8),
            team("b1", "B", 9),
            team("b3", "B", 5),
        ]
    }

    fn ready(view: BracketView) -> Bracket {
        match view {
            BracketView::Ready(b) => b,
            BracketView::Pending { message } => panic!("bracket pending: {message}"),
        }
    }

    fn side_id(side: &SlotSide) -> Option<&str> {
        side.team.as_ref().map(|t| t.id.as_str())
    }

    #[test]
    fn too_few_teams_yields_only_the_message() {
        let teams = vec![team("a1", "A", 3), team("a2", "A", 2), team("a3", "A", 1), team("b1", "B", 3)];
        assert_eq!(
            build_bracket(&teams, &[], &SiteConfig::default()),
            BracketView::Pending { message: BRACKET_PENDING_MESSAGE.into() }
        );
    }

    #[test]
    fn missing_lower_entrant_also_blocks() {
        let teams = vec![
            team("a1", "A", 3),
            team("a2", "A", 2),
            team("a3", "A", 1),
            team("b1", "B", 3),
            team("b2", "B", 2),
        ];
        assert!(matches!(build_bracket(&teams, &[], &SiteConfig::default()), BracketView::Pending { .. }));
    }

    #[test]
    fn seeds_cross_groups_in_upper_semis() {
        let bracket = ready(build_bracket(&six_teams(), &[], &SiteConfig::default()));

        let sf1 = bracket.slot(PlayoffRound::UpperSemi1).unwrap();
        assert_eq!(sf1.source, SlotSource::Seeded);
        assert_eq!((side_id(&sf1.top), side_id(&sf1.bottom)), (Some("a1"), Some("b2")));

        let sf2 = bracket.slot(PlayoffRound::UpperSemi2).unwrap();
        assert_eq!((side_id(&sf2.top), side_id(&sf2.bottom)), (Some("b1"), Some("a2")));

        let lb1 = bracket.slot(PlayoffRound::LowerRound1Match1).unwrap();
        assert_eq!((side_id(&lb1.top), side_id(&lb1.bottom)), (Some("a3"), None));
        let lb2 = bracket.slot(PlayoffRound::LowerRound1Match2).unwrap();
        assert_eq!((side_id(&lb2.top), side_id(&lb2.bottom)), (Some("b3"), None));

        let gf = bracket.slot(PlayoffRound::GrandFinal).unwrap();
        assert_eq!(gf.source, SlotSource::Undetermined);
        assert_eq!(gf.top.name(), "TBD");
    }

    #[test]
    fn layout_covers_every_round_once() {
        let bracket = ready(build_bracket(&six_teams(), &[], &SiteConfig::default()));
        for round in PlayoffRound::ALL {
            assert!(bracket.slot(round).is_some(), "missing {round}");
        }
        let total: usize = bracket.upper.iter().chain(&bracket.lower).map(|r| r.slots.len()).sum();
        assert_eq!(total + 1, PlayoffRound::ALL.len());
    }

    #[test]
    fn persisted_match_wins_over_seeding_and_marks_outcome() {
        let m = Match {
            id: "m1".into(),
            team1: Some(TeamRef::Id("a1".into())),
            team2: Some(TeamRef::Id("b2".into())),
            is_finished: true,
            result: Some(MatchResult { score_team1: Some(2), score_team2: Some(1) }),
            winner: Some(TeamRef::Id("a1".into())),
            is_playoff: true,
            playoff_round: Some(PlayoffRound::UpperSemi1),
            ..Default::default()
        };
        let bracket = ready(build_bracket(&six_teams(), &[m], &SiteConfig::default()));
        let sf1 = bracket.slot(PlayoffRound::UpperSemi1).unwrap();
        assert_eq!(sf1.source, SlotSource::Persisted);
        assert_eq!(sf1.top.outcome, Outcome::Winner);
        assert_eq!(sf1.bottom.outcome, Outcome::Loser);
        assert_eq!((sf1.top.score, sf1.bottom.score), (Some(2), Some(1)));
    }

    #[test]
    fn winner_matching_neither_side_marks_nothing() {
        let m = Match {
            id: "m1".into(),
            team1: Some(TeamRef::Id("a1".into())),
            team2: Some(TeamRef::Id("b2".into())),
            is_finished: true,
            winner: Some(TeamRef::Id("b1".into())),
            is_playoff: true,
            playoff_round: Some(PlayoffRound::UpperSemi1),
            ..Default::default()
        };
        let bracket = ready(build_bracket(&six_teams(), &[m], &SiteConfig::default()));
        let sf1 = bracket.slot(PlayoffRound::UpperSemi1).unwrap();
        assert_eq!(sf1.top.outcome, Outcome::Undecided);
        assert_eq!(sf1.bottom.outcome, Outcome::Undecided);
    }

    #[test]
    fn unfinished_match_hides_scores() {
        let m = Match {
            id: "m2".into(),
            team1: Some(TeamRef::Id("a2".into())),
            team2: Some(TeamRef::Id("b1".into())),
            result: Some(MatchResult { score_team1: Some(1), score_team2: Some(0) }),
            winner: Some(TeamRef::Id("a2".into())),
            is_playoff: true,
            playoff_round: Some(PlayoffRound::UpperFinal),
            ..Default::default()
        };
        let bracket = ready(build_bracket(&six_teams(), &[m], &SiteConfig::default()));
        let fin = bracket.slot(PlayoffRound::UpperFinal).unwrap();
        assert_eq!(fin.top.score, None);
        assert_eq!(fin.top.outcome, Outcome::Undecided);
    }

    #[test]
    fn non_playoff_and_duplicate_rounds() {
        let group_stage = Match {
            id: "g".into(),
            playoff_round: Some(PlayoffRound::GrandFinal),
            ..Default::default()
        };
        let first = Match {
            id: "first".into(),
            is_playoff: true,
            playoff_round: Some(PlayoffRound::LowerFinal),
            ..Default::default()
        };
        let second = Match { id: "second".into(), ..first.clone() };
        let bracket =
            ready(build_bracket(&six_teams(), &[group_stage, first, second], &SiteConfig::default()));
        assert_eq!(bracket.grand_final.source, SlotSource::Undetermined);
        assert_eq!(
            bracket.slot(PlayoffRound::LowerFinal).unwrap().match_id.as_deref(),
            Some("second")
        );
    }

    #[test]
    fn embedded_and_unknown_team_refs() {
        let stale = Team { id: "a1".into(), name: "Old Name".into(), ..Default::default() };
        let m = Match {
            id: "m".into(),
            team1: Some(TeamRef::Embedded(Box::new(stale))),
            team2: Some(TeamRef::Id("ghost".into())),
            is_playoff: true,
            playoff_round: Some(PlayoffRound::LowerQuarter1),
            ..Default::default()
        };
        let bracket = ready(build_bracket(&six_teams(), &[m], &SiteConfig::default()));
        let qf = bracket.slot(PlayoffRound::LowerQuarter1).unwrap();
        assert_eq!(qf.top.name(), "A1");
        assert_eq!(qf.top.points(), Some(10));
        assert!(qf.bottom.team.is_none());
    }

    #[test]
    fn plan_pairs_group_leaders_with_runners_up() {
        let plan = plan_playoff_matches(&six_teams()).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!((plan[0].team1.as_str(), plan[0].team2.as_str()), ("a1", "b2"));
        assert_eq!(plan[0].playoff_round, PlayoffRound::UpperSemi1);
        assert_eq!(plan[0].match_date, UPPER_SEMI_1_DATE);
        assert_eq!((plan[1].team1.as_str(), plan[1].team2.as_str()), ("b1", "a2"));
        assert_eq!(plan[1].match_date, UPPER_SEMI_2_DATE);
        assert!(plan.iter().all(|p| p.is_playoff && p.format == "bo3"));

        let body = serde_json::to_value(&plan[1]).unwrap();
        assert_eq!(body["playoffRound"], "ub-sf-2");
        assert_eq!(body["isPlayoff"], true);
    }

    #[test]
    fn plan_requires_two_per_group() {
        let teams = vec![team("a1", "A", 3), team("a2", "A", 2), team("b1", "B", 3)];
        assert!(matches!(plan_playoff_matches(&teams), Err(ApiError::Validation(_))));
    }

    #[test]
    fn prompt_only_for_last_open_group_match() {
        let open = Match::default();
        let done = Match { is_finished: true, ..Default::default() };
        let playoff = Match { is_playoff: true, ..Default::default() };
        assert!(needs_playoff_prompt(&[open.clone(), done.clone(), playoff.clone()]));
        assert!(!needs_playoff_prompt(&[open.clone(), open, playoff]));
        assert!(!needs_playoff_prompt(&[done]));
    }
}

use crate::Team;
use crate::config::{AssetKey, SiteConfig};
use std::cmp::Ordering;

/// Ordering applied after points. The public table and the bracket seeding
/// historically disagree on whether losses break ties, so both are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Points desc, then games won desc.
    PointsWins,
    /// Points desc, games won desc, then games lost asc.
    #[default]
    PointsWinsLosses,
}

impl TieBreak {
    fn compare(&self, a: &Team, b: &Team) -> Ordering {
        let by_points_wins = b
            .stats
            .points
            .cmp(&a.stats.points)
            .then_with(|| b.stats.games_won.cmp(&a.stats.games_won));
        match self {
            TieBreak::PointsWins => by_points_wins,
            TieBreak::PointsWinsLosses => {
                by_points_wins.then_with(|| a.stats.games_lost.cmp(&b.stats.games_lost))
            }
        }
    }
}

/// Teams of `group`, best first. Equal teams keep their input order.
pub fn rank_group<'a>(teams: &'a [Team], group: &str, tiebreak: TieBreak) -> Vec<&'a Team> {
    let mut ranked: Vec<&Team> = teams.iter().filter(|t| t.group == group).collect();
    ranked.sort_by(|a, b| tiebreak.compare(a, b));
    ranked
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandingsRow {
    pub position: usize,
    pub team_id: String,
    pub name: String,
    pub logo: String,
    pub wins: i32,
    pub losses: i32,
    pub points: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupTable {
    Rows(Vec<StandingsRow>),
    /// The group exists in the tournament but has no teams yet.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Standings {
    /// No teams have been published at all.
    Unrevealed,
    Groups(Vec<(String, GroupTable)>),
}

/// Tables for each of `groups`, ranked for public display.
pub fn standings_tables(teams: &[Team], groups: &[&str], config: &SiteConfig) -> Standings {
    if teams.is_empty() {
        return Standings::Unrevealed;
    }
    let tables = groups
        .iter()
        .map(|group| {
            let ranked = rank_group(teams, group, TieBreak::PointsWinsLosses);
            let table = if ranked.is_empty() {
                GroupTable::Empty
            } else {
                GroupTable::Rows(
                    ranked
                        .into_iter()
                        .enumerate()
                        .map(|(i, t)| StandingsRow {
                            position: i + 1,
                            team_id: t.id.clone(),
                            name: t.name.clone(),
                            logo: config.with_default(t.logo.as_deref(), AssetKey::TeamLogo),
                            wins: t.stats.games_won,
                            losses: t.stats.games_lost,
                            points: t.stats.points,
                        })
                        .collect(),
                )
            };
            (group.to_string(), table)
        })
        .collect();
    Standings::Groups(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TeamStats;

    fn team(id: &str, group: &str, points: i32, won: i32, lost: i32) -> Team {
        Team {
            id: id.into(),
            name: id.to_uppercase(),
            group: group.into(),
            stats: TeamStats { points, games_won: won, games_lost: lost },
            ..Default::default()
        }
    }

    fn ids(ranked: &[&Team]) -> Vec<String> {
        ranked.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn orders_by_points_descending() {
        let teams = vec![team("a", "A", 3, 1, 0), team("b", "A", 9, 3, 0), team("c", "A", 6, 2, 0)];
        assert_eq!(ids(&rank_group(&teams, "A", TieBreak::PointsWins)), ["b", "c", "a"]);
    }

    #[test]
    fn wins_break_point_ties() {
        let teams = vec![team("a", "A", 6, 1, 0), team("b", "A", 6, 2, 0)];
        assert_eq!(ids(&rank_group(&teams, "A", TieBreak::PointsWins)), ["b", "a"]);
    }

    #[test]
    fn losses_break_ties_only_in_table_order() {
        let teams = vec![team("a", "A", 6, 2, 3), team("b", "A", 6, 2, 1)];
        assert_eq!(ids(&rank_group(&teams, "A", TieBreak::PointsWinsLosses)), ["b", "a"]);
        assert_eq!(ids(&rank_group(&teams, "A", TieBreak::PointsWins)), ["a", "b"]);
    }

    #[test]
    fn full_ties_keep_input_order() {
        let teams = vec![team("x", "B", 4, 1, 1), team("y", "B", 4, 1, 1), team("z", "B", 4, 1, 1)];
        assert_eq!(ids(&rank_group(&teams, "B", TieBreak::PointsWinsLosses)), ["x", "y", "z"]);
    }

    #[test]
    fn filters_to_group_and_handles_empty() {
        let teams = vec![team("a", "A", 1, 0, 0), team("b", "B", 2, 0, 0), team("c", "C", 3, 0, 0)];
        assert_eq!(ids(&rank_group(&teams, "B", TieBreak::PointsWins)), ["b"]);
        assert!(rank_group(&teams, "D", TieBreak::PointsWins).is_empty());
        assert!(rank_group(&[], "A", TieBreak::PointsWins).is_empty());
    }

    #[test]
    fn tables_report_placeholders() {
        let cfg = SiteConfig::default();
        assert_eq!(standings_tables(&[], &["A", "B"], &cfg), Standings::Unrevealed);

        let teams = vec![team("a", "A", 3, 1, 0)];
        let Standings::Groups(groups) = standings_tables(&teams, &["A", "B"], &cfg) else {
            panic!("expected group tables");
        };
        let GroupTable::Rows(rows) = &groups[0].1 else {
            panic!("group A should have rows");
        };
        assert_eq!(rows[0].position, 1);
        assert_eq!(rows[0].logo, cfg.default_assets.team_logo);
        assert_eq!(groups[1], ("B".to_string(), GroupTable::Empty));
    }
}

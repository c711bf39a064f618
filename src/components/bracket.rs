use chrono::Local;
use raynu_api::PlayoffRound;
use raynu_api::bracket::{Bracket, BracketSlot, Outcome, SlotSide, SlotSource};
use tui::buffer::Buffer;
use tui::layout::Rect;
use tui::style::{Modifier, Style};
use tui::widgets::Widget;

use crate::components::theme::{Theme, ThemeColor, resolve};

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

/// Rows per game cell: top-team line, status line, bottom-team line.
pub const GAME_HEIGHT: u16 = 3;

/// Width of the connector zone drawn between adjacent columns.
pub const CONNECTOR_WIDTH: u16 = 3;

/// Total rows used by the bracket grid.
pub const BRACKET_HEIGHT: u16 = 17;

/// Columns: upper/lower round 1 | lower quarterfinal | lower semifinal |
/// both finals | grand final.
const COLUMNS: u16 = 5;

const CELL_W_FULL: u16 = 24;

/// Below this the grid is replaced by a stacked list.
const CELL_W_MIN: u16 = 14;

const UPPER_TITLE_ROW: u16 = 0;
const LOWER_TITLE_ROW: u16 = 9;

/// Where each slot sits: `(round, column, center row)`. The center row holds
/// the status line; the team lines sit directly above and below it.
const PLACEMENTS: [(PlayoffRound, u16, u16); 10] = [
    (PlayoffRound::UpperSemi1, 0, 2),
    (PlayoffRound::UpperSemi2, 0, 6),
    (PlayoffRound::UpperFinal, 3, 4),
    (PlayoffRound::LowerRound1Match1, 0, 11),
    (PlayoffRound::LowerRound1Match2, 0, 15),
    (PlayoffRound::LowerQuarter1, 1, 11),
    (PlayoffRound::LowerQuarter2, 1, 15),
    (PlayoffRound::LowerSemi, 2, 13),
    (PlayoffRound::LowerFinal, 3, 13),
    (PlayoffRound::GrandFinal, 4, 8),
];

// ---------------------------------------------------------------------------
// BracketGrid: column geometry for one terminal width
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BracketGrid {
    pub cell_width: u16,
}

impl BracketGrid {
    /// `None` when the width cannot fit five readable columns.
    pub fn compute(width: u16) -> Option<Self> {
        let per_col = width.saturating_sub(CONNECTOR_WIDTH * (COLUMNS - 1)) / COLUMNS;
        let cell_width = per_col.min(CELL_W_FULL);
        (cell_width >= CELL_W_MIN).then_some(Self { cell_width })
    }

    pub fn col_x(&self, col: u16) -> u16 {
        col * (self.cell_width + CONNECTOR_WIDTH)
    }

    /// First column of the connector zone to the right of `col`.
    fn conn_x(&self, col: u16) -> u16 {
        self.col_x(col) + self.cell_width
    }
}

// ---------------------------------------------------------------------------
// BracketWidget
// ---------------------------------------------------------------------------

/// Double-elimination bracket:
///
/// ```text
///  Upper Semifinal                         Upper Final
///  A1 ──┐
///       ├──────────────────────────────── UB final ──┐
///  B1 ──┘                                            │
///                                                    ├── Grand Final
///  Lower Round 1   Lower Quarterfinal ...            │
///  r1-1 ───────── qf-1 ──┐                           │
///                        ├── lb-sf ───── LB final ───┘
///  r1-2 ───────── qf-2 ──┘
/// ```
pub struct BracketWidget<'a> {
    pub bracket: &'a Bracket,
    pub selected: PlayoffRound,
    pub theme: Theme,
}

impl Widget for BracketWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(grid) = BracketGrid::compute(area.width) else {
            render_stacked(&self, area, buf);
            return;
        };
        let accent = resolve(ThemeColor::Accent, self.theme);

        for round in self.bracket.upper.iter().chain(self.bracket.lower.iter()) {
            let Some(first) = round.slots.first() else {
                continue;
            };
            let Some(&(_, col, _)) = PLACEMENTS.iter().find(|(r, _, _)| *r == first.round) else {
                continue;
            };
            let row = if first.round.is_upper() { UPPER_TITLE_ROW } else { LOWER_TITLE_ROW };
            put_str(buf, area, grid.col_x(col), row, &short_title(round.title), grid.cell_width, accent);
        }
        put_str(buf, area, grid.col_x(4), 6, "Grand Final", grid.cell_width, accent);

        for (round, col, center) in PLACEMENTS {
            if let Some(slot) = self.bracket.slot(round) {
                draw_game_cell(slot, grid.col_x(col), center, grid.cell_width, round == self.selected, self.theme, area, buf);
            }
        }

        let conn = |x: u16, top: u16, mid: u16, bot: u16, buf: &mut Buffer| {
            draw_connector(top, mid, bot, x, area, self.theme, buf)
        };
        // upper semis into the upper final
        conn(grid.conn_x(0), 2, 4, 6, buf);
        draw_hline(grid.conn_x(0) + CONNECTOR_WIDTH, grid.col_x(3), 4, area, self.theme, buf);
        // lower round 1 into the quarterfinals
        draw_hline(grid.conn_x(0), grid.col_x(1), 11, area, self.theme, buf);
        draw_hline(grid.conn_x(0), grid.col_x(1), 15, area, self.theme, buf);
        conn(grid.conn_x(1), 11, 13, 15, buf);
        draw_hline(grid.conn_x(2), grid.col_x(3), 13, area, self.theme, buf);
        // both finals into the grand final
        conn(grid.conn_x(3), 4, 8, 13, buf);
    }
}

fn short_title(title: &str) -> String {
    let (branch, round) = title.split_once(" - ").unwrap_or(("", title));
    match branch.split_whitespace().next() {
        Some(branch) => format!("{branch} {round}"),
        None => round.to_string(),
    }
}

/// Narrow terminals: every round stacked top to bottom.
fn render_stacked(view: &BracketWidget, area: Rect, buf: &mut Buffer) {
    let accent = resolve(ThemeColor::Accent, view.theme);
    let width = area.width.saturating_sub(1);
    let bottom = area.y + area.height;

    let rounds = view
        .bracket
        .upper
        .iter()
        .chain(view.bracket.lower.iter())
        .map(|r| (r.title, r.slots.iter().collect::<Vec<_>>()))
        .chain(std::iter::once(("Grand Final", vec![&view.bracket.grand_final])));

    let mut y = area.y;
    for (title, slots) in rounds {
        if y >= bottom {
            break;
        }
        buf.set_stringn(area.x, y, title, width as usize, accent);
        y += 1;
        for slot in slots {
            if y + GAME_HEIGHT > bottom {
                return;
            }
            draw_game_cell(slot, 0, y - area.y + 1, width, slot.round == view.selected, view.theme, area, buf);
            y += GAME_HEIGHT;
        }
    }
}

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn draw_game_cell(
    slot: &BracketSlot,
    col_x: u16,
    center_row: u16,
    width: u16,
    selected: bool,
    theme: Theme,
    area: Rect,
    buf: &mut Buffer,
) {
    let base = resolve(ThemeColor::Secondary, theme);
    let status_style = if selected {
        resolve(ThemeColor::Selected, theme)
    } else {
        resolve(ThemeColor::Dim, theme)
    };
    let side_style = |side: &SlotSide| match side.outcome {
        Outcome::Winner => resolve(ThemeColor::Winner, theme),
        Outcome::Loser => resolve(ThemeColor::Loser, theme),
        Outcome::Undecided if selected => base.add_modifier(Modifier::BOLD),
        Outcome::Undecided => base,
    };

    let w = width as usize;
    let rows = [
        (center_row.saturating_sub(1), format_side_line(&slot.top, slot.finished, w), side_style(&slot.top)),
        (center_row, format_status_line(slot, w), status_style),
        (center_row + 1, format_side_line(&slot.bottom, slot.finished, w), side_style(&slot.bottom)),
    ];
    for (row, text, style) in rows {
        put_str(buf, area, col_x, row, &text, width, style);
    }
}

/// `"name           12p  2"`: name, group points, and the score once the
/// match is finished.
pub fn format_side_line(side: &SlotSide, finished: bool, width: usize) -> String {
    let points = side.points().map(|p| format!("{p}p")).unwrap_or_default();
    let score = side
        .score
        .filter(|_| finished)
        .map(|s| s.to_string())
        .unwrap_or_default();
    let name_w = width.saturating_sub(8);
    let name: String = side.name().chars().take(name_w).collect();
    let line = format!("{name:<name_w$} {points:>4} {score:>2}");
    line.chars().take(width).collect()
}

pub fn format_status_line(slot: &BracketSlot, width: usize) -> String {
    let mut raw = match slot.source {
        SlotSource::Undetermined => " TBD".to_string(),
        SlotSource::Seeded => " Seeded".to_string(),
        SlotSource::Persisted if slot.finished => " FINAL".to_string(),
        SlotSource::Persisted => slot
            .scheduled_at
            .map(|t| format!(" {}", t.with_timezone(&Local).format("%b %d %H:%M")))
            .unwrap_or_else(|| " Scheduled".to_string()),
    };
    if let Some(format) = slot.format.as_deref().filter(|f| !f.is_empty()) {
        raw.push(' ');
        raw.push_str(&format.to_uppercase());
    }
    let padded = format!("{raw:<width$}");
    padded.chars().take(width).collect()
}

// ---------------------------------------------------------------------------
// Drawing primitives
// ---------------------------------------------------------------------------

/// Grid row → absolute screen row, `None` when clipped.
fn screen_y(row: u16, area: Rect) -> Option<u16> {
    (row < area.height).then(|| area.y + row)
}

fn put_str(buf: &mut Buffer, area: Rect, col_x: u16, row: u16, text: &str, width: u16, style: Style) {
    let Some(y) = screen_y(row, area) else {
        return;
    };
    let avail = area.width.saturating_sub(col_x).min(width) as usize;
    if avail > 0 {
        buf.set_stringn(area.x + col_x, y, text, avail, style);
    }
}

/// Horizontal line on `row` from grid column `from` up to (not including) `to`.
fn draw_hline(from: u16, to: u16, row: u16, area: Rect, theme: Theme, buf: &mut Buffer) {
    let style = resolve(ThemeColor::Dim, theme);
    let Some(y) = screen_y(row, area) else {
        return;
    };
    for x in from..to.min(area.width) {
        put_char(buf, area.x + x, y, '─', style);
    }
}

/// Box-drawing connector between two children (left) and their parent (right).
///
/// ```text
///  child_top  ──┐
///               │
///  parent     ──├──
///               │
///  child_bot  ──┘
/// ```
fn draw_connector(r_top: u16, r_mid: u16, r_bot: u16, conn_x: u16, area: Rect, theme: Theme, buf: &mut Buffer) {
    let style = resolve(ThemeColor::Dim, theme);
    let (col_a, col_b, col_c) = (conn_x, conn_x + 1, conn_x + 2);

    let mut put = |x: u16, row: u16, ch: char| {
        if x < area.width
            && let Some(y) = screen_y(row, area)
        {
            put_char(buf, area.x + x, y, ch, style);
        }
    };

    put(col_a, r_top, '─');
    put(col_b, r_top, '┐');
    for row in (r_top + 1)..r_mid {
        put(col_b, row, '│');
    }
    put(col_a, r_mid, '─');
    put(col_b, r_mid, '├');
    put(col_c, r_mid, '─');
    for row in (r_mid + 1)..r_bot {
        put(col_b, row, '│');
    }
    put(col_a, r_bot, '─');
    put(col_b, r_bot, '┘');
}

fn put_char(buf: &mut Buffer, x: u16, y: u16, ch: char, style: Style) {
    if let Some(cell) = buf.cell_mut((x, y)) {
        cell.set_char(ch);
        cell.set_style(style);
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use raynu_api::bracket::{BracketView, build_bracket};
    use raynu_api::config::SiteConfig;
    use raynu_api::{Team, TeamStats};

    fn team(id: &str, group: &str, points: i32) -> Team {
        Team {
            id: id.into(),
            name: format!("Team {}", id.to_uppercase()),
            group: group.into(),
            stats: TeamStats { points, ..Default::default() },
            ..Default::default()
        }
    }

    fn bracket() -> Bracket {
        let teams = vec![
            team("a1", "A", 10),
            team("a2", "A", 8),
            team("a3", "A", 6),
            team("b1", "B", 9),
            team("b2", "B", 7),
            team("b3", "B", 5),
        ];
        match build_bracket(&teams, &[], &SiteConfig::default()) {
            BracketView::Ready(b) => b,
            BracketView::Pending { message } => panic!("bracket pending: {message}"),
        }
    }

    fn rendered(width: u16, height: u16) -> Vec<String> {
        let bracket = bracket();
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        BracketWidget { bracket: &bracket, selected: PlayoffRound::UpperSemi1, theme: Theme::Dark }
            .render(area, &mut buf);
        (0..height)
            .map(|y| (0..width).map(|x| buf[(x, y)].symbol()).collect::<String>())
            .collect()
    }

    #[test]
    fn grid_needs_room_for_five_columns() {
        assert_eq!(BracketGrid::compute(200).map(|g| g.cell_width), Some(CELL_W_FULL));
        assert!(BracketGrid::compute(60).is_none());
        let grid = BracketGrid::compute(100).expect("fits");
        assert_eq!(grid.col_x(1), grid.cell_width + CONNECTOR_WIDTH);
    }

    #[test]
    fn placements_fit_in_grid() {
        for (_, col, center) in PLACEMENTS {
            assert!(col < COLUMNS);
            assert!(center + 1 < BRACKET_HEIGHT);
        }
    }

    #[test]
    fn seeds_are_drawn_in_first_column() {
        let lines = rendered(140, BRACKET_HEIGHT);
        assert!(lines[1].starts_with("Team A1"));
        assert!(lines[3].starts_with("Team B2"));
        assert!(lines[5].starts_with("Team B1"));
        assert!(lines[7].starts_with("Team A2"));
        assert!(lines[10].starts_with("Team A3"));
        assert!(lines[12].starts_with("TBD"));
    }

    #[test]
    fn connectors_join_upper_semis() {
        let lines = rendered(140, BRACKET_HEIGHT);
        let x = BracketGrid::compute(140).expect("fits").conn_x(0) as usize + 1;
        let at = |row: usize| lines[row].chars().nth(x);
        assert_eq!(at(2), Some('┐'));
        assert_eq!(at(4), Some('├'));
        assert_eq!(at(6), Some('┘'));
    }

    #[test]
    fn narrow_terminal_stacks_rounds() {
        let lines = rendered(40, 60);
        assert!(lines[0].starts_with("Upper Bracket - Semifinal"));
        assert!(lines.iter().any(|l| l.starts_with("Grand Final")));
    }

    #[test]
    fn side_line_shows_score_only_when_finished() {
        let side = SlotSide { team: Some(team("a1", "A", 10)), score: Some(2), ..Default::default() };
        let open = format_side_line(&side, false, 24);
        let done = format_side_line(&side, true, 24);
        assert_eq!(open.chars().count(), 24);
        assert!(open.contains("10p") && !open.trim_end().ends_with('2'));
        assert!(done.trim_end().ends_with('2'));
    }
}

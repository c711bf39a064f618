use raynu_api::standings::{GroupTable, Standings, StandingsRow};
use tui::buffer::Buffer;
use tui::layout::{Constraint, Rect};
use tui::text::Line;
use tui::widgets::{Block, Borders, Paragraph, Row, Table, Widget};

use crate::components::theme::{Theme, ThemeColor, resolve};

pub const UNREVEALED_MESSAGE: &str = "Teams will be revealed soon.";
pub const EMPTY_GROUP_MESSAGE: &str = "No teams in this group yet.";

/// Width at which the resolved logo reference gets its own column.
const LOGO_COLUMN_MIN_WIDTH: u16 = 90;

/// One group's ranked table.
pub struct StandingsTable<'a> {
    pub group: &'a str,
    pub table: &'a GroupTable,
    pub theme: Theme,
}

impl Widget for StandingsTable<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = resolve(ThemeColor::Accent, self.theme);
        let block = Block::default()
            .borders(Borders::TOP)
            .border_style(resolve(ThemeColor::Dim, self.theme))
            .title(Line::styled(format!(" Group {} ", self.group), title));

        let rows = match self.table {
            GroupTable::Empty => {
                Paragraph::new(EMPTY_GROUP_MESSAGE)
                    .style(resolve(ThemeColor::Dim, self.theme))
                    .block(block)
                    .render(area, buf);
                return;
            }
            GroupTable::Rows(rows) => rows,
        };

        let show_logo = area.width >= LOGO_COLUMN_MIN_WIDTH;
        let mut widths = vec![
            Constraint::Length(3),
            Constraint::Fill(1),
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Length(5),
        ];
        let mut header = vec!["#", "Team", "W", "L", "Pts"];
        if show_logo {
            widths.push(Constraint::Percentage(40));
            header.push("Logo");
        }

        let body = rows.iter().map(|row| {
            let style = if row.position == 1 {
                resolve(ThemeColor::Winner, self.theme)
            } else {
                resolve(ThemeColor::Secondary, self.theme)
            };
            let mut cells = vec![
                row.position.to_string(),
                row.name.clone(),
                row.wins.to_string(),
                row.losses.to_string(),
                row.points.to_string(),
            ];
            if show_logo {
                cells.push(row.logo.clone());
            }
            Row::new(cells).style(style)
        });

        Table::new(body, widths)
            .header(Row::new(header).style(resolve(ThemeColor::Primary, self.theme)))
            .block(block)
            .render(area, buf);
    }
}

fn text_row(row: &StandingsRow) -> String {
    format!(
        "{:>3}  {:<24} {:>3} {:>3} {:>4}",
        row.position, row.name, row.wins, row.losses, row.points
    )
}

/// Plain-text tables for printing to stdout.
pub fn render_text(standings: &Standings) -> String {
    let Standings::Groups(groups) = standings else {
        return UNREVEALED_MESSAGE.to_string();
    };
    let mut out = Vec::new();
    for (group, table) in groups {
        out.push(format!("Group {group}"));
        match table {
            GroupTable::Empty => out.push(format!("  {EMPTY_GROUP_MESSAGE}")),
            GroupTable::Rows(rows) => {
                out.push(format!("{:>3}  {:<24} {:>3} {:>3} {:>4}", "#", "Team", "W", "L", "Pts"));
                out.extend(rows.iter().map(text_row));
            }
        }
        out.push(String::new());
    }
    out.join("\n").trim_end().to_string()
}

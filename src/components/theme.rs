use tui::style::{Color, Modifier, Style};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThemeColor {
    Primary,
    Secondary,
    Accent,
    Dim,
    Winner,
    Loser,
    Selected,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Theme {
    #[default]
    Dark,
}

pub fn resolve(color: ThemeColor, _theme: Theme) -> Style {
    match color {
        ThemeColor::Primary => Style::default().fg(Color::Rgb(138, 90, 255)),
        ThemeColor::Secondary => Style::default().fg(Color::Rgb(0, 200, 210)),
        ThemeColor::Accent => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ThemeColor::Dim | ThemeColor::Loser => Style::default().fg(Color::Indexed(240)),
        ThemeColor::Winner => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ThemeColor::Selected => Style::default().fg(Color::White).add_modifier(Modifier::REVERSED),
    }
}

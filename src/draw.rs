use tui::backend::Backend;
use tui::layout::{Alignment, Constraint, Layout, Rect};
use tui::style::{Color, Modifier, Style};
use tui::text::{Line, Span};
use tui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Tabs, Wrap};
use tui::{Frame, Terminal};
use tui_logger::{TuiLoggerLevelOutput, TuiLoggerWidget};

use crate::app::{App, MenuItem};
use crate::components::bracket::{BRACKET_HEIGHT, BracketWidget};
use crate::components::standings::{StandingsTable, UNREVEALED_MESSAGE};
use crate::components::theme::{Theme, ThemeColor, resolve};
use crate::state::admin::FormState;
use crate::state::network::{ERROR_CHAR, LoadingState};
use crate::ui::layout::LayoutAreas;
use raynu_api::Member;
use raynu_api::admin::{AdminData, MAX_CASTERS};
use raynu_api::auth::{AdminAccess, AdminSection};
use raynu_api::bracket::{BracketSlot, BracketView};
use raynu_api::config::AssetKey;
use raynu_api::standings::Standings;

const THEME: Theme = Theme::Dark;

pub fn draw<B>(terminal: &mut Terminal<B>, app: &mut App, loading: LoadingState)
where
    B: Backend,
{
    let current_size = terminal.size().unwrap_or_default();
    if current_size.width <= 10 || current_size.height <= 10 {
        return;
    }

    let mut layout = LayoutAreas::new(current_size);

    let result = terminal.draw(|f| {
        layout.update(f.area(), app.settings.full_screen, app.state.show_logs);

        if !app.settings.full_screen {
            draw_tabs(f, layout.tab_bar, app);
        }

        match app.state.active_tab {
            MenuItem::Standings => draw_standings(f, layout.main, app),
            MenuItem::Bracket => draw_bracket(f, layout.main, app),
            MenuItem::Teams => draw_teams(f, layout.main, app),
            MenuItem::Casters => draw_casters(f, layout.main, app),
            MenuItem::Admin => draw_admin(f, layout.main, app),
            MenuItem::Help => draw_help(f, layout.main, app),
        }

        if let Some(logs) = layout.logs {
            draw_logs(f, logs);
        }

        if let Some(form) = &app.state.admin.form {
            draw_form(f, f.area(), form);
        }
        if let Some(confirm) = &app.state.admin.confirm {
            draw_popup(f, f.area(), " Confirm ", &format!("{}\n\ny = yes   n = no", confirm.prompt), Color::Yellow);
        }
        if let Some(notice) = &app.state.notice {
            let (title, color) = if notice.is_error { (" Error ", Color::Red) } else { (" Notice ", Color::Green) };
            draw_popup(f, f.area(), title, &format!("{}\n\nEnter to close", notice.message), color);
        }

        draw_loading_spinner(f, f.area(), app, loading);
    });
    if let Err(e) = result {
        log::error!("draw failed: {e}");
    }
}

pub fn default_border<'a>(color: Color) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

fn draw_tabs(f: &mut Frame, tab_bar: [Rect; 2], app: &App) {
    let style = Style::default().fg(Color::White);
    let border_type = BorderType::Rounded;

    let tab_index = match app.state.active_tab {
        MenuItem::Standings => 0,
        MenuItem::Bracket => 1,
        MenuItem::Teams => 2,
        MenuItem::Casters => 3,
        MenuItem::Admin => 4,
        MenuItem::Help => 0,
    };
    let console = if app.state.session.is_some() { "Admin" } else { "Login" };

    let titles: Vec<Line> = ["Standings", "Bracket", "Teams", "Casters", console]
        .iter()
        .map(|t| Line::from(*t))
        .collect();
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::LEFT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .highlight_style(Style::default().add_modifier(Modifier::UNDERLINED))
        .select(tab_index)
        .style(style);
    f.render_widget(tabs, tab_bar[0]);

    let help = Paragraph::new("Help: ? ")
        .alignment(Alignment::Right)
        .block(
            Block::default()
                .borders(Borders::RIGHT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .style(style);
    f.render_widget(help, tab_bar[1]);
}

// ---------------------------------------------------------------------------
// Public pages
// ---------------------------------------------------------------------------

fn loading_or_error(app: &App, what: &str) -> String {
    match app.state.last_error.as_deref() {
        Some(err) if !app.state.public.loaded => format!("{what} load failed:\n{err}"),
        _ => format!("Loading {}...", what.to_lowercase()),
    }
}

fn draw_standings(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::White).title(" Standings ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let standings = match app.state.public.standings.as_ref() {
        None => return draw_message(f, inner, &loading_or_error(app, "Standings")),
        Some(Err(e)) => return draw_message(f, inner, &format!("Standings unavailable:\n{e}")),
        Some(Ok(Standings::Unrevealed)) => return draw_message(f, inner, UNREVEALED_MESSAGE),
        Some(Ok(Standings::Groups(groups))) => groups,
    };

    let [header, content] = Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]).areas(inner);
    let source = app
        .state
        .public
        .source
        .map_or_else(String::new, |s| format!("  (source: {s})"));
    f.render_widget(
        Paragraph::new(format!("Group stage{source}   r=reload  ?=help  q=quit"))
            .style(Style::default().fg(Color::DarkGray)),
        header,
    );

    // side by side when wide, stacked otherwise
    let count = standings.len().max(1) as u32;
    let constraints = vec![Constraint::Ratio(1, count); standings.len()];
    let areas = if content.width >= 100 {
        Layout::horizontal(constraints).split(content)
    } else {
        Layout::vertical(constraints).split(content)
    };
    for ((group, table), area) in standings.iter().zip(areas.iter()) {
        f.render_widget(StandingsTable { group, table, theme: THEME }, *area);
    }
}

fn draw_bracket(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::White).title(" Playoffs ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let bracket = match app.state.public.bracket.as_ref() {
        None => return draw_message(f, inner, &loading_or_error(app, "Bracket")),
        Some(Err(e)) => return draw_message(f, inner, &format!("Bracket load failed:\n{e}")),
        Some(Ok(BracketView::Pending { message })) => return draw_message(f, inner, message),
        Some(Ok(BracketView::Ready(bracket))) => bracket,
    };

    let [key_legend, grid, details] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(BRACKET_HEIGHT),
        Constraint::Length(5),
    ])
    .areas(inner);
    f.render_widget(
        Paragraph::new("Keys: j/k=select match  r=reload  ?=help  q=quit")
            .style(Style::default().fg(Color::DarkGray)),
        key_legend,
    );

    let selected = app.state.public.selected_round();
    f.render_widget(BracketWidget { bracket, selected, theme: THEME }, grid);

    if let Some(slot) = bracket.slot(selected) {
        let block = Block::default().borders(Borders::TOP).title(format!(" {selected} "));
        let text = slot_details(slot).join("\n");
        f.render_widget(Paragraph::new(text).block(block), details);
    }
}

fn slot_details(slot: &BracketSlot) -> Vec<String> {
    let side = |s: &raynu_api::bracket::SlotSide| {
        if s.team.is_some() {
            format!("{} - logo {}", s.name(), s.logo)
        } else {
            "TBD".to_string()
        }
    };
    let when = slot
        .scheduled_at
        .map(|t| t.with_timezone(&chrono::Local).format("%a %b %d %Y %H:%M").to_string())
        .unwrap_or_else(|| "not scheduled".to_string());
    vec![
        side(&slot.top),
        side(&slot.bottom),
        format!(
            "{when}{}{}",
            slot.format.as_deref().map(|f| format!("  {}", f.to_uppercase())).unwrap_or_default(),
            slot.match_id.as_deref().map(|id| format!("  match {id}")).unwrap_or_default(),
        ),
    ]
}

fn draw_teams(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::White).title(" Teams ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let public = &app.state.public;
    if public.teams.is_empty() {
        let msg = if public.loaded { UNREVEALED_MESSAGE.to_string() } else { loading_or_error(app, "Teams") };
        return draw_message(f, inner, &msg);
    }

    let [list, detail] =
        Layout::horizontal([Constraint::Percentage(35), Constraint::Percentage(65)]).areas(inner);
    let names: Vec<String> = public.teams.iter().map(|t| format!("[{}] {}", t.group, t.name)).collect();
    f.render_widget(Paragraph::new(list_lines(&names, public.selected_team, list.height)), list);

    let Some(team) = public.teams.get(public.selected_team) else {
        return;
    };
    let mut lines = vec![
        Line::styled(team.name.clone(), resolve(ThemeColor::Accent, THEME)),
        Line::from(format!("Group {}", team.group)),
    ];
    if let Some(motto) = team.motto.as_deref().filter(|m| !m.is_empty()) {
        lines.push(Line::styled(format!("\"{motto}\""), resolve(ThemeColor::Dim, THEME)));
    }
    lines.push(Line::from(format!(
        "Points {}   Won {}   Lost {}",
        team.stats.points, team.stats.games_won, team.stats.games_lost
    )));
    lines.push(Line::from(format!(
        "Logo {}",
        app.config.with_default(team.logo.as_deref(), AssetKey::TeamLogo)
    )));
    lines.push(Line::from(""));
    lines.push(Line::styled("Roster", resolve(ThemeColor::Primary, THEME)));
    if team.members.is_empty() {
        lines.push(Line::styled("  no members listed", resolve(ThemeColor::Dim, THEME)));
    }
    lines.extend(roster_lines(&team.members).into_iter().map(Line::from));
    f.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::LEFT))
            .wrap(Wrap { trim: false }),
        detail,
    );
}

fn draw_casters(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::White).title(" Casters ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let public = &app.state.public;
    if public.casters.is_empty() {
        let msg = match &public.casters_error {
            Some(e) => format!("Casters unavailable:\n{e}"),
            None if public.loaded => "No casters announced yet.".to_string(),
            None => loading_or_error(app, "Casters"),
        };
        return draw_message(f, inner, &msg);
    }

    let [list, detail] =
        Layout::horizontal([Constraint::Percentage(35), Constraint::Percentage(65)]).areas(inner);
    let names: Vec<String> = public.casters.iter().map(|c| c.name.clone()).collect();
    f.render_widget(Paragraph::new(list_lines(&names, public.selected_caster, list.height)), list);

    let Some(caster) = public.casters.get(public.selected_caster) else {
        return;
    };
    let mut lines = vec![
        Line::styled(caster.name.clone(), resolve(ThemeColor::Accent, THEME)),
        Line::from(caster.description.clone()),
        Line::from(""),
        Line::from(format!(
            "Photo {}",
            app.config.with_default(caster.photo.as_deref(), AssetKey::CasterPhoto)
        )),
    ];
    for (platform, url) in &caster.socials {
        lines.push(Line::from(vec![
            Span::styled(format!("{platform:<12}"), resolve(ThemeColor::Primary, THEME)),
            Span::raw(url.clone()),
        ]));
    }
    f.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::LEFT))
            .wrap(Wrap { trim: false }),
        detail,
    );
}

/// Members in roster order; members sharing a role keep their stored order.
fn roster_lines(members: &[Member]) -> Vec<String> {
    let mut sorted: Vec<&Member> = members.iter().collect();
    sorted.sort_by_key(|m| m.role.roster_rank());
    sorted
        .into_iter()
        .map(|m| format!("  {:<24} {}", m.name, m.role.label()))
        .collect()
}

// ---------------------------------------------------------------------------
// Admin console
// ---------------------------------------------------------------------------

fn draw_admin(f: &mut Frame, area: Rect, app: &App) {
    if app.state.session.is_none() {
        return draw_login(f, area, app);
    }

    let access = app.admin_access();
    let AdminAccess::Granted { claims, sections } = &access else {
        return draw_placeholder(f, area, "Access denied. Sign in again with o.");
    };
    let who = claims.email.as_deref().unwrap_or("signed in");
    let block = default_border(Color::White).title(format!(" Admin: {who} "));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let admin = &app.state.admin;
    let Some(section) = admin.current_section(&access) else {
        return draw_message(f, inner, "Your role has no console sections. o=sign out");
    };
    if !admin.loaded {
        return draw_message(f, inner, "Loading console...");
    }

    let [tabs, keys, content] =
        Layout::vertical([Constraint::Length(1), Constraint::Length(1), Constraint::Fill(1)]).areas(inner);
    let titles: Vec<Line> = sections.iter().map(|s| Line::from(s.title())).collect();
    f.render_widget(
        Tabs::new(titles)
            .select(admin.section)
            .highlight_style(resolve(ThemeColor::Accent, THEME)),
        tabs,
    );
    f.render_widget(
        Paragraph::new(section_keys(section, admin.selected_is_self(Some(claims))))
            .style(Style::default().fg(Color::DarkGray)),
        keys,
    );

    let rows = section_rows(section, &admin.data);
    if rows.is_empty() {
        return draw_message(f, content, "Nothing here yet.");
    }
    f.render_widget(Paragraph::new(list_lines(&rows, admin.selected, content.height)), content);
}

/// `own_row` marks the signed-in account selected in Users; it cannot be deleted.
fn section_keys(section: AdminSection, own_row: bool) -> &'static str {
    match section {
        AdminSection::Teams => "h/l=section j/k=move n=new e=edit d=delete m=add member M=remove member o=sign out",
        AdminSection::Matches => "h/l=section j/k=move n=new e=enter score g=generate playoffs o=sign out",
        AdminSection::Users if own_row => "h/l=section j/k=move n=new e=edit (d: not your own account) o=sign out",
        AdminSection::Casters | AdminSection::Users => "h/l=section j/k=move n=new e=edit d=delete o=sign out",
        AdminSection::Sanctions => "h/l=section j/k=move n=new d=delete o=sign out",
        AdminSection::Logs => "h/l=section j/k=move o=sign out",
    }
}

fn section_rows(section: AdminSection, data: &AdminData) -> Vec<String> {
    match section {
        AdminSection::Teams => data
            .teams
            .iter()
            .map(|t| {
                format!(
                    "{:<24} group {:<2} {:>3} pts  {} members",
                    t.name, t.group, t.stats.points, t.members.len()
                )
            })
            .collect(),
        AdminSection::Matches => {
            let name = |r: &Option<raynu_api::TeamRef>| {
                r.as_ref().map_or_else(|| "TBD".to_string(), |r| data.team_name(r.id()))
            };
            let pending = data.pending_matches().count();
            let mut rows: Vec<String> = data
                .matches
                .iter()
                .map(|m| {
                    let status = match m.final_score() {
                        Some((a, b)) => format!("{a}-{b}"),
                        None => "pending".to_string(),
                    };
                    let stage = m
                        .playoff_round
                        .filter(|_| m.is_playoff)
                        .map_or_else(|| m.group.clone().unwrap_or_default(), |r| r.label().to_string());
                    format!("{:<20} vs {:<20} {:<8} {}", name(&m.team1), name(&m.team2), status, stage)
                })
                .collect();
            if !rows.is_empty() {
                rows[0] = format!("{}   ({pending} pending)", rows[0]);
            }
            rows
        }
        AdminSection::Casters => data
            .casters
            .iter()
            .map(|c| format!("{:<24} {} links", c.name, c.socials.len()))
            .chain(
                (data.casters.len() >= MAX_CASTERS)
                    .then(|| format!("(limit of {MAX_CASTERS} casters reached)")),
            )
            .collect(),
        AdminSection::Users => data
            .users
            .iter()
            .map(|u| {
                let roles: Vec<&str> = u.roles.iter().map(|r| r.label()).collect();
                format!("{:<32} {}", u.email, roles.join(", "))
            })
            .collect(),
        AdminSection::Sanctions => data
            .sanctions
            .iter()
            .map(|s| {
                let team = s.team.as_ref().map_or_else(|| "Unknown team".to_string(), |t| data.team_name(t.id()));
                format!("{team:<24} {:<32} {}", s.reason, s.penalty)
            })
            .collect(),
        AdminSection::Logs => data
            .logs
            .iter()
            .map(|l| {
                let when = l
                    .created()
                    .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                format!("{when:<16} {:<20} {:<24} {}", l.user, l.action, l.details)
            })
            .collect(),
    }
}

fn draw_login(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::White).title(" Sign in ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let login = &app.state.login;
    let field = |label: &str, value: String, focused: bool| {
        let style = if focused { resolve(ThemeColor::Selected, THEME) } else { Style::default() };
        Line::from(vec![Span::raw(format!("{label:>10}: ")), Span::styled(format!("{value} "), style)])
    };
    let lines = vec![
        Line::from(""),
        field("Email", login.email.clone(), login.focus == 0),
        field("Password", "*".repeat(login.password.chars().count()), login.focus == 1),
        Line::from(""),
        Line::styled("Tab=next field  Enter=sign in  Esc=back", resolve(ThemeColor::Dim, THEME)),
    ];
    let [_, form, _] = Layout::vertical([Constraint::Fill(1), Constraint::Length(5), Constraint::Fill(1)]).areas(inner);
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), form);
}

fn draw_form(f: &mut Frame, area: Rect, form: &FormState) {
    let mut lines: Vec<Line> = form
        .fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let style = if i == form.focus { resolve(ThemeColor::Selected, THEME) } else { Style::default() };
            Line::from(vec![
                Span::raw(format!("{:>16}: ", field.label)),
                Span::styled(format!("{} ", field.display()), style),
            ])
        })
        .collect();
    if !form.socials.is_empty() {
        lines.push(Line::from(""));
        lines.extend(form.socials.iter().map(|(platform, url)| {
            Line::styled(format!("{platform:>16}: {url}"), resolve(ThemeColor::Dim, THEME))
        }));
    }
    lines.push(Line::from(""));
    let hint = if form.editing_socials() {
        "Tab=next  ←/→=choose  Enter=add link  Ctrl+R=remove link  Ctrl+S=save  Esc=cancel"
    } else {
        "Tab=next  ←/→=choose  Enter=save  Esc=cancel"
    };
    lines.push(Line::styled(hint, resolve(ThemeColor::Dim, THEME)));

    let height = lines.len() as u16 + 2;
    let popup = popup_area(area, 90, height);
    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(lines).block(default_border(Color::Cyan).title(format!(" {} ", form.title))),
        popup,
    );
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Rows with the selected one highlighted, scrolled so it stays visible.
fn list_lines(items: &[String], selected: usize, height: u16) -> Vec<Line<'static>> {
    let height = usize::from(height.max(1));
    let offset = selected.saturating_sub(height - 1);
    items
        .iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(i, item)| {
            if i == selected {
                Line::styled(item.clone(), resolve(ThemeColor::Selected, THEME))
            } else {
                Line::from(item.clone())
            }
        })
        .collect()
}

fn draw_help(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::DarkGray).title(" Help ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let text = format!(
        "1=Standings  2=Bracket  3=Teams  4=Casters  5=Admin/Login
j/k=move  r=reload  f=full screen  \"=logs  Esc=back  q=quit

Admin: h/l=section  n=new  e=edit  d=delete  m/M=add/remove member
       g=generate playoffs  o=sign out

Tournament logo: {}

{}",
        app.config.default_asset(AssetKey::TournamentLogo),
        app.config
    );
    f.render_widget(Paragraph::new(text).style(Style::default().fg(Color::Gray)), inner);
}

fn draw_logs(f: &mut Frame, area: Rect) {
    let logger = TuiLoggerWidget::default()
        .block(default_border(Color::DarkGray).title(" Logs "))
        .output_separator(' ')
        .output_timestamp(Some("%H:%M:%S".to_string()))
        .output_level(Some(TuiLoggerLevelOutput::Abbreviated))
        .output_target(false)
        .output_file(false)
        .output_line(false)
        .style(Style::default().fg(Color::Gray));
    f.render_widget(logger, area);
}

fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(2));
    let height = height.min(area.height.saturating_sub(2));
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn draw_popup(f: &mut Frame, area: Rect, title: &str, msg: &str, color: Color) {
    let lines = msg.lines().count() as u16;
    let popup = popup_area(area, 64, lines + 4);
    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(msg)
            .wrap(Wrap { trim: true })
            .alignment(Alignment::Center)
            .block(default_border(color).title(title.to_string())),
        popup,
    );
}

fn draw_message(f: &mut Frame, area: Rect, msg: &str) {
    f.render_widget(
        Paragraph::new(msg)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn draw_placeholder(f: &mut Frame, area: Rect, msg: &str) {
    let block = default_border(Color::DarkGray);
    let inner = block.inner(area);
    f.render_widget(block, area);
    draw_message(f, inner, msg);
}

fn draw_loading_spinner(f: &mut Frame, area: Rect, app: &App, loading: LoadingState) {
    if !loading.is_loading && loading.spinner_char != ERROR_CHAR {
        return;
    }
    let style = match loading.spinner_char {
        ERROR_CHAR => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::White),
    };
    let spinner = Paragraph::new(loading.spinner_char.to_string())
        .alignment(Alignment::Right)
        .style(style);
    let area = if app.settings.full_screen {
        Rect::new(area.width.saturating_sub(3), area.height.saturating_sub(2), 1, 1)
    } else {
        Rect::new(area.width.saturating_sub(11), 1, 1, 1)
    };
    f.render_widget(spinner, area);
}

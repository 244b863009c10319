use chrono::{DateTime, Local, Utc};
use log::error;
use tui::backend::Backend;
use tui::layout::{Alignment, Constraint, Layout, Rect};
use tui::style::{Color, Modifier, Style};
use tui::text::{Line, Span};
use tui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, Tabs};
use tui::{Frame, Terminal};
use tui_logger::TuiLoggerWidget;

use crate::app::{App, MenuItem};
use crate::components::bracket::{BRACKET_HEIGHT, BracketGrid, BracketView, hidden_matches, team_label};
use crate::components::theme::{Tone, style};
use crate::state::network::{ERROR_CHAR, LoadingState};
use crate::ui::layout::LayoutAreas;
use navetane_core::{BracketMatch, CoupeMatch, MatchStatus, PreliminaryMatch, Stage, TeamData};

static TABS: &[&str; 3] = &["Classement", "Coupe du Maire", "Phases finales"];

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
            MenuItem::Cup => draw_cup(f, layout.main, app),
            MenuItem::Finals => draw_finals(f, layout.main, app),
            MenuItem::Help => draw_help(f, layout.main),
        }

        if let Some(logs) = layout.logs {
            draw_logs(f, logs);
        }
        draw_status(f, layout.status, app);
        draw_loading_spinner(f, f.area(), app, loading);
    });
    if let Err(e) = result {
        error!("draw failed: {e}");
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
        MenuItem::Standings | MenuItem::Help => 0,
        MenuItem::Cup => 1,
        MenuItem::Finals => 2,
    };

    let titles: Vec<Line> = TABS.iter().map(|t| Line::from(*t)).collect();
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

    let help = Paragraph::new("Aide: ? ")
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
// Standings
// ---------------------------------------------------------------------------

fn draw_standings(f: &mut Frame, area: Rect, app: &App) {
    let board = &app.state.board;
    let Some(poule) = board.current_poule() else {
        draw_placeholder(f, area, " Classement ", empty_message(app, "Aucune poule publiée."));
        return;
    };

    let title = format!(" {} ({}/{}) ", poule.name, board.selected_poule + 1, board.poules().len());
    let block = default_border(Color::White).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let [table_area, hint_area] =
        Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(inner);

    let table = app.current_standings();
    let header = Row::new(["#", "Équipe", "Pts", "MJ", "G", "N", "P", "BP", "BC", "Diff"])
        .style(style(Tone::Accent));
    let rows = table.iter().map(|line| {
        let r = &line.record;
        let marker = if line.qualified { "●" } else { " " };
        let row = Row::new(vec![
            Cell::from(format!("{marker}{:>2}", line.rank)),
            Cell::from(r.team.clone()),
            Cell::from(r.points.to_string()),
            Cell::from(r.played.to_string()),
            Cell::from(r.won.to_string()),
            Cell::from(r.drawn.to_string()),
            Cell::from(r.lost.to_string()),
            Cell::from(r.goals_for.to_string()),
            Cell::from(r.goals_against.to_string()),
            Cell::from(format!("{:+}", r.goal_balance)),
        ]);
        if line.qualified { row.style(style(Tone::Qualified)) } else { row }
    });
    let widths = [
        Constraint::Length(4),
        Constraint::Fill(1),
        Constraint::Length(4),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(4),
        Constraint::Length(4),
        Constraint::Length(5),
    ];
    f.render_widget(Table::new(rows, widths).header(header).column_spacing(1), table_area);

    let qualified = table.iter().filter(|s| s.qualified).count();
    let hint = format!("● qualifié ({qualified})   h/l: poule   r: recharger");
    f.render_widget(Paragraph::new(hint).style(style(Tone::Dim)), hint_area);
}

// ---------------------------------------------------------------------------
// Cup
// ---------------------------------------------------------------------------

fn draw_cup(f: &mut Frame, area: Rect, app: &App) {
    let Some(page) = app.state.board.page.as_ref() else {
        draw_placeholder(f, area, " Coupe du Maire ", empty_message(app, "Aucune rencontre publiée."));
        return;
    };
    let view = &page.navetane.view;

    let block = default_border(Color::White).title(" Coupe du Maire ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines: Vec<Line> = Vec::new();
    if let Some(prelim) = view.preliminary_match.as_ref() {
        lines.push(Line::styled("Match préliminaire", style(Tone::Accent)));
        lines.extend(preliminary_lines(prelim));
        lines.push(Line::raw(""));
    }

    lines.push(Line::styled("Rencontres", style(Tone::Accent)));
    if view.coupe_matches.is_empty() {
        lines.push(Line::styled("  Aucune rencontre pour le moment.", style(Tone::Dim)));
    }
    lines.extend(view.coupe_matches.iter().map(coupe_line));

    f.render_widget(Paragraph::new(lines).scroll((app.state.board.scroll_offset, 0)), inner);
}

fn display_name<'a>(name: &'a str, data: Option<&'a TeamData>) -> &'a str {
    data.map(|d| d.name.as_str()).filter(|n| !n.is_empty()).unwrap_or(name)
}

fn coupe_line(m: &CoupeMatch) -> Line<'_> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(display_name(&m.team_a, m.team_a_data.as_ref()), style(Tone::Selected)),
        Span::styled("  vs  ", style(Tone::Dim)),
        Span::styled(display_name(&m.team_b, m.team_b_data.as_ref()), style(Tone::Selected)),
    ])
}

fn preliminary_lines(prelim: &PreliminaryMatch) -> Vec<Line<'_>> {
    let team_a = display_name(&prelim.team_a, prelim.team_a_data.as_ref());
    let team_b = display_name(&prelim.team_b, prelim.team_b_data.as_ref());
    let mut lines = vec![Line::from(vec![
        Span::raw("  "),
        Span::styled(team_a, style(Tone::Selected)),
        Span::styled("  vs  ", style(Tone::Dim)),
        Span::styled(team_b, style(Tone::Selected)),
    ])];
    if !prelim.winner_plays_against.is_empty() {
        let opponent = display_name(&prelim.winner_plays_against, prelim.winner_plays_against_data.as_ref());
        lines.push(Line::from(vec![
            Span::styled("  Le vainqueur affronte ", style(Tone::Dim)),
            Span::styled(opponent, style(Tone::Primary)),
        ]));
    }
    lines
}

// ---------------------------------------------------------------------------
// Finals
// ---------------------------------------------------------------------------

fn draw_finals(f: &mut Frame, area: Rect, app: &App) {
    let board = &app.state.board;
    let title = format!(" Phases finales: {} ", board.competition.label());
    let block = default_border(Color::White).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(bracket) = board.bracket() else {
        f.render_widget(
            Paragraph::new(empty_message(app, "Aucune phase finale publiée.")).style(style(Tone::Dim)),
            inner,
        );
        return;
    };

    let [bracket_area, list_area] =
        Layout::vertical([Constraint::Length(BRACKET_HEIGHT + 1), Constraint::Fill(1)]).areas(inner);

    let grid = BracketGrid::compute(bracket_area.width);
    let x_pad = bracket_area.width.saturating_sub(grid.total_width) / 2;
    let centered = Rect { x: bracket_area.x + x_pad, width: bracket_area.width - x_pad, ..bracket_area };
    f.render_widget(
        BracketView {
            stages: [bracket.quarters.as_slice(), bracket.semis.as_slice(), bracket.r#final.as_slice()],
            grid: &grid,
            selected_stage: board.stage,
            selected_match: board.selected_match,
        },
        centered,
    );

    let counts = Stage::ALL.map(|stage| board.stage_matches(stage).len());
    let matches = board.stage_matches(board.stage);
    let mut lines = Vec::with_capacity(matches.len() + 3);
    lines.push(stage_header(board.stage, counts));
    if matches.is_empty() {
        lines.push(Line::styled("  Aucune rencontre.", style(Tone::Dim)));
    }
    for (idx, m) in matches.iter().enumerate() {
        lines.push(bracket_match_line(m, idx == board.selected_match));
    }
    let hidden = hidden_matches(board.stage, matches.len());
    if hidden > 0 {
        lines.push(Line::styled(format!("  +{hidden} hors du tableau"), style(Tone::Dim)));
    }
    f.render_widget(Paragraph::new(lines), list_area);
}

fn stage_header(current: Stage, counts: [usize; 3]) -> Line<'static> {
    let mut spans = Vec::new();
    for (stage, count) in Stage::ALL.into_iter().zip(counts) {
        let tone = if stage == current { Tone::Accent } else { Tone::Dim };
        spans.push(Span::styled(stage_tab_label(stage, count), style(tone)));
    }
    spans.push(Span::styled("   h/l: tour  j/k: match  c: compétition", style(Tone::Dim)));
    Line::from(spans)
}

/// Stage name, plus how many of its fixtures the grid could not draw.
fn stage_tab_label(stage: Stage, count: usize) -> String {
    match hidden_matches(stage, count) {
        0 => format!(" {} ", stage.label()),
        hidden => format!(" {} (+{hidden}) ", stage.label()),
    }
}

fn bracket_match_line(m: &BracketMatch, selected: bool) -> Line<'_> {
    let marker = if selected { ">" } else { " " };
    let team_a = team_label(m.team_a_id.as_deref(), m.team_a_name.as_deref());
    let team_b = team_label(m.team_b_id.as_deref(), m.team_b_name.as_deref());
    let score = match (m.score_a, m.score_b) {
        (Some(a), Some(b)) => format!("{a} - {b}"),
        _ => "-".to_string(),
    };
    let status = match m.status {
        MatchStatus::Played => "Terminé".to_string(),
        MatchStatus::Pending => m.date.clone().filter(|d| !d.is_empty()).unwrap_or_else(|| "À venir".to_string()),
    };
    let base = if selected { style(Tone::Selected) } else { Style::default().fg(Color::Gray) };
    Line::from(vec![
        Span::styled(format!("{marker} {team_a}  {score}  {team_b}"), base),
        Span::styled(format!("  [{status}]"), style(Tone::Dim)),
    ])
}

// ---------------------------------------------------------------------------
// Help, logs, status
// ---------------------------------------------------------------------------

fn draw_help(f: &mut Frame, area: Rect) {
    let block = default_border(Color::White).title(" Aide ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let bindings = [
        ("1 / 2 / 3", "Classement / Coupe du Maire / Phases finales"),
        ("h / l", "poule précédente / suivante, tour précédent / suivant"),
        ("j / k", "faire défiler, match suivant / précédent"),
        ("c", "basculer Championnat / Coupe"),
        ("r", "recharger les vues publiées"),
        ("f", "plein écran"),
        ("\"", "afficher les journaux"),
        ("Esc", "quitter l'aide"),
        ("q", "quitter"),
    ];
    let lines: Vec<Line> = bindings
        .iter()
        .map(|(key, action)| {
            Line::from(vec![
                Span::styled(format!("{key:>10}  "), style(Tone::Accent)),
                Span::raw(*action),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_logs(f: &mut Frame, area: Rect) {
    let logger = TuiLoggerWidget::default()
        .block(default_border(Color::DarkGray).title(" Journaux "))
        .style_error(style(Tone::Error))
        .style_warn(Style::default().fg(Color::Yellow))
        .style_info(Style::default().fg(Color::Gray));
    f.render_widget(logger, area);
}

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
    let line = match (&app.state.last_error, app.state.board.page.as_ref()) {
        (Some(message), _) => Line::styled(format!(" Erreur: {message}"), style(Tone::Error)),
        (None, Some(page)) => Line::styled(
            format!(
                " Classement publié {} · Phases finales publiées {} · {}",
                published_label(page.navetane.last_published),
                published_label(page.finals.last_published),
                app.settings.store_label(),
            ),
            style(Tone::Dim),
        ),
        (None, None) => Line::styled(" Chargement…", style(Tone::Dim)),
    };
    f.render_widget(Paragraph::new(line), area);
}

fn published_label(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.with_timezone(&Local).format("le %d/%m à %H:%M").to_string())
        .unwrap_or_else(|| "jamais".to_string())
}

fn empty_message(app: &App, fallback: &str) -> String {
    match &app.state.last_error {
        Some(message) => format!("Impossible de charger les vues publiées: {message}"),
        None if app.state.board.page.is_none() => "Chargement…".to_string(),
        None => fallback.to_string(),
    }
}

fn draw_placeholder(f: &mut Frame, area: Rect, title: &str, msg: String) {
    let block = default_border(Color::White).title(title.to_string());
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(
        Paragraph::new(msg).style(style(Tone::Dim)).alignment(Alignment::Center),
        inner,
    );
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

use navetane_core::{BracketMatch, MatchStatus, Side, Stage};
use tui::buffer::Buffer;
use tui::layout::Rect;
use tui::style::{Color, Modifier, Style};
use tui::widgets::Widget;

use crate::components::theme::{Tone, style};

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

/// Rows per match cell: team A line, status line, team B line.
pub const MATCH_HEIGHT: u16 = 3;

/// Slot heights per depth (d=0 quarterfinals, d=2 final).
/// SH[0] = MATCH_HEIGHT; SH[d] = 2 * SH[d-1] + 1.
const SH: [u16; 3] = [
    MATCH_HEIGHT,                     // Quarters: 3
    2 * MATCH_HEIGHT + 1,             // Semis:    7
    2 * (2 * MATCH_HEIGHT + 1) + 1,   // Final:   15
];

/// Rows consumed by one competition's bracket.
pub const BRACKET_HEIGHT: u16 = SH[2];

/// Width of the connector zone drawn between adjacent stage columns.
pub const CONNECTOR_WIDTH: u16 = 3;

/// Maximum match cell width in wider terminals.
const CELL_W_FULL: u16 = 26;

/// Matches drawn per stage; extra fixtures only show in the stage list.
const SLOTS: [usize; 3] = [4, 2, 1];

// ---------------------------------------------------------------------------
// MatchCell
// ---------------------------------------------------------------------------

/// Pre-computed layout position for one fixture slot.
#[derive(Debug, Clone)]
pub struct MatchCell {
    /// Row of the status line (center of the 3-row cell), relative to the
    /// bracket origin.
    pub center_row: u16,
    /// Starting x-column within the grid.
    pub col: u16,
    pub cell_width: u16,
    /// False for the final; it has no column to its right.
    #[allow(dead_code)]
    pub draw_outbound_connector: bool,
    pub stage: Stage,
    /// Index into the stage's match list.
    pub match_idx: usize,
}

// ---------------------------------------------------------------------------
// BracketGrid
// ---------------------------------------------------------------------------

/// Column order left to right: Quarters | conn | Semis | conn | Final
#[derive(Debug, Clone)]
pub struct BracketGrid {
    /// All cells in depth-major order: 4 + 2 + 1.
    pub cells: Vec<MatchCell>,
    /// Starting x-column for each stage column.
    pub stage_cols: [u16; 3],
    pub total_width: u16,
    pub cell_width: u16,
}

impl BracketGrid {
    /// Lay out a bracket that fits `width` columns:
    /// `3 * cell_width + 2 * CONNECTOR_WIDTH <= width`.
    ///
    /// Center rows follow `center[d][i] = SH[d]/2 + i * (SH[d+1] - SH[d])`:
    ///   Quarters (d=0): [1, 5, 9, 13]
    ///   Semis    (d=1): [3, 11]
    ///   Final    (d=2): [7]
    pub fn compute(width: u16) -> Self {
        let per_col = width.saturating_sub(CONNECTOR_WIDTH * 2) / 3;
        let cell_width = per_col.clamp(1, CELL_W_FULL);
        let stride = cell_width + CONNECTOR_WIDTH;
        let stage_cols = [0u16, stride, stride * 2];

        let first_center = [SH[0] / 2, SH[1] / 2, SH[2] / 2];
        let spacing: [u16; 3] = [SH[1] - SH[0], SH[2] - SH[1], 0];

        let mut cells = Vec::with_capacity(7);
        for (d, stage) in Stage::ALL.into_iter().enumerate() {
            for i in 0..SLOTS[d] {
                cells.push(MatchCell {
                    center_row: first_center[d] + i as u16 * spacing[d],
                    col: stage_cols[d],
                    cell_width,
                    draw_outbound_connector: d < 2,
                    stage,
                    match_idx: i,
                });
            }
        }

        Self { cells, stage_cols, total_width: stride * 2 + cell_width, cell_width }
    }

    /// Cells for a depth (0 = quarters, 1 = semis, 2 = final).
    pub fn cells_for_depth(&self, depth: usize) -> &[MatchCell] {
        const OFFSETS: [usize; 4] = [0, 4, 6, 7];
        &self.cells[OFFSETS[depth]..OFFSETS[depth + 1]]
    }
}

pub fn stage_to_depth(stage: Stage) -> usize {
    match stage {
        Stage::Quarters => 0,
        Stage::Semis => 1,
        Stage::Final => 2,
    }
}

/// Fixtures of `stage` past the grid's slots. They only appear in the
/// stage list.
pub fn hidden_matches(stage: Stage, count: usize) -> usize {
    count.saturating_sub(SLOTS[stage_to_depth(stage)])
}

// ---------------------------------------------------------------------------
// BracketView widget
// ---------------------------------------------------------------------------

/// Renders one competition's knockout bracket.
pub struct BracketView<'a> {
    /// Matches per depth: [quarters, semis, final]. A short slice leaves
    /// the remaining slots empty.
    pub stages: [&'a [BracketMatch]; 3],
    pub grid: &'a BracketGrid,
    pub selected_stage: Stage,
    pub selected_match: usize,
}

impl<'a> Widget for BracketView<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 20 || area.height < MATCH_HEIGHT {
            return;
        }

        let selected_depth = stage_to_depth(self.selected_stage);
        for cell in &self.grid.cells {
            let depth = stage_to_depth(cell.stage);
            let fixture = self.stages[depth].get(cell.match_idx);
            let selected = depth == selected_depth && cell.match_idx == self.selected_match;
            draw_match_cell(fixture, cell, selected, area, buf);
        }

        // Each parent at depth d+1 joins two children at depth d.
        for depth in 0..2usize {
            let child_cells = self.grid.cells_for_depth(depth);
            let parent_cells = self.grid.cells_for_depth(depth + 1);
            let conn_x = area.x + self.grid.stage_cols[depth] + self.grid.cell_width;
            for (j, parent) in parent_cells.iter().enumerate() {
                draw_connector(
                    child_cells[2 * j].center_row,
                    parent.center_row,
                    child_cells[2 * j + 1].center_row,
                    conn_x,
                    area,
                    buf,
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Drawing helpers
// ---------------------------------------------------------------------------

/// Bracket-relative row to screen y, or `None` when clipped.
fn screen_y(bracket_row: u16, area: Rect) -> Option<u16> {
    (bracket_row < area.height).then(|| area.y + bracket_row)
}

fn draw_match_cell(fixture: Option<&BracketMatch>, cell: &MatchCell, selected: bool, area: Rect, buf: &mut Buffer) {
    let x = area.x + cell.col;
    if x >= area.x + area.width {
        return;
    }
    let avail_w = (area.x + area.width).saturating_sub(x) as usize;

    let base_style = if selected { style(Tone::Selected) } else { Style::default().fg(Color::Gray) };
    let winner = fixture.and_then(BracketMatch::winner_side);

    let rows = [
        (cell.center_row.saturating_sub(1), 0u8),
        (cell.center_row, 1),
        (cell.center_row.saturating_add(1), 2),
    ];
    for (bracket_row, slot_idx) in rows {
        let Some(sy) = screen_y(bracket_row, area) else {
            continue;
        };

        let content = format_match_row(fixture, slot_idx, cell.cell_width as usize);
        let text: String = content.chars().take(avail_w).collect();

        let row_style = match (slot_idx, winner) {
            (1, _) => match fixture.map(|m| m.status) {
                Some(MatchStatus::Played) => style(Tone::Primary),
                _ => style(Tone::Dim),
            },
            (0, Some(Side::A)) | (2, Some(Side::B)) => style(Tone::Winner),
            _ => base_style,
        };
        let row_style = if selected && slot_idx != 1 { row_style.add_modifier(Modifier::BOLD) } else { row_style };

        buf.set_string(x, sy, &text, row_style);
    }
}

/// `slot_idx`: 0 = team A, 1 = status, 2 = team B.
fn format_match_row(fixture: Option<&BracketMatch>, slot_idx: u8, width: usize) -> String {
    match fixture {
        None => " ".repeat(width),
        Some(m) => match slot_idx {
            0 => format_team_line(team_label(m.team_a_id.as_deref(), m.team_a_name.as_deref()), m.score_a, width),
            2 => format_team_line(team_label(m.team_b_id.as_deref(), m.team_b_name.as_deref()), m.score_b, width),
            _ => format_status_line(m, width),
        },
    }
}

/// An unassigned side reads "À déterminer"; an id that no longer resolves
/// to a registry team reads "?".
pub fn team_label<'a>(id: Option<&str>, name: Option<&'a str>) -> &'a str {
    match (id, name) {
        (_, Some(name)) => name,
        (Some(_), None) => "?",
        (None, None) => "À déterminer",
    }
}

/// `"[name        ] [score] "`; total width = name_w + 5.
pub fn format_team_line(name: &str, score: Option<u32>, width: usize) -> String {
    let score_str = match score {
        Some(s) => format!("{s:>3}"),
        None => "   ".to_string(),
    };
    let name_w = width.saturating_sub(5);
    let name_trunc: String = name.chars().take(name_w).collect();
    format!("{name_trunc:<name_w$} {score_str} ")
}

fn format_status_line(fixture: &BracketMatch, width: usize) -> String {
    let raw = match (fixture.status, fixture.date.as_deref()) {
        (MatchStatus::Played, _) => " Terminé".to_string(),
        (MatchStatus::Pending, Some(date)) if !date.is_empty() => format!(" {date}"),
        (MatchStatus::Pending, _) => " À venir".to_string(),
    };
    let padded = format!("{raw:<width$}");
    padded.chars().take(width).collect()
}

/// ```text
///  child_top  ──┐
///               │
///  parent       ├──
///               │
///  child_bot  ──┘
/// ```
fn draw_connector(r_top: u16, r_mid: u16, r_bot: u16, conn_x: u16, area: Rect, buf: &mut Buffer) {
    let line_style = style(Tone::Dim);
    let limit_x = area.x + area.width;
    let mut put = |x: u16, row: u16, ch: char| {
        if x < limit_x
            && let Some(sy) = screen_y(row, area)
            && let Some(cell) = buf.cell_mut((x, sy))
        {
            cell.set_char(ch);
            cell.set_style(line_style);
        }
    };

    let (col_a, col_b, col_c) = (conn_x, conn_x + 1, conn_x + 2);
    put(col_a, r_top, '─');
    put(col_b, r_top, '┐');
    for row in (r_top + 1)..r_mid {
        put(col_b, row, '│');
    }
    put(col_b, r_mid, '├');
    put(col_c, r_mid, '─');
    for row in (r_mid + 1)..r_bot {
        put(col_b, row, '│');
    }
    put(col_a, r_bot, '─');
    put(col_b, r_bot, '┘');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracket_height_is_15() {
        assert_eq!(BRACKET_HEIGHT, 15);
    }

    #[test]
    fn test_hidden_matches_past_slots() {
        assert_eq!(hidden_matches(Stage::Quarters, 4), 0);
        assert_eq!(hidden_matches(Stage::Quarters, 5), 1);
        assert_eq!(hidden_matches(Stage::Semis, 0), 0);
        assert_eq!(hidden_matches(Stage::Final, 3), 2);
    }

    #[test]
    fn test_slot_heights() {
        assert_eq!(SH, [3, 7, 15]);
    }

    #[test]
    fn test_bracket_grid_cell_count() {
        let grid = BracketGrid::compute(80);
        assert_eq!(grid.cells.len(), 7);
    }

    #[test]
    fn test_stage_centers() {
        let grid = BracketGrid::compute(80);
        let centers = |d: usize| grid.cells_for_depth(d).iter().map(|c| c.center_row).collect::<Vec<u16>>();
        assert_eq!(centers(0), vec![1, 5, 9, 13]);
        assert_eq!(centers(1), vec![3, 11]);
        assert_eq!(centers(2), vec![7]);
    }

    #[test]
    fn test_cells_carry_their_stage() {
        let grid = BracketGrid::compute(80);
        assert!(grid.cells_for_depth(1).iter().all(|c| c.stage == Stage::Semis));
        assert_eq!(grid.cells_for_depth(2)[0].stage, Stage::Final);
    }

    #[test]
    fn test_only_final_lacks_outbound_connector() {
        let grid = BracketGrid::compute(80);
        assert!(!grid.cells_for_depth(2)[0].draw_outbound_connector);
        assert!(grid.cells_for_depth(0).iter().all(|c| c.draw_outbound_connector));
    }

    #[test]
    fn test_parent_center_is_midpoint_of_children() {
        let grid = BracketGrid::compute(80);
        for depth in 0..2usize {
            let children = grid.cells_for_depth(depth);
            for (j, parent) in grid.cells_for_depth(depth + 1).iter().enumerate() {
                let expected = (children[2 * j].center_row + children[2 * j + 1].center_row) / 2;
                assert_eq!(parent.center_row, expected, "depth={depth} parent={j}");
            }
        }
    }

    #[test]
    fn test_cell_width_is_computed_from_available_width() {
        let width: u16 = 62;
        let grid = BracketGrid::compute(width);
        assert_eq!(grid.cell_width, (width - CONNECTOR_WIDTH * 2) / 3);
        assert!(grid.total_width <= width);
    }

    #[test]
    fn test_cell_width_caps_at_full_width_limit() {
        let grid = BracketGrid::compute(200);
        assert_eq!(grid.cell_width, CELL_W_FULL);
    }

    #[test]
    fn test_format_team_line_width() {
        assert_eq!(format_team_line("ASC Jaraaf de Dakar", Some(2), 14).chars().count(), 14);
        assert_eq!(format_team_line("Gorée", None, 26).chars().count(), 26);
    }

    #[test]
    fn test_status_line_is_padded_and_truncated() {
        let mut m = BracketMatch::pending("q1");
        assert_eq!(format_status_line(&m, 12), " À venir    ");
        m.date = Some("2025-09-14 16:30".into());
        assert_eq!(format_status_line(&m, 8).chars().count(), 8);
        m.status = MatchStatus::Played;
        assert!(format_status_line(&m, 12).starts_with(" Terminé"));
    }

    #[test]
    fn test_team_label_fallbacks() {
        assert_eq!(team_label(None, None), "À déterminer");
        assert_eq!(team_label(Some("gone"), None), "?");
        assert_eq!(team_label(Some("t1"), Some("Gorée")), "Gorée");
    }

    #[test]
    fn test_render_draws_connectors_and_names() {
        let grid = BracketGrid::compute(62);
        let quarters = vec![BracketMatch {
            team_a_name: Some("Gorée".into()),
            team_a_id: Some("t1".into()),
            ..BracketMatch::pending("q1")
        }];
        let view = BracketView {
            stages: [quarters.as_slice(), &[], &[]],
            grid: &grid,
            selected_stage: Stage::Quarters,
            selected_match: 0,
        };
        let area = Rect::new(0, 0, 62, BRACKET_HEIGHT);
        let mut buf = Buffer::empty(area);
        view.render(area, &mut buf);

        let row0: String = (0..62).map(|x| buf[(x, 0)].symbol().to_string()).collect();
        assert!(row0.starts_with("Gorée"));
        let conn_x = grid.cell_width + 1;
        assert_eq!(buf[(conn_x, 1)].symbol(), "┐");
        assert_eq!(buf[(conn_x, 3)].symbol(), "├");
        assert_eq!(buf[(conn_x, 5)].symbol(), "┘");
    }
}

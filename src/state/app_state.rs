use crate::app::MenuItem;
use chrono::{DateTime, Local};
use navetane_core::publish::NavetanePageData;
use navetane_core::{BracketMatch, Competition, FinalsBracket, Poule, Stage};

// ---------------------------------------------------------------------------
// Public board state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct BoardState {
    pub page: Option<NavetanePageData>,
    /// Local time of the last successful load.
    pub loaded_at: Option<DateTime<Local>>,
    pub selected_poule: usize,
    pub competition: Competition,
    /// The stage the user has navigated to on the Finals tab.
    pub stage: Stage,
    pub selected_match: usize,
    /// Vertical scroll offset for the cup fixture list.
    pub scroll_offset: u16,
}

impl BoardState {
    /// Store freshly loaded views. Selections survive a refresh when they
    /// still point at something.
    pub fn load(&mut self, page: NavetanePageData) {
        let first_load = self.page.is_none();
        self.page = Some(page);
        self.loaded_at = Some(Local::now());

        let poule_count = self.poules().len();
        if self.selected_poule >= poule_count {
            self.selected_poule = poule_count.saturating_sub(1);
        }
        if first_load {
            self.stage = self.bracket().map(detect_active_stage).unwrap_or_default();
            self.selected_match = 0;
        }
        self.clamp_match();
    }

    pub fn poules(&self) -> &[Poule] {
        self.page.as_ref().map(|p| p.navetane.view.poules.as_slice()).unwrap_or(&[])
    }

    pub fn current_poule(&self) -> Option<&Poule> {
        self.poules().get(self.selected_poule)
    }

    pub fn next_poule(&mut self) {
        let count = self.poules().len();
        if count > 0 {
            self.selected_poule = (self.selected_poule + 1) % count;
        }
    }

    pub fn prev_poule(&mut self) {
        let count = self.poules().len();
        if count > 0 {
            self.selected_poule = (self.selected_poule + count - 1) % count;
        }
    }

    pub fn bracket(&self) -> Option<&FinalsBracket> {
        self.page.as_ref().map(|p| p.finals.view.bracket(self.competition))
    }

    pub fn stage_matches(&self, stage: Stage) -> &[BracketMatch] {
        self.bracket().map(|b| b.stage(stage)).unwrap_or(&[])
    }

    pub fn toggle_competition(&mut self) {
        self.competition = self.competition.toggle();
        self.stage = self.bracket().map(detect_active_stage).unwrap_or_default();
        self.selected_match = 0;
    }

    pub fn next_stage(&mut self) {
        if let Some(next) = self.stage.next() {
            self.stage = next;
            self.selected_match = 0;
        }
    }

    pub fn prev_stage(&mut self) {
        if let Some(prev) = self.stage.prev() {
            self.stage = prev;
            self.selected_match = 0;
        }
    }

    pub fn match_down(&mut self) {
        let max = self.stage_matches(self.stage).len().saturating_sub(1);
        if self.selected_match < max {
            self.selected_match += 1;
        }
    }

    pub fn match_up(&mut self) {
        self.selected_match = self.selected_match.saturating_sub(1);
    }

    pub fn selected_bracket_match(&self) -> Option<&BracketMatch> {
        self.stage_matches(self.stage).get(self.selected_match)
    }

    pub fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(1);
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }

    fn clamp_match(&mut self) {
        let max = self.stage_matches(self.stage).len().saturating_sub(1);
        self.selected_match = self.selected_match.min(max);
    }
}

/// The latest stage with a team assigned, or the quarterfinals when the
/// bracket is still empty.
fn detect_active_stage(bracket: &FinalsBracket) -> Stage {
    Stage::ALL
        .into_iter()
        .rev()
        .find(|stage| bracket.stage(*stage).iter().any(|m| !m.is_to_be_determined()))
        .unwrap_or_default()
}

#[derive(Debug, Default)]
pub struct AppState {
    pub active_tab: MenuItem,
    pub previous_tab: MenuItem,
    pub show_logs: bool,
    pub last_error: Option<String>,
    pub board: BoardState,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

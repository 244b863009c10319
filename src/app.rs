use crate::state::app_settings::Settings;
use crate::state::app_state::AppState;
use navetane_core::publish::NavetanePageData;
use navetane_core::standings::{Standing, standings};

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum MenuItem {
    #[default]
    Standings,
    Cup,
    Finals,
    Help,
}

pub struct App {
    pub settings: Settings,
    pub state: AppState,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        log::set_max_level(settings.log_level);
        tui_logger::set_default_level(settings.log_level);

        Self { state: AppState::new(), settings }
    }

    // -----------------------------------------------------------------------
    // Network response handlers, called from main_ui_loop
    // -----------------------------------------------------------------------

    pub fn on_page_data_loaded(&mut self, data: NavetanePageData) {
        self.state.last_error = None;
        self.state.board.load(data);
    }

    pub fn on_error(&mut self, message: String) {
        self.state.last_error = Some(message);
    }

    // -----------------------------------------------------------------------
    // Tab management
    // -----------------------------------------------------------------------

    pub fn update_tab(&mut self, next: MenuItem) {
        if self.state.active_tab == next {
            return;
        }
        self.state.previous_tab = self.state.active_tab;
        self.state.active_tab = next;
        if next == MenuItem::Cup {
            self.state.board.scroll_offset = 0;
        }
    }

    pub fn exit_help(&mut self) {
        if self.state.active_tab == MenuItem::Help {
            self.state.active_tab = self.state.previous_tab;
        }
    }

    pub fn toggle_show_logs(&mut self) {
        self.state.show_logs = !self.state.show_logs;
    }

    pub fn toggle_full_screen(&mut self) {
        self.settings.full_screen = !self.settings.full_screen;
    }

    /// Ranked table of the poule on screen.
    pub fn current_standings(&self) -> Vec<Standing> {
        self.state
            .board
            .current_poule()
            .map(|poule| standings(poule, &self.settings.qualification))
            .unwrap_or_default()
    }
}

use crate::state::network::LoadingState;
use crossterm::event::KeyEvent;
use navetane_core::publish::NavetanePageData;

#[derive(Debug, Clone)]
pub enum NetworkRequest {
    LoadPublicViews,
}

#[derive(Debug)]
pub enum NetworkResponse {
    LoadingStateChanged { loading_state: LoadingState },
    /// Both public snapshots, read together.
    PageDataLoaded { data: NavetanePageData },
    Error { message: String },
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    KeyPressed(KeyEvent),
    Resize,
    AppStarted,
}

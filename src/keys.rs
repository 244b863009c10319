use crate::app::{App, MenuItem};
use crate::state::messages::NetworkRequest;
use crossterm::event::KeyCode::Char;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

pub async fn handle_key_bindings(
    key_event: KeyEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
) {
    let mut guard = app.lock().await;

    match (guard.state.active_tab, key_event.code, key_event.modifiers) {
        // Quit
        (_, Char('q'), _) | (_, Char('c'), KeyModifiers::CONTROL) => {
            crate::cleanup_terminal();
            std::process::exit(0);
        }

        // Tab switching
        (_, Char('1'), _) => guard.update_tab(MenuItem::Standings),
        (_, Char('2'), _) => guard.update_tab(MenuItem::Cup),
        (_, Char('3'), _) => guard.update_tab(MenuItem::Finals),
        (_, Char('?'), _) => guard.update_tab(MenuItem::Help),
        (MenuItem::Help, KeyCode::Esc, _) => guard.exit_help(),

        // Poule navigation
        (MenuItem::Standings, Char('l') | KeyCode::Right | KeyCode::Tab, _) => guard.state.board.next_poule(),
        (MenuItem::Standings, Char('h') | KeyCode::Left | KeyCode::BackTab, _) => guard.state.board.prev_poule(),

        // Cup fixture list
        (MenuItem::Cup, Char('j') | KeyCode::Down, _) => guard.state.board.scroll_down(),
        (MenuItem::Cup, Char('k') | KeyCode::Up, _) => guard.state.board.scroll_up(),

        // Bracket navigation
        (MenuItem::Finals, Char('l') | KeyCode::Right, _) => guard.state.board.next_stage(),
        (MenuItem::Finals, Char('h') | KeyCode::Left, _) => guard.state.board.prev_stage(),
        (MenuItem::Finals, Char('j') | KeyCode::Down, _) => guard.state.board.match_down(),
        (MenuItem::Finals, Char('k') | KeyCode::Up, _) => guard.state.board.match_up(),
        (MenuItem::Finals, Char('c') | KeyCode::Tab, _) => guard.state.board.toggle_competition(),

        // Global
        (_, Char('r'), _) => {
            drop(guard);
            let _ = network_requests.send(NetworkRequest::LoadPublicViews).await;
        }
        (_, Char('f'), _) => guard.toggle_full_screen(),
        (_, Char('"'), _) => guard.toggle_show_logs(),

        _ => {}
    }
}

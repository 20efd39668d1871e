mod help;
mod list;

use crate::api::SearchBackend;
use crate::app::App;
use crate::store::KeyValueStore;
use ratatui::Frame;

/// Top-level render dispatch.
pub fn render<B: SearchBackend, S: KeyValueStore>(app: &App<B, S>, frame: &mut Frame) {
    list::render(app, frame);

    // Render help overlay on top if active
    if app.show_help {
        help::render(frame);
    }
}

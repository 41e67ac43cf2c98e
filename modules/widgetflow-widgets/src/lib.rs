//! Widgets built on the widgetflow runtime: a click counter, a checklist
//! with optional server sync, and a drag-and-drop task board.

pub mod checklist;
pub mod counter;
pub mod http;
pub mod taskboard;

pub use checklist::{checklist, ChecklistOptions};
pub use counter::counter;
pub use http::{http_effect, HttpClient, HttpMethod, HttpRequest};
pub use taskboard::task_board;

pub mod app;
pub mod cli;
pub mod config;
pub mod history;
pub mod model;
pub mod storage;

pub use app::{ColorTarget, Selection, TemplateEditor};
pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use history::{Clock, HistoryBuffer, SystemClock};
pub use model::{Category, Color, EventCard, TemplateState, TitleCard};
pub use storage::{FileStorage, LocalStorage, MemoryStorage, Persistence};

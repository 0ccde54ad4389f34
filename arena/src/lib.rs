pub mod actor;
pub mod api;
pub mod assist;
pub mod board;
pub mod chaos;
pub mod combo;
pub mod config;
pub mod economy;
pub mod error;
pub mod gimmick;
pub mod kicks;
pub mod manager;
pub mod piece;
pub mod piece_engine;
pub mod protocol;
pub mod ranking;
pub mod replay;
pub mod room;
pub mod tempo;
pub mod tick_budget;

pub use actor::{MemorySink, NullSink, RecordSink, RoomHandle};
pub use config::{ArenaConfig, ConfigStore};
pub use error::{ActionError, ConfigError, RoomError};
pub use manager::ArenaManager;
pub use room::ArenaRoom;

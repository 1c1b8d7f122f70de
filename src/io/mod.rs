pub mod config_io;
pub mod lock;
pub mod persisted;
pub mod storage;
pub mod watcher;

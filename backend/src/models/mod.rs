//! Domain models shared by the HTTP layer and the stores.

pub mod log_entry;

pub use log_entry::{EntryError, LogEntry};

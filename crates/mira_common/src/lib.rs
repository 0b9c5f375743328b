//! Shared types and state for the Mira assistant.

pub mod memory;
pub mod notification;
pub mod parsers;
pub mod paths;

pub use memory::MemoryStore;
pub use notification::{fresh_records, NotificationRecord, Snapshot};
pub use parsers::notifications::parse_notification_dump;
pub use parsers::power::{parse_screen_state, ScreenState};

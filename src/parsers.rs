pub mod common;
pub mod discord_parser;

pub use common::{AnnouncementFormatter, MessageUtils};
pub use discord_parser::{EVENT_MARKER, extract_event_id, is_valid_event_id, status_from_emoji};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::db::RsvpStatus;

/// Literal prefix that makes a message a tracked RSVP message.
pub const EVENT_MARKER: &str = "event_id:";

pub const GOING_EMOJI: &str = "\u{2705}";
pub const MAYBE_EMOJI: &str = "\u{2753}";
pub const DECLINED_EMOJI: &str = "\u{274C}";

static EVENT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"event_id:([A-Za-z0-9-]+)").expect("invalid event marker regex"));

static EVENT_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("invalid event token regex"));

/// Returns the token following the first `event_id:` marker in `body`.
pub fn extract_event_id(body: &str) -> Option<&str> {
    EVENT_ID_RE
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn is_valid_event_id(id: &str) -> bool {
    EVENT_TOKEN_RE.is_match(id)
}

/// Maps a reaction glyph to an attendance status. Any other glyph is `None`.
pub fn status_from_emoji(emoji: &str) -> Option<RsvpStatus> {
    match emoji {
        GOING_EMOJI => Some(RsvpStatus::Going),
        MAYBE_EMOJI => Some(RsvpStatus::Maybe),
        DECLINED_EMOJI => Some(RsvpStatus::Declined),
        _ => None,
    }
}

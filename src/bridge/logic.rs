use std::fmt;
use std::time::Duration;

use crate::db::{DatabaseError, RsvpStatus};
use crate::parsers::{extract_event_id, status_from_emoji};

use super::ReactionEvent;

/// Why a reaction produced no RSVP. All of these are routine noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    BotActor,
    NoEventMarker,
    UnmappedEmoji,
    UnknownMember,
}

impl IgnoreReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IgnoreReason::BotActor => "bot_actor",
            IgnoreReason::NoEventMarker => "no_event_marker",
            IgnoreReason::UnmappedEmoji => "unmapped_emoji",
            IgnoreReason::UnknownMember => "unknown_member",
        }
    }
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reaction that passed every check not requiring storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RsvpIntent {
    pub(crate) event_id: String,
    pub(crate) status: RsvpStatus,
}

pub(crate) fn classify_reaction(event: &ReactionEvent) -> Result<RsvpIntent, IgnoreReason> {
    if event.is_bot {
        return Err(IgnoreReason::BotActor);
    }

    let event_id = extract_event_id(&event.message_body).ok_or(IgnoreReason::NoEventMarker)?;
    let status = status_from_emoji(&event.emoji).ok_or(IgnoreReason::UnmappedEmoji)?;

    Ok(RsvpIntent {
        event_id: event_id.to_string(),
        status,
    })
}

/// Missing rows and key conflicts will fail the same way on every attempt.
pub(crate) fn is_retryable(error: &DatabaseError) -> bool {
    matches!(
        error,
        DatabaseError::Connection(_) | DatabaseError::Query(_)
    )
}

pub(crate) fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt.max(1))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use test_case::test_case;

    use super::*;

    fn reaction(is_bot: bool, body: &str, emoji: &str) -> ReactionEvent {
        ReactionEvent {
            actor_id: "9001".to_string(),
            is_bot,
            message_body: body.to_string(),
            emoji: emoji.to_string(),
            message_id: None,
        }
    }

    #[test_case("\u{2705}" ; "check mark")]
    #[test_case("\u{1F44D}" ; "thumbs up")]
    fn bot_actor_is_ignored_regardless_of_content(emoji: &str) {
        let event = reaction(true, "Party tonight! event_id:abc-123", emoji);
        assert_eq!(classify_reaction(&event), Err(IgnoreReason::BotActor));
    }

    #[test]
    fn body_without_marker_is_ignored() {
        let event = reaction(false, "Come to the raid!", "\u{2705}");
        assert_eq!(classify_reaction(&event), Err(IgnoreReason::NoEventMarker));
    }

    #[test]
    fn unrelated_glyph_is_ignored() {
        let event = reaction(false, "Party tonight! event_id:abc-123", "\u{1F44D}");
        assert_eq!(classify_reaction(&event), Err(IgnoreReason::UnmappedEmoji));
    }

    #[test_case("\u{2705}", RsvpStatus::Going ; "going")]
    #[test_case("\u{2753}", RsvpStatus::Maybe ; "maybe")]
    #[test_case("\u{274C}", RsvpStatus::Declined ; "declined")]
    fn tracked_message_yields_intent(emoji: &str, status: RsvpStatus) {
        let event = reaction(false, "Party tonight! event_id:abc-123", emoji);
        assert_eq!(
            classify_reaction(&event),
            Ok(RsvpIntent {
                event_id: "abc-123".to_string(),
                status,
            })
        );
    }

    #[test]
    fn only_transient_errors_are_retried() {
        assert!(is_retryable(&DatabaseError::Connection("reset".into())));
        assert!(is_retryable(&DatabaseError::Query("locked".into())));
        assert!(!is_retryable(&DatabaseError::NotFound("event".into())));
        assert!(!is_retryable(&DatabaseError::Conflict("dup".into())));
    }

    #[test]
    fn backoff_grows_linearly() {
        let base = Duration::from_millis(250);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(250));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(750));
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(250));
    }
}

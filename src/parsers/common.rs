use chrono::{DateTime, Utc};

use super::discord_parser::{DECLINED_EMOJI, EVENT_MARKER, GOING_EMOJI, MAYBE_EMOJI};
use crate::db::Event;

/// Discord rejects message content longer than this.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

pub struct AnnouncementFormatter;

impl AnnouncementFormatter {
    /// Renders the announcement posted for an event. The trailing marker is
    /// what makes reactions on the posted message count as RSVPs.
    pub fn announcement(event: &Event) -> String {
        let mut lines = vec![
            "\u{1F4C5} **New event**".to_string(),
            format!("**{}**", MessageUtils::sanitize_markdown(&event.title)),
            format!("\u{1F552} {}", Self::format_time(&event.starts_at)),
        ];
        if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
            lines.push(format!("\u{1F4CD} {}", MessageUtils::sanitize_markdown(location)));
        }
        if let Some(max) = event.max_participants {
            lines.push(format!("Slots: {max}"));
        }
        if !event.description.trim().is_empty() {
            let preview = MessageUtils::preview_text(&event.description, 280);
            lines.push(MessageUtils::sanitize_markdown(&preview));
        }
        lines.push(format!(
            "React {GOING_EMOJI} going, {MAYBE_EMOJI} maybe, {DECLINED_EMOJI} declined"
        ));
        lines.push(format!("{EVENT_MARKER}{}", event.id));

        let text = lines.join("\n");
        if text.chars().count() <= DISCORD_MESSAGE_LIMIT {
            return text;
        }

        // keep the marker intact when trimming
        let marker = format!("\n{EVENT_MARKER}{}", event.id);
        let budget = DISCORD_MESSAGE_LIMIT.saturating_sub(marker.chars().count());
        let head: String = text.chars().take(budget).collect();
        format!("{head}{marker}")
    }

    pub fn format_time(at: &DateTime<Utc>) -> String {
        at.format("%Y-%m-%d %H:%M UTC").to_string()
    }
}

pub struct MessageUtils;

impl MessageUtils {
    /// Escapes markdown emphasis. Escaping `_` also defuses any marker text
    /// typed by users, so only the trailing marker is ever extracted.
    pub fn sanitize_markdown(text: &str) -> String {
        text.replace('*', "\\*")
            .replace('_', "\\_")
            .replace('~', "\\~")
    }

    /// First `max_chars` characters of `text`, with an ellipsis when cut.
    pub fn preview_text(text: &str, max_chars: usize) -> String {
        let trimmed = text.trim();
        if trimmed.chars().count() <= max_chars {
            return trimmed.to_string();
        }
        let mut preview: String = trimmed.chars().take(max_chars).collect();
        preview.push('\u{2026}');
        preview
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::parsers::extract_event_id;

    fn sample_event() -> Event {
        let starts_at = Utc.with_ymd_and_hms(2025, 3, 14, 20, 0, 0).single().expect("valid date");
        Event {
            id: "abc-123".to_string(),
            title: "Savage *prog*".to_string(),
            description: "Bring food".to_string(),
            starts_at,
            ends_at: starts_at,
            location: Some("Aether".to_string()),
            max_participants: Some(8),
            party_id: None,
            created_at: starts_at,
            updated_at: starts_at,
        }
    }

    #[test]
    fn announcement_carries_marker_and_details() {
        let text = AnnouncementFormatter::announcement(&sample_event());

        assert_eq!(extract_event_id(&text), Some("abc-123"));
        assert!(text.contains("Savage \\*prog\\*"));
        assert!(text.contains("2025-03-14 20:00 UTC"));
        assert!(text.contains("Aether"));
        assert!(text.contains("Slots: 8"));
    }

    #[test]
    fn oversized_announcement_keeps_marker() {
        let mut event = sample_event();
        event.title = "x".repeat(3000);
        let text = AnnouncementFormatter::announcement(&event);

        assert!(text.chars().count() <= DISCORD_MESSAGE_LIMIT);
        assert!(text.ends_with("event_id:abc-123"));
    }

    #[test]
    fn marker_text_in_user_fields_does_not_hijack_the_event() {
        let mut event = sample_event();
        event.id = "new-raid".to_string();
        event.title = "Reschedule event_id:title-raid".to_string();
        event.location = Some("event_id:place-raid".to_string());
        event.description = "Moved from event_id:old-raid".to_string();
        let text = AnnouncementFormatter::announcement(&event);

        assert_eq!(extract_event_id(&text), Some("new-raid"));
        assert!(text.contains("Moved from event\\_id:old-raid"));
    }

    #[test]
    fn trimmed_announcement_with_marker_in_description_keeps_own_id() {
        let mut event = sample_event();
        event.id = "new-raid".to_string();
        event.title = "y".repeat(1900);
        event.description = "event_id:old-raid".to_string();
        let text = AnnouncementFormatter::announcement(&event);

        assert!(text.chars().count() <= DISCORD_MESSAGE_LIMIT);
        assert_eq!(extract_event_id(&text), Some("new-raid"));
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(MessageUtils::preview_text("  short  ", 10), "short");
        assert_eq!(MessageUtils::preview_text("ララフェルです", 3), "ララフ\u{2026}");
    }
}

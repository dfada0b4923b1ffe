//! iCalendar export of pending schedule entries.

use chrono::{DateTime, Duration, Utc};

use cadence_core::truncate_chars;

use crate::store::ScheduledContent;
use crate::types::ScheduleStatus;

const EVENT_MINUTES: i64 = 20;
const DESCRIPTION_LIMIT: usize = 1800;
/// Content lines longer than this many octets are folded.
const FOLD_OCTETS: usize = 75;

fn ics_time(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\r', "")
        .replace('\n', "\\n")
        .replace(',', "\\,")
        .replace(';', "\\;")
}

/// Fold a content line so no physical line exceeds 75 octets.
fn fold(line: &str, out: &mut String) {
    let mut width = 0;
    for ch in line.chars() {
        let len = ch.len_utf8();
        if width + len > FOLD_OCTETS {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(ch);
        width += len;
    }
    out.push_str("\r\n");
}

/// Render every still-scheduled entry that has content as a 20 minute event.
pub fn export_ics(entries: &[ScheduledContent], now: DateTime<Utc>) -> String {
    let stamp = ics_time(now);
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "PRODID:-//Cadence//Marketing Schedule//EN".to_string(),
        "CALSCALE:GREGORIAN".to_string(),
        "X-WR-CALNAME:Cadence marketing schedule".to_string(),
    ];

    for entry in entries {
        if entry.schedule.status != ScheduleStatus::Scheduled {
            continue;
        }
        let Some(content) = &entry.content else {
            continue;
        };

        let start = entry.schedule.scheduled_for;
        let title = entry
            .campaign
            .as_ref()
            .map(|c| c.name.as_str())
            .or_else(|| content.hooks.first().map(String::as_str))
            .unwrap_or("content");
        let summary = format!(
            "Publish: {} - {}",
            content.platform.as_str().to_uppercase(),
            title
        );
        let mut description = content.caption.clone();
        if !content.hashtags.is_empty() {
            description.push('\n');
            description.push_str(&content.hashtags.join(" "));
        }

        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:{}@cadence", entry.schedule.id));
        lines.push(format!("DTSTAMP:{stamp}"));
        lines.push(format!("DTSTART:{}", ics_time(start)));
        lines.push(format!(
            "DTEND:{}",
            ics_time(start + Duration::minutes(EVENT_MINUTES))
        ));
        lines.push(format!("SUMMARY:{}", escape(&summary)));
        lines.push(format!(
            "DESCRIPTION:{}",
            escape(&truncate_chars(&description, DESCRIPTION_LIMIT))
        ));
        lines.push("END:VEVENT".to_string());
    }

    lines.push("END:VCALENDAR".to_string());

    let mut out = String::new();
    for line in &lines {
        fold(line, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{CampaignId, ContentId};

    use crate::types::{ContentDraft, ContentItem, Platform, ScheduleEntry};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn entry(caption: &str, status: ScheduleStatus) -> ScheduledContent {
        let now = at("2026-03-02T09:00:00Z");
        let content = ContentItem::new(
            CampaignId::new(),
            ContentDraft {
                platform: Platform::Tiktok,
                hooks: vec!["First hook".into()],
                script: String::new(),
                caption: caption.into(),
                hashtags: vec!["#a".into(), "#b".into()],
                video_prompt: String::new(),
            },
            now,
        );
        let mut schedule = ScheduleEntry::new(content.id, now, now);
        schedule.status = status;
        ScheduledContent {
            schedule,
            content: Some(content),
            campaign: None,
        }
    }

    #[test]
    fn renders_scheduled_events_only() {
        let entries = vec![
            entry("Hello, world; again", ScheduleStatus::Scheduled),
            entry("done", ScheduleStatus::Completed),
        ];
        let ics = export_ics(&entries, at("2026-03-01T00:00:00Z"));

        assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 1);
        assert!(ics.contains("DTSTAMP:20260301T000000Z\r\n"));
        assert!(ics.contains("DTSTART:20260302T090000Z\r\n"));
        assert!(ics.contains("DTEND:20260302T092000Z\r\n"));
        assert!(ics.contains("SUMMARY:Publish: TIKTOK - First hook\r\n"));
        assert!(ics.contains("DESCRIPTION:Hello\\, world\\; again\\n#a #b\r\n"));
    }

    #[test]
    fn entries_without_content_are_skipped() {
        let mut e = entry("x", ScheduleStatus::Scheduled);
        e.content = None;
        e.schedule.content_id = ContentId::new();
        assert!(!export_ics(&[e], Utc::now()).contains("VEVENT"));
    }

    #[test]
    fn long_lines_are_folded() {
        let ics = export_ics(&[entry(&"word ".repeat(200), ScheduleStatus::Scheduled)], Utc::now());
        assert!(ics.split("\r\n").all(|l| l.len() <= FOLD_OCTETS));
        assert!(ics.contains("\r\n "));
    }
}

//! `dumpsys notification` parser.
//!
//! The dump is a nested textual tree, but everything we need sits on
//! individual lines: a record header opens each notification and the
//! interesting fields appear as `key=value` lines below it. Android spells
//! the keys several ways across releases (`tickerText=`, `android.title=`,
//! `pkg=` vs `package=`), so field recognition goes through one lookup
//! instead of per-spelling string scans.

use crate::notification::{NotificationRecord, Snapshot};

/// Header line that opens a new notification block in the dump.
const RECORD_MARKER: &str = "NotificationRecord";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Ticker,
    Title,
    Text,
    Package,
}

/// Map a `key=` spelling to the record field it populates.
fn field_for_key(key: &str) -> Option<Field> {
    match key.trim().trim_start_matches("android.") {
        "tickerText" | "ticker" => Some(Field::Ticker),
        "title" => Some(Field::Title),
        "text" => Some(Field::Text),
        "pkg" | "package" => Some(Field::Package),
        _ => None,
    }
}

/// Parse a raw `dumpsys notification` dump into an ordered snapshot.
///
/// A line containing the record marker closes the block in progress and opens
/// a new one; the marker line itself contributes no fields even though it
/// usually carries an inline `pkg=`. Field values are everything after the
/// first `=` on the trimmed line, verbatim. When a block repeats a field the
/// last occurrence wins. Blocks that never populate a field are dropped, and
/// an empty or garbage dump parses to an empty snapshot.
pub fn parse_notification_dump(dump: &str) -> Snapshot {
    let mut records = Vec::new();
    let mut open: Option<NotificationRecord> = None;

    for line in dump.lines() {
        let line = line.trim();
        if line.contains(RECORD_MARKER) {
            if let Some(record) = open.take() {
                if !record.is_blank() {
                    records.push(record);
                }
            }
            open = Some(NotificationRecord::new());
            continue;
        }
        let Some(record) = open.as_mut() else {
            continue;
        };
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        match field_for_key(key) {
            Some(Field::Ticker) => record.ticker = Some(value.to_string()),
            Some(Field::Title) => record.title = Some(value.to_string()),
            Some(Field::Text) => record.text = Some(value.to_string()),
            Some(Field::Package) => record.package = Some(value.to_string()),
            None => {}
        }
    }
    if let Some(record) = open {
        if !record.is_blank() {
            records.push(record);
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOLDEN_TWO_RECORDS: &str = r#"
  NotificationRecord(0x9e145c8: pkg=com.whatsapp user=UserHandle{0} id=1 tag=null score=10)
      uid=10133 opPkg=com.whatsapp
      pkg=com.whatsapp
      tickerText=Sam: hey, are you free?
      android.title=Sam
      android.text=hey, are you free?
      sound=null
  NotificationRecord(0x81d2aa0: pkg=org.telegram.messenger user=UserHandle{0} id=7 tag=null score=0)
      uid=10201 opPkg=org.telegram.messenger
      pkg=org.telegram.messenger
      android.title=Ana
      android.text=lunch tomorrow?
"#;

    const GOLDEN_SPARSE_RECORD: &str = r#"
  NotificationRecord(0x11aa: pkg=com.android.systemui user=UserHandle{0})
      pkg=com.android.systemui
      flags=0x62
"#;

    #[test]
    fn golden_two_records() {
        let snapshot = parse_notification_dump(GOLDEN_TWO_RECORDS);
        assert_eq!(snapshot.len(), 2);

        let first = &snapshot[0];
        assert_eq!(first.ticker.as_deref(), Some("Sam: hey, are you free?"));
        assert_eq!(first.title.as_deref(), Some("Sam"));
        assert_eq!(first.text.as_deref(), Some("hey, are you free?"));
        assert_eq!(first.package.as_deref(), Some("com.whatsapp"));

        let second = &snapshot[1];
        assert_eq!(second.title.as_deref(), Some("Ana"));
        assert_eq!(second.text.as_deref(), Some("lunch tomorrow?"));
        assert_eq!(second.package.as_deref(), Some("org.telegram.messenger"));
        assert_eq!(second.ticker, None);
    }

    #[test]
    fn golden_sparse_record_keeps_known_fields_only() {
        let snapshot = parse_notification_dump(GOLDEN_SPARSE_RECORD);
        assert_eq!(snapshot.len(), 1);
        let record = &snapshot[0];
        assert_eq!(record.package.as_deref(), Some("com.android.systemui"));
        assert!(record.title.is_none());
        assert!(record.text.is_none());
        assert!(record.ticker.is_none());
    }

    #[test]
    fn empty_dump_parses_to_empty_snapshot() {
        assert!(parse_notification_dump("").is_empty());
    }

    #[test]
    fn garbage_dump_parses_to_empty_snapshot() {
        let dump = "Currently suspended profiles:\n  mRankingThread=ranker\nno records here";
        assert!(parse_notification_dump(dump).is_empty());
    }

    #[test]
    fn field_lines_outside_any_record_are_ignored() {
        let dump = "title=orphan\nNotificationRecord(0x1)\n  title=kept";
        let snapshot = parse_notification_dump(dump);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].title.as_deref(), Some("kept"));
    }

    #[test]
    fn value_is_everything_after_first_equals() {
        let dump = "NotificationRecord(0x1)\n  android.text=score=42 and a=b";
        let snapshot = parse_notification_dump(dump);
        assert_eq!(snapshot[0].text.as_deref(), Some("score=42 and a=b"));
    }

    #[test]
    fn marker_line_contributes_no_fields() {
        // the header carries pkg= inline; only indented field lines count
        let dump = "NotificationRecord(0x1: pkg=com.whatsapp user=0)\n  android.title=Sam";
        let snapshot = parse_notification_dump(dump);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].package, None);
        assert_eq!(snapshot[0].title.as_deref(), Some("Sam"));
    }

    #[test]
    fn blank_blocks_are_dropped() {
        let dump = "NotificationRecord(0x1)\n  flags=0x62\nNotificationRecord(0x2)\n  android.title=Sam";
        let snapshot = parse_notification_dump(dump);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].title.as_deref(), Some("Sam"));
    }

    #[test]
    fn repeated_field_takes_last_occurrence() {
        let dump = "NotificationRecord(0x1)\n  android.title=first\n  title=second";
        let snapshot = parse_notification_dump(dump);
        assert_eq!(snapshot[0].title.as_deref(), Some("second"));
    }

    #[test]
    fn order_follows_the_dump() {
        let dump = "NotificationRecord(0x1)\n  android.title=A\nNotificationRecord(0x2)\n  android.title=B\nNotificationRecord(0x3)\n  android.title=C";
        let titles: Vec<_> = parse_notification_dump(dump)
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(
            titles,
            vec![Some("A".into()), Some("B".into()), Some("C".into())]
        );
    }
}

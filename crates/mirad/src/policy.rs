//! Notification handling policy.
//!
//! Pure decisions only: given one fresh record and the screen state, work
//! out what to speak and what to reply. Side effects stay in the monitor.
//! Speaking and replying are independent; either, both, or neither fires.

use mira_common::parsers::power::ScreenState;
use mira_common::NotificationRecord;
use rand::Rng;

/// Packages that get a canned auto-reply.
pub const MESSAGING_APPS: [&str; 4] = [
    "com.whatsapp",
    "com.instagram.android",
    "com.facebook.orca",
    "org.telegram.messenger",
];

/// Spoken-name lookup for packages worth announcing by name. Everything else
/// is announced by its raw package id.
const APP_LABELS: [(&str, &str); 5] = [
    ("com.whatsapp", "WhatsApp"),
    ("com.instagram.android", "Instagram"),
    ("com.facebook.orca", "Messenger"),
    ("com.android.messaging", "Messages"),
    ("com.google.android.gm", "Gmail"),
];

const GREETING_KEYWORDS: [&str; 4] = ["hi", "hello", "hey", "namaste"];
const QUESTION_KEYWORDS: [&str; 5] = ["how", "what", "when", "where", "why"];

/// Longest message excerpt a spoken line will carry.
const SPOKEN_TEXT_LIMIT: usize = 50;

const GREETING_REPLIES: [&str; 3] = [
    "Hello {sender}! This is Mira, the boss's assistant.",
    "Hi {sender}! The boss is tied up right now, I will let them know you wrote.",
    "Hello! Mira here. I will pass your message straight to the boss.",
];

const QUESTION_REPLIES: [&str; 3] = [
    "Let me check with the boss and get back to you.",
    "I will ask the boss and send you the answer soon.",
    "Good question. I will find out from the boss and reply here.",
];

const DEFAULT_REPLIES: [&str; 3] = [
    "Thanks {sender}! I will show your message to the boss.",
    "Got it, {sender}. Passing this on to the boss.",
    "Noted, {sender}. The boss will get back to you soon.",
];

/// Category of an incoming message body, checked in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCategory {
    Greeting,
    Question,
    Other,
}

/// Planned side effects for one fresh record.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationActions {
    /// Line to speak, present only while the screen is off.
    pub spoken: Option<String>,
    /// Canned reply, present only for allow-listed messaging apps.
    pub reply: Option<PlannedReply>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedReply {
    pub package: String,
    pub sender: String,
    pub text: String,
}

/// Decide everything the monitor should do with one record.
pub fn plan_actions(record: &NotificationRecord, screen: ScreenState) -> NotificationActions {
    let spoken = screen.is_off().then(|| spoken_line(record));
    let reply = wants_auto_reply(record).then(|| {
        let sender = sender_of(record.title.as_deref().unwrap_or(""));
        let body = record.text.as_deref().unwrap_or("");
        PlannedReply {
            package: record.package.clone().unwrap_or_default(),
            sender: sender.to_string(),
            text: reply_for(classify_message(body), sender),
        }
    });
    NotificationActions { spoken, reply }
}

/// Auto-reply is a pure package allow-list check; a record without a package
/// never qualifies.
pub fn wants_auto_reply(record: &NotificationRecord) -> bool {
    record
        .package
        .as_deref()
        .map_or(false, |package| MESSAGING_APPS.contains(&package))
}

/// Classify by case-insensitive substring. Greetings win over questions, so
/// "hi, how are you" greets back instead of deflecting the question.
pub fn classify_message(text: &str) -> ReplyCategory {
    let lower = text.to_lowercase();
    if GREETING_KEYWORDS.iter().any(|k| lower.contains(k)) {
        ReplyCategory::Greeting
    } else if QUESTION_KEYWORDS.iter().any(|k| lower.contains(k)) {
        ReplyCategory::Question
    } else {
        ReplyCategory::Other
    }
}

/// Render a reply for the category, choosing uniformly among its templates.
pub fn reply_for(category: ReplyCategory, sender: &str) -> String {
    let bucket = match category {
        ReplyCategory::Greeting => &GREETING_REPLIES,
        ReplyCategory::Question => &QUESTION_REPLIES,
        ReplyCategory::Other => &DEFAULT_REPLIES,
    };
    let template = bucket[rand::thread_rng().gen_range(0..bucket.len())];
    template.replace("{sender}", sender)
}

/// The sender is the title up to the first colon; group chats title messages
/// as "Sender: body".
pub fn sender_of(title: &str) -> &str {
    match title.split_once(':') {
        Some((sender, _)) => sender,
        None => title,
    }
}

/// Spoken announcement for a record. Falls back to a generic line when the
/// record is too bare to name an app and sender.
pub fn spoken_line(record: &NotificationRecord) -> String {
    let label = record.package.as_deref().map(app_label).unwrap_or("");
    match record.title.as_deref() {
        Some(title) if !label.is_empty() && !title.is_empty() => {
            let mut line = format!("New message from {title} on {label}");
            if let Some(text) = record.text.as_deref() {
                if !text.is_empty() {
                    line.push_str(": ");
                    line.push_str(&truncate_chars(text, SPOKEN_TEXT_LIMIT));
                }
            }
            line
        }
        _ => "You have a new notification".to_string(),
    }
}

/// Friendly app name, or the package id itself when unknown.
pub fn app_label(package: &str) -> &str {
    APP_LABELS
        .iter()
        .find(|(candidate, _)| *candidate == package)
        .map(|(_, label)| *label)
        .unwrap_or(package)
}

/// First `limit` characters, never splitting a char.
fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn whatsapp(title: &str, text: &str) -> NotificationRecord {
        NotificationRecord::new()
            .with_title(title)
            .with_text(text)
            .with_package("com.whatsapp")
    }

    #[test]
    fn messaging_apps_get_a_reply() {
        for package in MESSAGING_APPS {
            let record = NotificationRecord::new()
                .with_title("Sam")
                .with_text("hi there")
                .with_package(package);
            assert!(wants_auto_reply(&record), "{package} should auto-reply");
        }
    }

    #[test]
    fn unknown_and_absent_packages_get_no_reply() {
        let gmail = NotificationRecord::new()
            .with_title("Sam")
            .with_text("hi")
            .with_package("com.google.android.gm");
        assert!(!wants_auto_reply(&gmail));
        let bare = NotificationRecord::new().with_title("Sam").with_text("hi");
        assert!(!wants_auto_reply(&bare));
    }

    #[test]
    fn greeting_beats_question() {
        assert_eq!(classify_message("hi, how are you?"), ReplyCategory::Greeting);
        assert_eq!(classify_message("HOW did it go"), ReplyCategory::Question);
        assert_eq!(classify_message("see you tomorrow"), ReplyCategory::Other);
    }

    #[test]
    fn classification_is_substring_based() {
        // "this" contains "hi"; the loose match is intentional
        assert_eq!(classify_message("This party is great"), ReplyCategory::Greeting);
        assert_eq!(classify_message("somewhere else"), ReplyCategory::Question);
    }

    #[test]
    fn replies_come_from_the_matching_bucket() {
        for _ in 0..20 {
            let reply = reply_for(ReplyCategory::Greeting, "Sam");
            assert!(
                GREETING_REPLIES
                    .iter()
                    .any(|t| t.replace("{sender}", "Sam") == reply),
                "unexpected greeting reply: {reply}"
            );
        }
        let reply = reply_for(ReplyCategory::Question, "Sam");
        assert!(QUESTION_REPLIES.contains(&reply.as_str()));
    }

    #[test]
    fn sender_stops_at_the_first_colon() {
        assert_eq!(sender_of("Sam: hello"), "Sam");
        assert_eq!(sender_of("Family group: Sam: hello"), "Family group");
        assert_eq!(sender_of("Sam"), "Sam");
        assert_eq!(sender_of(""), "");
    }

    #[test]
    fn plan_speaks_only_while_screen_is_off() {
        let record = whatsapp("Sam", "hi there");
        let off = plan_actions(&record, ScreenState::Off);
        assert!(off.spoken.is_some());
        assert!(off.reply.is_some());

        let on = plan_actions(&record, ScreenState::On);
        assert!(on.spoken.is_none());
        assert!(on.reply.is_some(), "reply does not depend on the screen");
    }

    #[test]
    fn planned_reply_names_the_sender_and_package() {
        let record = whatsapp("Sam: hey", "hi there");
        let actions = plan_actions(&record, ScreenState::On);
        let reply = actions.reply.unwrap();
        assert_eq!(reply.package, "com.whatsapp");
        assert_eq!(reply.sender, "Sam");
        assert!(
            GREETING_REPLIES
                .iter()
                .any(|t| t.replace("{sender}", "Sam") == reply.text)
        );
    }

    #[test]
    fn spoken_line_names_app_and_sender() {
        let record = whatsapp("Sam", "are we still on for six?");
        assert_eq!(
            spoken_line(&record),
            "New message from Sam on WhatsApp: are we still on for six?"
        );
    }

    #[test]
    fn spoken_line_truncates_long_bodies_on_char_boundaries() {
        let long = "a".repeat(80);
        let record = whatsapp("Sam", &long);
        let line = spoken_line(&record);
        assert!(line.ends_with(&"a".repeat(50)));
        assert!(!line.contains(&"a".repeat(51)));

        let emoji = "😀".repeat(60);
        let record = whatsapp("Sam", &emoji);
        let line = spoken_line(&record);
        assert!(line.ends_with(&"😀".repeat(50)));
    }

    #[test]
    fn spoken_line_without_text_skips_the_excerpt() {
        let record = NotificationRecord::new()
            .with_title("Sam")
            .with_package("com.whatsapp");
        assert_eq!(spoken_line(&record), "New message from Sam on WhatsApp");
    }

    #[test]
    fn bare_records_get_the_generic_line() {
        let no_title = NotificationRecord::new().with_package("com.whatsapp");
        assert_eq!(spoken_line(&no_title), "You have a new notification");
        let no_package = NotificationRecord::new().with_title("Sam").with_text("hi");
        assert_eq!(spoken_line(&no_package), "You have a new notification");
    }

    #[test]
    fn an_empty_title_also_gets_the_generic_line() {
        // a bare "android.title=" dump line comes through as Some("")
        let record = whatsapp("", "hi there");
        assert_eq!(spoken_line(&record), "You have a new notification");
    }

    #[test]
    fn labels_cover_announced_apps_and_fall_back_to_the_package() {
        assert_eq!(app_label("com.whatsapp"), "WhatsApp");
        assert_eq!(app_label("com.google.android.gm"), "Gmail");
        // replied to, but spoken by package id
        assert_eq!(app_label("org.telegram.messenger"), "org.telegram.messenger");
    }
}

//! Console reply generation.
//!
//! `Responder` is the seam a remote AI backend would plug into. The default
//! implementation is rule-based and total: it always answers, first from
//! promoted patterns in memory, then from keyword buckets, and it feeds
//! every exchange back into the learning log.

use std::sync::Arc;

use async_trait::async_trait;
use mira_common::memory::ContextSnapshot;
use mira_common::MemoryStore;
use rand::Rng;

/// Keys commands on their first 50 characters, like the learning log.
const LEARNING_KEY_LIMIT: usize = 50;

const GREETING_KEYWORDS: [&str; 4] = ["hi", "hello", "hey", "namaste"];
const TIME_KEYWORDS: [&str; 2] = ["time", "clock"];
const DATE_KEYWORDS: [&str; 2] = ["date", "today"];

const GREETING_RESPONSES: [&str; 3] = [
    "Hello! How are you today?",
    "Hi there. Good to see you.",
    "Hello! Mira at your service.",
];

const TIME_RESPONSES: [&str; 3] = [
    "It is {time}.",
    "The time is {time}.",
    "{time} right now.",
];

const DATE_RESPONSES: [&str; 3] = [
    "Today is {date}.",
    "It is {date} today.",
    "The date is {date}.",
];

const DEFAULT_RESPONSES: [&str; 3] = [
    "Understood: \"{input}\". I will take care of it.",
    "Got it: \"{input}\".",
    "Noted: \"{input}\". Working on it.",
];

#[async_trait]
pub trait Responder: Send + Sync {
    /// Produce a reply to one console line. Implementations always answer.
    async fn generate_reply(&self, input: &str, context: &ContextSnapshot) -> String;
}

pub struct RuleBasedResponder {
    store: Arc<MemoryStore>,
}

impl RuleBasedResponder {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    fn rule_reply(&self, input: &str, context: &ContextSnapshot) -> String {
        let lower = input.to_lowercase();
        if GREETING_KEYWORDS.iter().any(|k| lower.contains(k)) {
            return pick(&GREETING_RESPONSES).to_string();
        }
        if TIME_KEYWORDS.iter().any(|k| lower.contains(k)) {
            return pick(&TIME_RESPONSES).replace("{time}", &context.time);
        }
        if DATE_KEYWORDS.iter().any(|k| lower.contains(k)) {
            return pick(&DATE_RESPONSES).replace("{date}", &context.date);
        }
        pick(&DEFAULT_RESPONSES).replace("{input}", input)
    }
}

#[async_trait]
impl Responder for RuleBasedResponder {
    async fn generate_reply(&self, input: &str, context: &ContextSnapshot) -> String {
        let reply = match self.store.recall_pattern(input) {
            Some(learned) => learned,
            None => self.rule_reply(input, context),
        };
        if self.store.settings().learning_enabled {
            let key: String = input.chars().take(LEARNING_KEY_LIMIT).collect();
            self.store.add_learning(&key, &reply);
        }
        reply
    }
}

fn pick(bucket: &[&'static str]) -> &'static str {
    bucket[rand::thread_rng().gen_range(0..bucket.len())]
}

//! Background self-improvement.
//!
//! Once an hour the daemon mines recent conversations for recurring command
//! prefixes, promotes the dominant response for each into the pattern table,
//! compacts over-long learning lists, appends an audit entry and refreshes
//! the critical backup. A failed pass sleeps the error backoff on top of
//! the regular interval before the next attempt.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use mira_common::memory::{pattern_key, ConversationEntry, EvolutionEntry, MemoryStore, PatternEntry};

use crate::config::EvolutionConfig;

/// How many recent exchanges one pass looks at.
const ANALYSIS_WINDOW: usize = 100;

/// Below this many exchanges there is nothing worth mining.
const MIN_CONVERSATIONS: usize = 10;

/// A prefix must recur this often within the window to be promoted.
const MIN_PATTERN_USES: usize = 3;

/// Learning lists are compacted down to this many entries per key.
const MAX_LEARNING_ENTRIES: usize = 10;

/// Version prefix for audit entries; the suffix counts completed passes.
const VERSION_BASE: &str = "1.0";

/// What one pass accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvolutionReport {
    pub analyzed: usize,
    pub promoted: usize,
}

pub struct EvolutionEngine {
    store: Arc<MemoryStore>,
    cfg: EvolutionConfig,
}

impl EvolutionEngine {
    pub fn new(store: Arc<MemoryStore>, cfg: EvolutionConfig) -> Self {
        Self { store, cfg }
    }

    /// Run forever on the configured cadence. The task is fire-and-forget;
    /// it dies with the runtime.
    pub async fn run(self) {
        info!("evolution engine started (pass every {:?})", self.cfg.interval());
        loop {
            tokio::time::sleep(self.cfg.interval()).await;
            match self.evolve() {
                Ok(report) => info!(
                    "evolution pass done: {} exchanges analyzed, {} patterns promoted",
                    report.analyzed, report.promoted
                ),
                Err(err) => {
                    warn!("evolution pass failed: {err:#}");
                    tokio::time::sleep(self.cfg.error_backoff()).await;
                }
            }
        }
    }

    /// One full pass over the store.
    pub fn evolve(&self) -> Result<EvolutionReport> {
        let window = self.store.recent_conversations(ANALYSIS_WINDOW);
        let analyzed = window.len();
        let mined = mine_patterns(&window, self.store.conversation_count());
        let promoted = mined.len();
        self.store.absorb_patterns(mined);
        self.store.compact_learnings(MAX_LEARNING_ENTRIES);
        self.store.record_evolution(EvolutionEntry {
            timestamp: Utc::now(),
            conversations_count: self.store.conversation_count(),
            patterns_learned: self.store.learned_pattern_count(),
            version: format!("{VERSION_BASE}.{}", self.store.evolution_cycles()),
        });
        self.store.write_critical_backup()?;
        Ok(EvolutionReport { analyzed, promoted })
    }
}

/// Mine recurring two-word command prefixes from a window of exchanges and
/// pair each with its most frequent response. Confidence is the share of all
/// stored exchanges that used the prefix. Ties on response frequency go to
/// the earliest response, which keeps the result deterministic.
fn mine_patterns(
    window: &[ConversationEntry],
    total_conversations: usize,
) -> Vec<(String, PatternEntry)> {
    if window.len() < MIN_CONVERSATIONS {
        return Vec::new();
    }
    let mut responses_by_prefix: HashMap<String, Vec<&str>> = HashMap::new();
    for exchange in window {
        if let Some(key) = pattern_key(&exchange.user) {
            responses_by_prefix
                .entry(key)
                .or_default()
                .push(&exchange.assistant);
        }
    }
    let mut promoted: Vec<(String, PatternEntry)> = responses_by_prefix
        .into_iter()
        .filter(|(_, responses)| responses.len() >= MIN_PATTERN_USES)
        .map(|(key, responses)| {
            let uses = responses.len();
            let response = dominant_response(&responses).to_string();
            let confidence = uses as f64 / total_conversations.max(1) as f64;
            (
                key,
                PatternEntry {
                    response,
                    confidence,
                    last_used: Utc::now(),
                },
            )
        })
        .collect();
    promoted.sort_by(|a, b| a.0.cmp(&b.0));
    promoted
}

fn dominant_response<'a>(responses: &[&'a str]) -> &'a str {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for &response in responses {
        *counts.entry(response).or_insert(0) += 1;
    }
    let mut best = responses[0];
    let mut best_count = 0;
    for &response in responses {
        let count = counts[response];
        if count > best_count {
            best = response;
            best_count = count;
        }
    }
    best
}

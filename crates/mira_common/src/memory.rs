//! Persisted assistant memory.
//!
//! Everything the daemon remembers lives in one JSON document under the
//! state directory. The store keeps the whole document in memory behind a
//! mutex and rewrites the file on every append, backup copy first, so the
//! worst crash loses one write and never both copies. All sequences are
//! bounded; retention is a sliding window that discards the oldest entries.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::notification::NotificationRecord;

/// Retention caps. Appends past a cap evict the oldest entries.
pub const MAX_CONVERSATIONS: usize = 500;
pub const MAX_NOTIFICATIONS: usize = 100;
pub const MAX_EVOLUTION_ENTRIES: usize = 100;

/// How many recent exchanges a context snapshot carries.
const CONTEXT_EXCHANGES: usize = 5;

/// One console exchange, with the context it happened in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub assistant: String,
    #[serde(default)]
    pub context: ContextSnapshot,
}

/// Lightweight situational context captured alongside an exchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub time: String,
    pub date: String,
    #[serde(default)]
    pub recent: Vec<ExchangeSummary>,
}

/// A past exchange reduced to its two lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeSummary {
    pub user: String,
    pub assistant: String,
}

/// One remembered response for a command prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningEntry {
    pub response: String,
    pub timestamp: DateTime<Utc>,
    pub used_count: u32,
}

/// A pattern the evolution pass promoted from raw learnings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub response: String,
    pub confidence: f64,
    pub last_used: DateTime<Utc>,
}

/// Audit record of one completed evolution pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionEntry {
    pub timestamp: DateTime<Utc>,
    pub conversations_count: usize,
    pub patterns_learned: usize,
    pub version: String,
}

/// Evolution bookkeeping that survives resets of the conversational log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionData {
    pub version: String,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub upgrades: Vec<serde_json::Value>,
}

impl Default for EvolutionData {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            created: Utc::now(),
            upgrades: Vec::new(),
        }
    }
}

/// Persisted feature toggles. These ride along in the document so a fresh
/// install starts fully enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_true")]
    pub auto_reply: bool,
    #[serde(default = "default_true")]
    pub voice_enabled: bool,
    #[serde(default = "default_true")]
    pub learning_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_reply: true,
            voice_enabled: true,
            learning_enabled: true,
        }
    }
}

/// The whole persisted document. Every field defaults so documents written
/// by older builds keep loading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub conversations: Vec<ConversationEntry>,
    #[serde(default)]
    pub notifications: Vec<NotificationRecord>,
    #[serde(default)]
    pub learnings: HashMap<String, Vec<LearningEntry>>,
    #[serde(default)]
    pub learned_patterns: HashMap<String, Vec<PatternEntry>>,
    #[serde(default)]
    pub user_preferences: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub evolution_data: EvolutionData,
    #[serde(default)]
    pub evolution_history: Vec<EvolutionEntry>,
    #[serde(default)]
    pub settings: Settings,
}

impl PersistedState {
    fn context(&self) -> ContextSnapshot {
        let now = Local::now();
        let start = self.conversations.len().saturating_sub(CONTEXT_EXCHANGES);
        ContextSnapshot {
            time: now.format("%H:%M").to_string(),
            date: now.format("%Y-%m-%d").to_string(),
            recent: self.conversations[start..]
                .iter()
                .map(|c| ExchangeSummary {
                    user: c.user.clone(),
                    assistant: c.assistant.clone(),
                })
                .collect(),
        }
    }
}

/// Subset of the state worth keeping even if the main document is lost.
#[derive(Serialize)]
struct CriticalState<'a> {
    learned_patterns: &'a HashMap<String, Vec<PatternEntry>>,
    user_preferences: &'a HashMap<String, serde_json::Value>,
    evolution_data: &'a EvolutionData,
}

/// Normalized two-word prefix used as the learning key for a command.
/// Commands shorter than three words are too generic to key on.
pub fn pattern_key(input: &str) -> Option<String> {
    let words: Vec<&str> = input.split_whitespace().collect();
    if words.len() <= 2 {
        return None;
    }
    Some(format!("{} {}", words[0], words[1]).to_lowercase())
}

fn clamp_tail<T>(entries: &mut Vec<T>, cap: usize) {
    if entries.len() > cap {
        let excess = entries.len() - cap;
        entries.drain(..excess);
    }
}

/// Thread-safe handle over the persisted document.
///
/// Mutating methods hold the lock across both the in-memory change and the
/// file rewrite, so concurrent writers (monitor, console, evolution, the
/// periodic flush) serialize cleanly and every file on disk is some complete
/// prior state. A failed rewrite is logged and retried by whichever write
/// comes next; the in-memory change always sticks.
pub struct MemoryStore {
    path: PathBuf,
    backup_path: PathBuf,
    critical_path: PathBuf,
    state: Mutex<PersistedState>,
}

impl MemoryStore {
    /// Open the store at `path`, falling back to a fresh default state when
    /// the file is missing or unreadable. Never fails: a corrupt document
    /// costs history, not the daemon.
    pub fn open(path: PathBuf) -> Self {
        let state = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<PersistedState>(&raw) {
                Ok(state) => state,
                Err(err) => {
                    warn!("memory file {} is unreadable ({err}), starting fresh", path.display());
                    PersistedState::default()
                }
            },
            Err(_) => {
                info!("no memory file at {}, starting fresh", path.display());
                PersistedState::default()
            }
        };
        if let Some(parent) = path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                warn!("could not create state directory {}: {err}", parent.display());
            }
        }
        let backup_path = sibling_with_suffix(&path, ".backup");
        let critical_path = path.with_extension("critical.backup");
        Self {
            path,
            backup_path,
            critical_path,
            state: Mutex::new(state),
        }
    }

    /// Append one notification record, evicting the oldest past the cap.
    pub fn add_notification(&self, record: &NotificationRecord) {
        let mut state = self.state.lock().unwrap();
        state.notifications.push(record.clone());
        clamp_tail(&mut state.notifications, MAX_NOTIFICATIONS);
        self.autosave(&state);
    }

    /// Append one console exchange. The stored context reflects the state
    /// before this exchange.
    pub fn add_conversation(&self, user: &str, assistant: &str) {
        let mut state = self.state.lock().unwrap();
        let context = state.context();
        state.conversations.push(ConversationEntry {
            timestamp: Utc::now(),
            user: user.to_string(),
            assistant: assistant.to_string(),
            context,
        });
        clamp_tail(&mut state.conversations, MAX_CONVERSATIONS);
        self.autosave(&state);
    }

    /// Remember one response under a raw learning key.
    pub fn add_learning(&self, pattern: &str, response: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .learnings
            .entry(pattern.to_string())
            .or_default()
            .push(LearningEntry {
                response: response.to_string(),
                timestamp: Utc::now(),
                used_count: 0,
            });
        self.autosave(&state);
    }

    /// How many responses are remembered under a raw learning key.
    pub fn learning_entries(&self, pattern: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.learnings.get(pattern).map_or(0, Vec::len)
    }

    /// Latest promoted response for a command, if its prefix was ever learned.
    pub fn recall_pattern(&self, input: &str) -> Option<String> {
        let key = pattern_key(input)?;
        let state = self.state.lock().unwrap();
        state
            .learned_patterns
            .get(&key)
            .and_then(|entries| entries.last())
            .map(|entry| entry.response.clone())
    }

    /// Store a batch of promoted patterns in one critical section.
    pub fn absorb_patterns(&self, patterns: Vec<(String, PatternEntry)>) {
        if patterns.is_empty() {
            return;
        }
        let mut state = self.state.lock().unwrap();
        for (key, entry) in patterns {
            state.learned_patterns.entry(key).or_default().push(entry);
        }
        self.autosave(&state);
    }

    /// Distinct command prefixes in the promoted pattern table.
    pub fn learned_pattern_count(&self) -> usize {
        self.state.lock().unwrap().learned_patterns.len()
    }

    /// Trim every learning list down to its `keep` most recent entries.
    pub fn compact_learnings(&self, keep: usize) {
        let mut state = self.state.lock().unwrap();
        let mut compacted = false;
        for entries in state.learnings.values_mut() {
            if entries.len() > keep {
                clamp_tail(entries, keep);
                compacted = true;
            }
        }
        if compacted {
            self.autosave(&state);
        }
    }

    /// Append one evolution audit entry, evicting the oldest past the cap.
    pub fn record_evolution(&self, entry: EvolutionEntry) {
        let mut state = self.state.lock().unwrap();
        state.evolution_history.push(entry);
        clamp_tail(&mut state.evolution_history, MAX_EVOLUTION_ENTRIES);
        self.autosave(&state);
    }

    /// Completed evolution passes so far.
    pub fn evolution_cycles(&self) -> usize {
        self.state.lock().unwrap().evolution_history.len()
    }

    /// Copy of the evolution audit log, oldest first.
    pub fn evolution_history(&self) -> Vec<EvolutionEntry> {
        self.state.lock().unwrap().evolution_history.clone()
    }

    pub fn conversation_count(&self) -> usize {
        self.state.lock().unwrap().conversations.len()
    }

    pub fn notification_count(&self) -> usize {
        self.state.lock().unwrap().notifications.len()
    }

    /// Copy of the stored notifications, oldest first.
    pub fn notifications(&self) -> Vec<NotificationRecord> {
        self.state.lock().unwrap().notifications.clone()
    }

    /// The `n` most recent exchanges, oldest first.
    pub fn recent_conversations(&self, n: usize) -> Vec<ConversationEntry> {
        let state = self.state.lock().unwrap();
        let start = state.conversations.len().saturating_sub(n);
        state.conversations[start..].to_vec()
    }

    /// Case-insensitive search over both sides of every stored exchange.
    pub fn search_conversations(&self, query: &str) -> Vec<ConversationEntry> {
        let needle = query.to_lowercase();
        let state = self.state.lock().unwrap();
        state
            .conversations
            .iter()
            .filter(|c| {
                c.user.to_lowercase().contains(&needle)
                    || c.assistant.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// Context snapshot for the next exchange.
    pub fn context(&self) -> ContextSnapshot {
        self.state.lock().unwrap().context()
    }

    pub fn settings(&self) -> Settings {
        self.state.lock().unwrap().settings.clone()
    }

    /// Rewrite both files from the current state.
    pub fn flush(&self) -> Result<()> {
        let state = self.state.lock().unwrap();
        self.write_files(&state)
    }

    /// Write the critical subset to its own sibling file. Unlike the main
    /// document this is never cycled through a backup; it is small and each
    /// rewrite is complete.
    pub fn write_critical_backup(&self) -> Result<()> {
        let state = self.state.lock().unwrap();
        let critical = CriticalState {
            learned_patterns: &state.learned_patterns,
            user_preferences: &state.user_preferences,
            evolution_data: &state.evolution_data,
        };
        let json = serde_json::to_string_pretty(&critical).context("serialize critical state")?;
        fs::write(&self.critical_path, json)
            .with_context(|| format!("write critical backup {}", self.critical_path.display()))?;
        Ok(())
    }

    fn autosave(&self, state: &PersistedState) {
        if let Err(err) = self.write_files(state) {
            warn!("memory flush failed, keeping in-memory state: {err:#}");
        }
    }

    /// Backup first, then the primary, both from the same in-memory state.
    /// A crash between the two writes leaves the backup holding a complete
    /// document.
    fn write_files(&self, state: &PersistedState) -> Result<()> {
        let json = serde_json::to_string_pretty(state).context("serialize memory state")?;
        if self.path.exists() {
            fs::write(&self.backup_path, &json)
                .with_context(|| format!("write backup {}", self.backup_path.display()))?;
        }
        fs::write(&self.path, json)
            .with_context(|| format!("write memory file {}", self.path.display()))?;
        Ok(())
    }
}

/// `memory.json` -> `memory.json.backup` (appends, unlike `with_extension`).
fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

//! Interactive console on stdin.
//!
//! Keeps the daemon conversational while the monitor works in the
//! background. The console is also the second concurrent writer to the
//! memory store; the store serializes its own critical sections, so nothing
//! here needs to coordinate with the monitor.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use mira_common::MemoryStore;

use crate::device::{keycode, DeviceChannel};
use crate::responder::Responder;

/// Stock notes app used by the `note` command.
const NOTES_APP: &str = "com.google.android.keep";

/// Where the new-note button sits in the stock layout.
const NEW_NOTE_TAP: (u32, u32) = (100, 100);

const EXIT_COMMANDS: [&str; 3] = ["exit", "quit", "stop"];

fn is_exit(input: &str) -> bool {
    EXIT_COMMANDS.contains(&input.to_lowercase().as_str())
}

pub struct Console<R: Responder> {
    device: Arc<dyn DeviceChannel>,
    store: Arc<MemoryStore>,
    responder: R,
}

impl<R: Responder> Console<R> {
    pub fn new(device: Arc<dyn DeviceChannel>, store: Arc<MemoryStore>, responder: R) -> Self {
        Self {
            device,
            store,
            responder,
        }
    }

    /// Read commands until an exit command, end of input, or Ctrl-C.
    pub async fn run(self) -> Result<()> {
        println!("Mira is listening. Commands: open <package>, note <text>, search <query>, exit.");
        println!("Anything else is answered directly.");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received");
                    break;
                }
                line = lines.next_line() => {
                    let Some(line) = line.context("read console input")? else {
                        info!("console input closed");
                        break;
                    };
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    if is_exit(input) {
                        println!("Goodbye.");
                        break;
                    }
                    self.handle(input).await;
                }
            }
        }
        Ok(())
    }

    async fn handle(&self, input: &str) {
        if let Some(package) = input.strip_prefix("open ") {
            let package = package.trim();
            println!("Opening {package} on the device.");
            self.device.open_app(package).await;
            return;
        }
        if let Some(text) = input.strip_prefix("note ") {
            self.take_note(text.trim()).await;
            return;
        }
        if let Some(query) = input.strip_prefix("search ") {
            self.search(query.trim());
            return;
        }
        let context = self.store.context();
        let reply = self.responder.generate_reply(input, &context).await;
        println!("mira: {reply}");
        self.store.add_conversation(input, &reply);
    }

    /// Jot a note into the notes app on the device.
    async fn take_note(&self, text: &str) {
        self.device.open_app(NOTES_APP).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        self.device.tap(NEW_NOTE_TAP.0, NEW_NOTE_TAP.1).await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        self.device.type_text(text).await;
        self.device.key_event(keycode::BACK).await;
        println!("Saved a note ({} chars).", text.chars().count());
    }

    fn search(&self, query: &str) {
        let hits = self.store.search_conversations(query);
        if hits.is_empty() {
            println!("Nothing remembered about \"{query}\".");
            return;
        }
        println!("{} remembered exchange(s):", hits.len());
        for hit in hits.iter().rev().take(5) {
            println!("  [{}] you: {}", hit.timestamp.format("%Y-%m-%d %H:%M"), hit.user);
            println!("           mira: {}", hit.assistant);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_commands_are_case_insensitive() {
        assert!(is_exit("exit"));
        assert!(is_exit("QUIT"));
        assert!(is_exit("Stop"));
        assert!(!is_exit("exit now"));
        assert!(!is_exit("hello"));
    }
}

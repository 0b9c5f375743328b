//! Text-to-speech output.
//!
//! The daemon is expected to live inside Termux on the handset, so speaking
//! is one `termux-tts-speak` subprocess away. With voice disabled the line
//! is logged instead, which keeps every caller on a single code path.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::VoiceConfig;

pub struct VoiceSystem {
    enabled: bool,
    language: String,
    rate: String,
    timeout: Duration,
}

impl VoiceSystem {
    pub fn new(cfg: &VoiceConfig) -> Self {
        Self {
            enabled: cfg.enabled,
            language: cfg.language.clone(),
            rate: cfg.rate.to_string(),
            timeout: cfg.speak_timeout(),
        }
    }

    /// Speak one line, bounded by the configured timeout. Quotes are dropped
    /// from the line; the TTS binary chokes on them.
    pub async fn speak(&self, text: &str) -> Result<()> {
        if !self.enabled {
            info!("[muted] {text}");
            return Ok(());
        }
        let line = text.replace(['"', '\''], "");
        debug!("speaking: {line}");
        let run = Command::new("termux-tts-speak")
            .args(["-l", &self.language, "-r", &self.rate])
            .arg(&line)
            .output();
        match tokio::time::timeout(self.timeout, run).await {
            Ok(Ok(output)) if output.status.success() => Ok(()),
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                bail!("termux-tts-speak failed: {}", stderr.trim());
            }
            Ok(Err(err)) => Err(err).context("launch termux-tts-speak"),
            Err(_) => bail!("tts timed out after {:?}", self.timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn muted_voice_always_succeeds() {
        let voice = VoiceSystem::new(&VoiceConfig {
            enabled: false,
            ..VoiceConfig::default()
        });
        voice.speak("New message from Sam on WhatsApp").await.unwrap();
    }
}

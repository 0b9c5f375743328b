//! ADB device channel.
//!
//! Every interaction with the handset funnels through short-lived `adb`
//! subprocesses. The shell contract is forgiving on purpose: a timeout or a
//! spawn failure yields an empty string and a warning, and callers treat an
//! empty result like an empty dump. A missing `adb` binary is the one thing
//! the notification path does surface, so the monitor can back off instead
//! of spinning against nothing.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use mira_common::parsers::power::{parse_screen_state, ScreenState};

use crate::config::DeviceConfig;

/// Android keycodes the daemon sends.
pub mod keycode {
    pub const HOME: u32 = 3;
    pub const BACK: u32 = 4;
    pub const POWER: u32 = 26;
    pub const ENTER: u32 = 66;
}

/// Pause after foregrounding an app before typing into it.
const APP_SETTLE_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("adb command timed out after {0:?}")]
    Timeout(Duration),
    #[error("adb could not be run: {0}")]
    Io(#[from] std::io::Error),
    #[error("device not reachable: {0}")]
    Unreachable(String),
}

/// The narrow device surface the monitor and console run against.
#[async_trait]
pub trait DeviceChannel: Send + Sync {
    /// Run `adb shell <cmd>` and return trimmed stdout; empty string on any
    /// failure.
    async fn shell(&self, cmd: &str) -> String;

    /// Current display power state. Unreadable means `Off`.
    async fn screen_state(&self) -> ScreenState;

    /// Raw notification diagnostics dump. A timeout reads as an empty dump;
    /// an unrunnable `adb` is an error.
    async fn notification_dump(&self) -> Result<String, ChannelError>;

    /// Launch an app by package name.
    async fn open_app(&self, package: &str);

    /// Type text into the focused field.
    async fn type_text(&self, text: &str);

    /// Tap at screen coordinates.
    async fn tap(&self, x: u32, y: u32);

    /// Press a key by Android keycode.
    async fn key_event(&self, code: u32);
}

/// `DeviceChannel` backed by the real `adb` binary.
pub struct AdbBridge {
    host: String,
    timeout: Duration,
}

impl AdbBridge {
    pub fn new(cfg: &DeviceConfig) -> Self {
        Self {
            host: cfg.adb_host.clone(),
            timeout: cfg.shell_timeout(),
        }
    }

    /// Restart the adb server and connect to the configured host. USB-only
    /// setups fail the connect step harmlessly; the device is already known
    /// to the server.
    pub async fn connect(&self) -> Result<(), ChannelError> {
        let _ = self.run(&["kill-server"]).await;
        self.run(&["start-server"]).await?;
        let out = self.run(&["connect", &self.host]).await?;
        if out.contains("connected") {
            Ok(())
        } else {
            Err(ChannelError::Unreachable(out))
        }
    }

    /// One adb invocation, bounded by the configured timeout. Mirrors plain
    /// subprocess semantics: stdout comes back trimmed whatever the exit
    /// status, and a timed-out child is abandoned rather than waited out.
    async fn run(&self, args: &[&str]) -> Result<String, ChannelError> {
        debug!("adb {}", args.join(" "));
        let output = Command::new("adb").args(args).output();
        match tokio::time::timeout(self.timeout, output).await {
            Ok(Ok(output)) => Ok(String::from_utf8_lossy(&output.stdout).trim().to_string()),
            Ok(Err(err)) => Err(ChannelError::Io(err)),
            Err(_) => Err(ChannelError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl DeviceChannel for AdbBridge {
    async fn shell(&self, cmd: &str) -> String {
        match self.run(&["shell", cmd]).await {
            Ok(out) => out,
            Err(err) => {
                warn!("adb shell `{cmd}` failed: {err}");
                String::new()
            }
        }
    }

    async fn screen_state(&self) -> ScreenState {
        parse_screen_state(&self.shell("dumpsys power").await)
    }

    async fn notification_dump(&self) -> Result<String, ChannelError> {
        match self.run(&["shell", "dumpsys notification"]).await {
            Ok(dump) => Ok(dump),
            Err(ChannelError::Timeout(bound)) => {
                warn!("notification dump timed out after {bound:?}, treating as empty");
                Ok(String::new())
            }
            Err(err) => Err(err),
        }
    }

    async fn open_app(&self, package: &str) {
        self.shell(&format!(
            "monkey -p {package} -c android.intent.category.LAUNCHER 1"
        ))
        .await;
    }

    async fn type_text(&self, text: &str) {
        self.shell(&format!("input text \"{}\"", escape_for_input(text)))
            .await;
    }

    async fn tap(&self, x: u32, y: u32) {
        self.shell(&format!("input tap {x} {y}")).await;
    }

    async fn key_event(&self, code: u32) {
        self.shell(&format!("input keyevent {code}")).await;
    }
}

/// Escape a line for `input text`. The shell on the device eats quotes and
/// ampersands, and `input` wants spaces spelled `%s`.
fn escape_for_input(text: &str) -> String {
    text.replace('"', "\\\"")
        .replace('\'', "\\'")
        .replace(' ', "%s")
        .replace('&', "\\&")
}

/// Best-effort reply delivery: foreground the app, type, send. Assumes the
/// conversation is the app's landing view; hitting the right thread on a
/// busy device is out of scope.
pub async fn send_reply(device: &dyn DeviceChannel, package: &str, text: &str) {
    device.open_app(package).await;
    tokio::time::sleep(APP_SETTLE_DELAY).await;
    device.type_text(text).await;
    device.key_event(keycode::ENTER).await;
}

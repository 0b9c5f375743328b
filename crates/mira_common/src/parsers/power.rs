//! `dumpsys power` screen state parser.

use serde::{Deserialize, Serialize};

/// Display power state as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenState {
    On,
    Off,
}

impl ScreenState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenState::On => "ON",
            ScreenState::Off => "OFF",
        }
    }

    pub fn is_off(&self) -> bool {
        matches!(self, ScreenState::Off)
    }
}

/// Marker present in the dump while the display holds its suspend blocker,
/// i.e. while the screen is on.
const AWAKE_MARKER: &str = "mHoldingDisplaySuspendBlocker=true";

/// Derive the screen state from a raw `dumpsys power` dump.
///
/// Anything that does not positively assert the display is awake reads as
/// `Off`, including the empty string a failed channel call produces.
pub fn parse_screen_state(dump: &str) -> ScreenState {
    if dump.contains(AWAKE_MARKER) {
        ScreenState::On
    } else {
        ScreenState::Off
    }
}

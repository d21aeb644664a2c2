//! Per-session UI flags.
//!
//! The flags are flipped by the user (from any task) and read by the
//! dispatcher on every event, so they are plain atomics.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::ClientConfig;

/// User-togglable session state.
#[derive(Debug)]
pub struct Session {
    voice_on: AtomicBool,
    auto_zoom_on: AtomicBool,
}

impl Session {
    pub fn new(voice_on: bool, auto_zoom_on: bool) -> Self {
        Self {
            voice_on: AtomicBool::new(voice_on),
            auto_zoom_on: AtomicBool::new(auto_zoom_on),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.voice_on, config.auto_zoom_on)
    }

    pub fn voice_on(&self) -> bool {
        self.voice_on.load(Ordering::Relaxed)
    }

    pub fn set_voice(&self, on: bool) {
        self.voice_on.store(on, Ordering::Relaxed);
    }

    /// Flips the voice flag and returns the new value.
    pub fn toggle_voice(&self) -> bool {
        !self.voice_on.fetch_xor(true, Ordering::Relaxed)
    }

    pub fn auto_zoom_on(&self) -> bool {
        self.auto_zoom_on.load(Ordering::Relaxed)
    }

    pub fn set_auto_zoom(&self, on: bool) {
        self.auto_zoom_on.store(on, Ordering::Relaxed);
    }

    /// Flips the auto-zoom flag and returns the new value.
    pub fn toggle_auto_zoom(&self) -> bool {
        !self.auto_zoom_on.fetch_xor(true, Ordering::Relaxed)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles_return_new_value() {
        let session = Session::new(false, true);
        assert!(session.toggle_voice());
        assert!(session.voice_on());
        assert!(!session.toggle_auto_zoom());
        assert!(!session.auto_zoom_on());
    }
}

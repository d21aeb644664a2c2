//! Speech capability.
//!
//! Speech is a side effect of dispatch, injected so dispatch stays testable
//! without an audio subsystem. Whether anything is spoken at all is decided
//! by the session's voice flag before the speaker is called.

use parking_lot::Mutex;

/// Trait for speaking text aloud.
pub trait Speaker: Send + Sync {
    /// Speaks `text` once. Must not block.
    fn speak(&self, text: &str);
}

/// Silent speaker.
pub struct NoopSpeaker;

impl Speaker for NoopSpeaker {
    fn speak(&self, _text: &str) {}
}

/// Speaker that writes utterances to the log instead of an audio device.
pub struct LoggingSpeaker;

impl Speaker for LoggingSpeaker {
    fn speak(&self, text: &str) {
        tracing::info!(text, "speak");
    }
}

/// In-memory speaker that records every utterance.
#[derive(Default)]
pub struct RecordingSpeaker {
    spoken: Mutex<Vec<String>>,
}

impl RecordingSpeaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().clone()
    }
}

impl Speaker for RecordingSpeaker {
    fn speak(&self, text: &str) {
        self.spoken.lock().push(text.to_string());
    }
}

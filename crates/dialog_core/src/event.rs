//! Event contract - the normalized input of one conversational turn.
//!
//! Recognition of user intent from raw platform payloads happens upstream;
//! the engine only ever reads the intent name and the platform tag.

use serde::{Deserialize, Serialize};

/// Default platform scope. States registered under it apply to every
/// channel unless shadowed by a per-platform overlay.
pub const CORE_PLATFORM: &str = "core";

/// A normalized event: a recognized intent plus the originating platform.
///
/// The event is exclusively owned by its turn and never shared across
/// concurrent turns.
pub trait Event: Send + Sync {
    /// Name of the recognized intent (e.g. `"Yes"`, `"HelpIntent"`).
    fn intent_name(&self) -> &str;

    /// Originating channel, used to select per-platform state overlays.
    fn platform(&self) -> &str;
}

/// Minimal owned event for callers that do not carry a richer platform
/// request object.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BasicEvent {
    pub intent: String,
    pub platform: String,
}

impl BasicEvent {
    pub fn new(intent: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            platform: platform.into(),
        }
    }

    /// Event on the default platform scope.
    pub fn core(intent: impl Into<String>) -> Self {
        Self::new(intent, CORE_PLATFORM)
    }
}

impl Event for BasicEvent {
    fn intent_name(&self) -> &str {
        &self.intent
    }

    fn platform(&self) -> &str {
        &self.platform
    }
}

//! Reply contract - the mutable response collaborator of one turn.
//!
//! The engine only marks the reply terminated when a turn ends; rendering
//! and platform serialization are downstream concerns.

/// Response object owned by the caller for the duration of one turn.
pub trait Reply: Send + Sync {
    /// Mark the turn as ended. Idempotent.
    fn terminate(&mut self);

    /// Whether the turn has been marked as ended.
    fn is_terminated(&self) -> bool;
}

/// Minimal owned reply carrying only the termination flag.
#[derive(Debug, Clone, Default)]
pub struct BasicReply {
    terminated: bool,
}

impl BasicReply {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reply for BasicReply {
    fn terminate(&mut self) {
        self.terminated = true;
    }

    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_reply_is_not_terminated() {
        assert!(!BasicReply::new().is_terminated());
    }

    #[test]
    fn test_terminate_is_idempotent() {
        let mut reply = BasicReply::new();
        reply.terminate();
        reply.terminate();
        assert!(reply.is_terminated());
    }
}

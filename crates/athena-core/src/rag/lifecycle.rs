//! Per-request state machine.

use athena_types::error::{ErrorKind, RagError};
use athena_types::rag::RequestState;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal request state transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: RequestState,
    pub to: RequestState,
}

impl From<InvalidTransition> for RagError {
    fn from(e: InvalidTransition) -> Self {
        RagError::new(ErrorKind::Internal, e.to_string(), false)
    }
}

/// Tracks the current state of a request and every state it passed through.
#[derive(Debug, Clone)]
pub struct RequestLifecycle {
    visited: Vec<RequestState>,
}

impl RequestLifecycle {
    pub fn new() -> Self {
        Self {
            visited: vec![RequestState::Received],
        }
    }

    pub fn state(&self) -> RequestState {
        self.visited
            .last()
            .copied()
            .unwrap_or(RequestState::Received)
    }

    pub fn advance(&mut self, next: RequestState) -> Result<(), InvalidTransition> {
        let from = self.state();
        if !from.can_transition_to(next) {
            return Err(InvalidTransition { from, to: next });
        }
        debug!(from = %from, to = %next, "Request state");
        self.visited.push(next);
        Ok(())
    }

    /// Move to `Failed` unless already terminal.
    pub fn fail(&mut self) {
        if !self.state().is_terminal() {
            self.visited.push(RequestState::Failed);
        }
    }

    pub fn visited(&self) -> &[RequestState] {
        &self.visited
    }
}

impl Default for RequestLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RequestState::*;

    #[test]
    fn test_full_path() {
        let mut life = RequestLifecycle::new();
        for s in [Retrieving, Assembling, Generating, Completed] {
            life.advance(s).unwrap();
        }
        assert_eq!(life.visited(), &[Received, Retrieving, Assembling, Generating, Completed]);
    }

    #[test]
    fn test_skipping_a_stage_is_rejected() {
        let mut life = RequestLifecycle::new();
        let err = life.advance(Generating).unwrap_err();
        assert_eq!(err, InvalidTransition { from: Received, to: Generating });
        assert_eq!(life.state(), Received);
    }

    #[test]
    fn test_fail_is_terminal_and_idempotent() {
        let mut life = RequestLifecycle::new();
        life.advance(Retrieving).unwrap();
        life.fail();
        life.fail();
        assert_eq!(life.visited(), &[Received, Retrieving, Failed]);
        assert!(life.advance(Assembling).is_err());
    }

    #[test]
    fn test_completed_cannot_fail() {
        let mut life = RequestLifecycle::new();
        life.advance(Completed).unwrap();
        life.fail();
        assert_eq!(life.state(), Completed);
    }
}

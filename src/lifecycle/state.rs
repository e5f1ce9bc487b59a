//! Process lifecycle state machine.
//!
//! # States
//! ```text
//! Initializing → ConfigLoading → Registering → Listening → Running
//!                     │                             │          │
//!                     └──────→ FailedStartup ←──────┘          ▼
//!                                                   ShuttingDown → Terminated
//! ```
//!
//! # Design Decisions
//! - Every transition is checked; an invalid one is an error, not a no-op
//! - History is kept so callers can assert the exact sequence
//! - Observers subscribe through a watch channel

use std::fmt;
use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Initializing,
    ConfigLoading,
    Registering,
    Listening,
    Running,
    ShuttingDown,
    Terminated,
    FailedStartup,
}

impl LifecycleState {
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Initializing, ConfigLoading)
                | (ConfigLoading, Registering)
                | (ConfigLoading, FailedStartup)
                | (Registering, Listening)
                | (Listening, Running)
                | (Listening, FailedStartup)
                | (Running, ShuttingDown)
                | (ShuttingDown, Terminated)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Terminated | LifecycleState::FailedStartup)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid lifecycle transition {from} -> {to}")]
pub struct LifecycleError {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

/// Tracks one orchestrator's progress through the lifecycle.
#[derive(Debug)]
pub struct Lifecycle {
    tx: watch::Sender<LifecycleState>,
    history: Mutex<Vec<LifecycleState>>,
}

impl Lifecycle {
    /// Start in `Initializing`.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(LifecycleState::Initializing);
        Self {
            tx,
            history: Mutex::new(vec![LifecycleState::Initializing]),
        }
    }

    pub fn current(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    /// Every state entered so far, in order.
    pub fn history(&self) -> Vec<LifecycleState> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.tx.subscribe()
    }

    pub fn transition(&self, next: LifecycleState) -> Result<(), LifecycleError> {
        // The history lock serializes transitions.
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.current();
        if !current.can_transition_to(next) {
            return Err(LifecycleError {
                from: current,
                to: next,
            });
        }

        tracing::debug!(from = %current, to = %next, "Lifecycle transition");
        history.push(next);
        self.tx.send_replace(next);
        Ok(())
    }

    /// Enter `FailedStartup` if the current state allows it.
    pub fn fail(&self) -> Result<(), LifecycleError> {
        self.transition(LifecycleState::FailedStartup)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

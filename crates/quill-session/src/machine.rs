//! Session state machine using rust-fsm.
//!
//! Two durable states, Anonymous and Authenticated. Network-bound
//! operations do not get transient states: an in-flight login leaves
//! the machine in Anonymous until the response lands, so a route-guard
//! evaluation during the call still observes the pre-call state.
//!
//! ```text
//! ┌─────────────┐  LoginSucceeded / TokenIssued / RestoreSucceeded  ┌───────────────┐
//! │  Anonymous  │ ────────────────────────────────────────────────► │ Authenticated │
//! │  (initial)  │ ◄──────────────────────────────────────────────── │               │
//! └─────────────┘              LoggedOut / RestoreFailed            └───────────────┘
//! ```
//!
//! `RestoreFailed` is also accepted in Anonymous (self-loop) so a
//! failed restore always lands in a consistent state no matter where
//! it started.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

// Generates a module `session_machine` with State, Input, and
// StateMachine types plus the transition table.
state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Anonymous)

    Anonymous => {
        LoginSucceeded => Authenticated,
        TokenIssued => Authenticated,
        RestoreSucceeded => Authenticated,
        RestoreFailed => Anonymous
    },
    Authenticated => {
        LoginSucceeded => Authenticated,
        TokenIssued => Authenticated,
        RestoreSucceeded => Authenticated,
        RestoreFailed => Anonymous,
        LoggedOut => Anonymous
    }
}

// Re-export the generated types with clearer names
pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Session state for external consumption (route guard, CLI, UI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No authenticated identity.
    Anonymous,
    /// Valid token and user record are resident.
    Authenticated,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated)
    }
}

impl From<&SessionMachineState> for SessionState {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Anonymous => SessionState::Anonymous,
            SessionMachineState::Authenticated => SessionState::Authenticated,
        }
    }
}

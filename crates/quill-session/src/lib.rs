//! Session store for the Quill client.
//!
//! This crate owns the authenticated session: establishing it via
//! login/register, persisting it through durable storage, restoring it
//! on startup (self-healing on any inconsistency), invalidating it on
//! logout, and signing privileged administrative requests.
//!
//! Login, register, and restore never return errors: every path
//! resolves to an [`AuthOutcome`] or a silently-corrected state, so
//! callers branch on a flag plus message. Privileged mutations are the
//! exception and propagate failures.

mod classify;
mod error;
mod machine;
mod store;

pub use classify::messages;
pub use error::{SessionError, SessionResult};
pub use machine::{SessionMachine, SessionMachineInput, SessionMachineState, SessionState};
pub use store::{AuthOutcome, Navigator, Session, SessionStore};

pub use quill_storage::UserRecord;

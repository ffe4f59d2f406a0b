//! Route access control for the Quill client.
//!
//! A [`RouteTable`] maps paths to named routes, each carrying a
//! [`RoutePolicy`]. The [`RouteGuard`] evaluates a policy against the
//! current session, and the [`NavigationEngine`] ties both together:
//! it resolves paths, applies guard decisions, tracks the current
//! location, and remembers where an anonymous visitor was headed so
//! they can be sent back after login.

mod engine;
mod guard;
mod table;

pub use engine::{NavigationEngine, NavigationOutcome};
pub use guard::{GuardDecision, RouteGuard, RoutePolicy};
pub use table::{Route, RouteTable};

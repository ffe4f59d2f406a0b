//! Navigation engine: path resolution, guard enforcement, and the
//! post-login return path.

use crate::guard::{GuardDecision, RouteGuard};
use crate::table::RouteTable;
use quill_session::{Navigator, Session};
use std::sync::Mutex;
use tracing::{debug, warn};

const HOME: &str = "/";
const LOGIN: &str = "/login";

/// Result of a navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// Entered the named route.
    Entered { route: &'static str },
    /// Sent to the login route; `return_to` is retrievable via
    /// [`NavigationEngine::take_return_path`] after a later login.
    RedirectedToLogin { return_to: String },
    /// Bounced to home (insufficient role, or an entry route while
    /// already authenticated).
    RedirectedToHome,
    /// No route matched the path; the current location is unchanged.
    NotFound,
}

/// Tracks the current location and runs every navigation through the
/// route table and guard.
pub struct NavigationEngine {
    table: RouteTable,
    guard: RouteGuard,
    current: Mutex<String>,
    pending_return: Mutex<Option<String>>,
}

impl NavigationEngine {
    pub fn new(table: RouteTable, guard: RouteGuard) -> Self {
        Self {
            table,
            guard,
            current: Mutex::new(HOME.to_string()),
            pending_return: Mutex::new(None),
        }
    }

    pub fn current_path(&self) -> String {
        self.current.lock().unwrap().clone()
    }

    /// Take the stashed return path, if a guarded navigation stored
    /// one. Consumed on read so it is honored at most once.
    pub fn take_return_path(&self) -> Option<String> {
        self.pending_return.lock().unwrap().take()
    }

    /// Navigate to `path` under the given session.
    pub fn navigate(&self, path: &str, session: &Session) -> NavigationOutcome {
        let Some(route) = self.table.resolve(path) else {
            warn!(path, "No route matches");
            return NavigationOutcome::NotFound;
        };

        if route.redirect_authenticated && session.is_logged_in() {
            debug!(path, "Already authenticated, bouncing to home");
            self.set_current(HOME);
            return NavigationOutcome::RedirectedToHome;
        }

        match self.guard.evaluate(path, &route.policy, session) {
            GuardDecision::Allow => {
                self.set_current(path);
                debug!(path, route = route.name, "Entered route");
                NavigationOutcome::Entered { route: route.name }
            }
            GuardDecision::RedirectToLogin { return_to } => {
                *self.pending_return.lock().unwrap() = Some(return_to.clone());
                self.set_current(LOGIN);
                NavigationOutcome::RedirectedToLogin { return_to }
            }
            GuardDecision::RedirectToHome => {
                self.set_current(HOME);
                NavigationOutcome::RedirectedToHome
            }
        }
    }

    fn set_current(&self, path: &str) {
        *self.current.lock().unwrap() = path.to_string();
    }
}

/// Logout redirect: straight to the login route, no return path.
impl Navigator for NavigationEngine {
    fn redirect_to_login(&self) {
        self.set_current(LOGIN);
    }
}

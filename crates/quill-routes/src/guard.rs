//! Access policy and the guard that enforces it.

use quill_session::Session;
use std::sync::Mutex;
use tracing::debug;

/// Notice shown when an authenticated non-admin hits an admin route.
const INSUFFICIENT_PERMISSION: &str = "insufficient permission";

/// Access requirements of a route.
///
/// Fields stay private so the only reachable values are the three
/// constructors build; admin always implies authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutePolicy {
    requires_auth: bool,
    requires_admin: bool,
}

impl RoutePolicy {
    /// Open to everyone, including anonymous visitors.
    pub fn public() -> Self {
        Self {
            requires_auth: false,
            requires_admin: false,
        }
    }

    /// Requires an authenticated session.
    pub fn member() -> Self {
        Self {
            requires_auth: true,
            requires_admin: false,
        }
    }

    /// Requires an authenticated session with the admin role.
    pub fn admin() -> Self {
        Self {
            requires_auth: true,
            requires_admin: true,
        }
    }

    pub fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    pub fn requires_admin(&self) -> bool {
        self.requires_admin
    }
}

/// What the guard decided for a navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Anonymous visitor on a protected route; `return_to` is where
    /// they were headed.
    RedirectToLogin { return_to: String },
    /// Authenticated but not admin on an admin route.
    RedirectToHome,
}

/// Evaluates route policies against the current session.
///
/// The authentication check runs before the role check, so an
/// anonymous visitor on an admin route is sent to login (with a
/// return path), never to the permission notice.
#[derive(Default)]
pub struct RouteGuard {
    notice_handler: Mutex<Option<Box<dyn Fn(&str) + Send + Sync>>>,
}

impl RouteGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a handler for user-facing notices (e.g. a toast).
    pub fn set_notice_handler(&self, handler: impl Fn(&str) + Send + Sync + 'static) {
        *self.notice_handler.lock().unwrap() = Some(Box::new(handler));
    }

    pub fn evaluate(&self, target: &str, policy: &RoutePolicy, session: &Session) -> GuardDecision {
        if policy.requires_auth() && !session.is_logged_in() {
            debug!(target, "Anonymous visitor on protected route");
            return GuardDecision::RedirectToLogin {
                return_to: target.to_string(),
            };
        }

        if policy.requires_admin() && !session.is_admin() {
            debug!(target, "Non-admin on admin route");
            self.notify(INSUFFICIENT_PERMISSION);
            return GuardDecision::RedirectToHome;
        }

        GuardDecision::Allow
    }

    fn notify(&self, message: &str) {
        let handler = self.notice_handler.lock().unwrap();
        if let Some(handler) = handler.as_ref() {
            handler(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_session::UserRecord;
    use std::sync::Arc;

    fn session(role: Option<&str>) -> Session {
        match role {
            None => Session::default(),
            Some(role) => Session {
                token: Some("t1".to_string()),
                user: Some(UserRecord {
                    id: 1,
                    username: "u".to_string(),
                    email: None,
                    role: role.to_string(),
                }),
            },
        }
    }

    #[test]
    fn test_public_route_allows_everyone() {
        let guard = RouteGuard::new();
        let policy = RoutePolicy::public();
        assert_eq!(
            guard.evaluate("/articles", &policy, &session(None)),
            GuardDecision::Allow
        );
        assert_eq!(
            guard.evaluate("/articles", &policy, &session(Some("user"))),
            GuardDecision::Allow
        );
    }

    #[test]
    fn test_member_route_redirects_anonymous_with_return_path() {
        let guard = RouteGuard::new();
        assert_eq!(
            guard.evaluate("/profile", &RoutePolicy::member(), &session(None)),
            GuardDecision::RedirectToLogin {
                return_to: "/profile".to_string()
            }
        );
    }

    #[test]
    fn test_admin_route_checks_auth_before_role() {
        // Anonymous on an admin route goes to login, not home
        let guard = RouteGuard::new();
        assert_eq!(
            guard.evaluate("/admin", &RoutePolicy::admin(), &session(None)),
            GuardDecision::RedirectToLogin {
                return_to: "/admin".to_string()
            }
        );
    }

    #[test]
    fn test_admin_route_rejects_plain_member() {
        let guard = RouteGuard::new();
        assert_eq!(
            guard.evaluate("/admin", &RoutePolicy::admin(), &session(Some("user"))),
            GuardDecision::RedirectToHome
        );
        assert_eq!(
            guard.evaluate("/admin", &RoutePolicy::admin(), &session(Some("admin"))),
            GuardDecision::Allow
        );
    }

    #[test]
    fn test_permission_notice_fires_only_for_role_rejection() {
        let notices = Arc::new(Mutex::new(Vec::new()));
        let guard = RouteGuard::new();
        let sink = notices.clone();
        guard.set_notice_handler(move |message| {
            sink.lock().unwrap().push(message.to_string());
        });

        guard.evaluate("/admin", &RoutePolicy::admin(), &session(None));
        assert!(notices.lock().unwrap().is_empty());

        guard.evaluate("/admin", &RoutePolicy::admin(), &session(Some("user")));
        assert_eq!(
            notices.lock().unwrap().as_slice(),
            ["insufficient permission"]
        );
    }

    #[test]
    fn test_admin_policy_implies_auth() {
        let policy = RoutePolicy::admin();
        assert!(policy.requires_auth());
        assert!(policy.requires_admin());
    }
}

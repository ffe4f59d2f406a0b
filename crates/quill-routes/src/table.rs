//! The route table: named routes with path patterns and policies.

use crate::guard::RoutePolicy;

/// A registered route.
#[derive(Debug, Clone)]
pub struct Route {
    /// Path pattern; `:name` segments match any single segment.
    pub path: &'static str,
    pub name: &'static str,
    pub policy: RoutePolicy,
    /// Entry routes (login, register) that an already-authenticated
    /// visitor is bounced away from.
    pub redirect_authenticated: bool,
}

impl Route {
    fn new(path: &'static str, name: &'static str, policy: RoutePolicy) -> Self {
        Self {
            path,
            name,
            policy,
            redirect_authenticated: false,
        }
    }

    fn redirect_authenticated(mut self) -> Self {
        self.redirect_authenticated = true;
        self
    }

    /// Segment-wise match; a `:param` pattern segment matches any
    /// non-empty concrete segment.
    pub fn matches(&self, path: &str) -> bool {
        let mut pattern = self.path.split('/');
        let mut target = path.split('/');
        loop {
            match (pattern.next(), target.next()) {
                (None, None) => return true,
                (Some(p), Some(t)) if p.starts_with(':') => {
                    if t.is_empty() {
                        return false;
                    }
                }
                (Some(p), Some(t)) => {
                    if p != t {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }
}

/// Ordered route registry; the first matching route wins, so fixed
/// paths must be registered before parameterized ones that would
/// shadow them (`/article/create` before `/article/:id`).
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(path))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(vec![
            Route::new("/", "home", RoutePolicy::public()),
            Route::new("/login", "login", RoutePolicy::public()).redirect_authenticated(),
            Route::new("/register", "register", RoutePolicy::public()).redirect_authenticated(),
            Route::new("/articles", "articles", RoutePolicy::public()),
            Route::new("/article/create", "article-create", RoutePolicy::member()),
            Route::new("/article/edit/:id", "article-edit", RoutePolicy::member()),
            Route::new("/article/:id", "article-detail", RoutePolicy::public()),
            Route::new("/profile", "profile", RoutePolicy::member()),
            Route::new("/admin", "admin-dashboard", RoutePolicy::admin()),
            Route::new(
                "/admin/users/edit/:user_id",
                "admin-user-edit",
                RoutePolicy::admin(),
            ),
            Route::new("/confirm/:action", "admin-confirm", RoutePolicy::admin()),
        ])
    }
}

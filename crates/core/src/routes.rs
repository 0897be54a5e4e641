//! Route table and the guard consulted on every navigation.

use std::{fmt, sync::Arc};

use tracing::debug;

use crate::session::SessionStore;

/// Screens a front-end can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Sign-in form.
    Login,
    /// Account creation form.
    Register,
    /// Holdings list; the default page behind the login.
    Holdings,
}

impl Route {
    /// Resolve a path against the route table.
    ///
    /// The empty path and anything unknown land on the login page; `app`
    /// alone lands on the default protected page.
    pub fn parse(path: &str) -> Self {
        let segments: Vec<&str> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();
        match segments.as_slice() {
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            ["app"] | ["app", "holdings"] => Route::Holdings,
            _ => Route::Login,
        }
    }

    /// Canonical path of the route.
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Holdings => "/app/holdings",
        }
    }

    /// Whether entering the route requires a session.
    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Holdings)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Navigation may proceed.
    Allow,
    /// Navigation is denied; go here instead.
    Redirect(Route),
}

/// Best-effort gate in front of protected routes.
///
/// It only consults the cached session belief, so a stale belief gets
/// through. The server remains the real enforcement point and pages
/// reconcile on the first rejected call.
#[derive(Clone)]
pub struct RouteGuard {
    session: Arc<SessionStore>,
}

impl RouteGuard {
    /// Guard backed by `session`'s cached belief.
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }

    /// Decide whether `target` may be entered. Never performs I/O.
    pub fn check(&self, target: Route) -> GuardDecision {
        if !target.is_protected() || self.session.current_belief().is_present {
            GuardDecision::Allow
        } else {
            debug!(%target, "No session belief; redirecting to login");
            GuardDecision::Redirect(Route::Login)
        }
    }
}

/// Tracks the current route and funnels every navigation through the guard.
pub struct Router {
    guard: RouteGuard,
    current: Route,
}

impl Router {
    /// Start on the login page.
    pub fn new(guard: RouteGuard) -> Self {
        Self {
            guard,
            current: Route::Login,
        }
    }

    /// Route currently shown.
    pub fn current(&self) -> Route {
        self.current
    }

    /// Navigate to `target`, returning where navigation actually ended.
    pub fn navigate(&mut self, target: Route) -> Route {
        self.current = match self.guard.check(target) {
            GuardDecision::Allow => target,
            GuardDecision::Redirect(fallback) => fallback,
        };
        self.current
    }

    /// Navigate to a path from the route table.
    pub fn navigate_path(&mut self, path: &str) -> Route {
        self.navigate(Route::parse(path))
    }
}

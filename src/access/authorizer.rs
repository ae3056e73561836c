use serde::Serialize;
use tracing::debug;

use crate::config::AuthConfig;
use crate::identity::{Role, RoleSet};

use super::menu::{filter_menu, NavEntry};
use super::routes::{RouteKind, RouteMatch, RouteTable};

/// Where a refused request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Redirect {
    /// No session.
    SignIn,
    /// Session present, role not admitted. The session is kept.
    Unauthorized,
    /// No route matches.
    Landing,
    /// Authenticated caller on the sign-in page.
    Dashboard,
}

impl Redirect {
    pub fn path<'c>(&self, config: &'c AuthConfig) -> &'c str {
        match self {
            Redirect::SignIn => &config.sign_in_path,
            Redirect::Unauthorized => &config.unauthorized_path,
            Redirect::Landing => &config.landing_path,
            Redirect::Dashboard => &config.dashboard_path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "to", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    RedirectTo(Redirect),
}

impl Decision {
    pub fn is_allowed(&self) -> bool { matches!(self, Decision::Allow) }
}

/// Single guard: no role → sign-in, role outside `allowed` → unauthorized.
pub fn authorize(role: Option<Role>, allowed: &RoleSet) -> Decision {
    match role {
        None => Decision::RedirectTo(Redirect::SignIn),
        Some(r) if !allowed.contains(r) => Decision::RedirectTo(Redirect::Unauthorized),
        Some(_) => Decision::Allow,
    }
}

/// Nested guards, outermost first. Every guard must admit the role.
pub fn authorize_chain(role: Option<Role>, chain: &[RoleSet]) -> Decision {
    for allowed in chain {
        let d = authorize(role, allowed);
        if !d.is_allowed() {
            return d;
        }
    }
    Decision::Allow
}

/// Decision for an already matched route.
pub fn decide_route(role: Option<Role>, m: &RouteMatch<'_>) -> Decision {
    if m.kind == RouteKind::SignIn && role.is_some() {
        return Decision::RedirectTo(Redirect::Dashboard);
    }
    authorize_chain(role, m.guards)
}

/// Decision for a path no route matches. The guards of the enclosing layouts
/// still apply; a caller who passes them lands on the landing page.
pub fn decide_unmatched(role: Option<Role>, enclosing: &[RoleSet]) -> Decision {
    match authorize_chain(role, enclosing) {
        Decision::Allow => Decision::RedirectTo(Redirect::Landing),
        refused => refused,
    }
}

/// Decision for a request path.
pub fn check_path(routes: &RouteTable, role: Option<Role>, path: &str) -> Decision {
    let decision = match routes.match_path(path) {
        None => decide_unmatched(role, routes.enclosing_guards(path)),
        Some(m) => decide_route(role, &m),
    };
    debug!(target: "access", "access.check path={} role={:?} decision={:?}", path, role.map(|r| r.as_str()), decision);
    decision
}

/// Role-filtered menu without entries whose target would redirect the same caller.
pub fn menu_for(routes: &RouteTable, role: Option<Role>, nav: &[NavEntry]) -> Vec<NavEntry> {
    filter_menu(role, nav)
        .into_iter()
        .filter(|e| !e.path.is_empty() && check_path(routes, role, &e.path).is_allowed())
        .collect()
}

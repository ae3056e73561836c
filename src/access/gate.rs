use std::sync::Arc;

use tracing::info;

use crate::config::AuthConfig;
use crate::identity::{now_secs, Identity, SessionResolver, SessionStore};

use super::authorizer::{decide_route, decide_unmatched, menu_for, Decision, Redirect};
use super::menu::{active_entry, nav_data, NavEntry};
use super::navigator::Navigator;
use super::routes::{dashboard_routes, RouteTable};

/// What a guarded page receives when it is allowed to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    pub path: String,
    pub pattern: String,
    pub params: Vec<(String, String)>,
    pub identity: Option<Identity>,
    pub menu: Vec<NavEntry>,
    pub active: Option<NavEntry>,
}

impl PageContext {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.iter().rev().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome<T> {
    Rendered(T),
    Redirected { to: Redirect, path: String },
}

impl<T> GuardOutcome<T> {
    pub fn is_rendered(&self) -> bool { matches!(self, GuardOutcome::Rendered(_)) }

    pub fn redirect(&self) -> Option<Redirect> {
        match self {
            GuardOutcome::Redirected { to, .. } => Some(*to),
            GuardOutcome::Rendered(_) => None,
        }
    }
}

/// Render boundary: resolves the session, checks the route, then either renders
/// or navigates away. The render callback only runs on `Allow`.
pub struct Gate {
    config: AuthConfig,
    resolver: SessionResolver,
    navigator: Arc<dyn Navigator>,
    routes: Arc<RouteTable>,
}

impl Gate {
    pub fn new(config: AuthConfig, store: Arc<dyn SessionStore>, navigator: Arc<dyn Navigator>) -> Self {
        let routes = Arc::new(dashboard_routes().clone());
        Self::with_routes(config, store, navigator, routes)
    }

    pub fn with_routes(
        config: AuthConfig,
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
        routes: Arc<RouteTable>,
    ) -> Self {
        let resolver = SessionResolver::new(&config, store, navigator.clone());
        Self { config, resolver, navigator, routes }
    }

    pub fn resolver(&self) -> &SessionResolver { &self.resolver }

    pub fn routes(&self) -> &RouteTable { &self.routes }

    pub fn config(&self) -> &AuthConfig { &self.config }

    pub fn guard<T, F>(&self, path: &str, render: F) -> GuardOutcome<T>
    where
        F: FnOnce(&PageContext) -> T,
    {
        self.guard_at(path, now_secs(), render)
    }

    pub fn guard_at<T, F>(&self, path: &str, now: i64, render: F) -> GuardOutcome<T>
    where
        F: FnOnce(&PageContext) -> T,
    {
        let matched = self.routes.match_path(path);
        let guards = match &matched {
            Some(m) => m.guards,
            None => self.routes.enclosing_guards(path),
        };

        // Public pages look at the session without forcing a logout.
        let (identity, resolver_navigated) = if !guards.is_empty() {
            let session = self.resolver.resolve_at(now);
            let authenticated = session.is_authenticated();
            (session.into_identity(), !authenticated)
        } else {
            (self.resolver.peek_at(now), false)
        };
        let role = identity.as_ref().map(|i| i.role);

        let decision = match &matched {
            Some(m) => decide_route(role, m),
            None => decide_unmatched(role, guards),
        };
        match (decision, matched) {
            (Decision::Allow, Some(m)) => {
                let menu = menu_for(&self.routes, role, nav_data());
                let active = active_entry(&menu, path).cloned();
                let ctx = PageContext {
                    path: path.to_string(),
                    pattern: m.pattern.to_string(),
                    params: m.params,
                    identity,
                    menu,
                    active,
                };
                GuardOutcome::Rendered(render(&ctx))
            }
            (Decision::RedirectTo(Redirect::SignIn), _) if resolver_navigated => {
                // logout already sent the caller to sign-in
                GuardOutcome::Redirected { to: Redirect::SignIn, path: self.config.sign_in_path.clone() }
            }
            (Decision::RedirectTo(to), _) => self.redirect(path, to),
            (Decision::Allow, None) => self.redirect(path, Redirect::Landing),
        }
    }

    fn redirect<T>(&self, from: &str, to: Redirect) -> GuardOutcome<T> {
        let target = to.path(&self.config).to_string();
        info!(target: "access", "access.redirect from={} to={}", from, target);
        self.navigator.navigate(&target);
        GuardOutcome::Redirected { to, path: target }
    }
}

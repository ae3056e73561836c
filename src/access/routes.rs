//! Route tree with per-subtree role guards.
//!
//! Routes are declared as a tree; each node may carry an allow-list. Flattening
//! the tree gives every leaf the chain of allow-lists of its ancestors, which the
//! authorizer ANDs from the root down. Patterns compile to anchored,
//! case-insensitive regexes; `:name` segments capture one path segment.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::identity::{Role, RoleSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Page,
    /// The sign-in page: an authenticated caller is sent to the dashboard instead.
    SignIn,
}

/// One node of the declared route tree.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    /// Relative to the parent; `""` is the index route.
    pub pattern: &'static str,
    pub allowed: Option<RoleSet>,
    pub kind: RouteKind,
    pub children: Vec<RouteSpec>,
}

impl RouteSpec {
    pub fn public(pattern: &'static str) -> Self {
        Self { pattern, allowed: None, kind: RouteKind::Page, children: Vec::new() }
    }

    pub fn guarded(pattern: &'static str, roles: &[Role]) -> Self {
        Self { pattern, allowed: Some(RoleSet::of(roles)), kind: RouteKind::Page, children: Vec::new() }
    }

    pub fn sign_in(pattern: &'static str) -> Self {
        Self { pattern, allowed: None, kind: RouteKind::SignIn, children: Vec::new() }
    }

    pub fn with_children(mut self, children: Vec<RouteSpec>) -> Self {
        self.children = children;
        self
    }
}

#[derive(Debug, Clone)]
struct CompiledRoute {
    pattern: String,
    regex: Regex,
    param_names: Vec<String>,
    static_segments: usize,
    guards: Vec<RoleSet>,
    kind: RouteKind,
}

/// A matched route: its full pattern, the ancestor guard chain and captured params.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'t> {
    pub pattern: &'t str,
    pub guards: &'t [RoleSet],
    pub kind: RouteKind,
    pub params: Vec<(String, String)>,
}

impl RouteMatch<'_> {
    pub fn is_protected(&self) -> bool { !self.guards.is_empty() }

    /// Last value captured for `name` (patterns may reuse a name).
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.iter().rev().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }
}

fn join(parent: &str, child: &str) -> String {
    let child = child.trim_matches('/');
    if child.is_empty() {
        if parent.is_empty() { "/".to_string() } else { parent.to_string() }
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), child)
    }
}

fn valid_param_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Compile `full` into an anchored regex. With `prefix` the regex also accepts
/// any deeper path, which is how layouts claim their subtree.
fn compile_pattern(full: &str, prefix: bool) -> Result<(Regex, Vec<String>, usize), String> {
    let mut names = Vec::new();
    let mut statics = 0usize;
    let mut rx = String::from("(?i)^");
    for seg in full.split('/').filter(|s| !s.is_empty()) {
        rx.push('/');
        if let Some(name) = seg.strip_prefix(':') {
            if !valid_param_name(name) {
                return Err(format!("route {} has an invalid parameter ':{}'", full, name));
            }
            names.push(name.to_string());
            rx.push_str("([^/]+)");
        } else {
            statics += 1;
            rx.push_str(&regex::escape(seg));
        }
    }
    match (full == "/", prefix) {
        (true, true) => rx.push_str("/.*"),
        (true, false) => rx.push('/'),
        (false, true) => rx.push_str("(?:/.*)?"),
        (false, false) => {}
    }
    rx.push('$');
    let regex = Regex::new(&rx).map_err(|e| format!("route {} does not compile: {}", full, e))?;
    Ok((regex, names, statics))
}

/// A guarded node with children. Paths under it that no leaf matches still
/// have to pass its guard chain.
#[derive(Debug, Clone)]
struct GuardedLayout {
    regex: Regex,
    static_segments: usize,
    guards: Vec<RoleSet>,
}

#[derive(Default)]
struct Flattened {
    routes: Vec<CompiledRoute>,
    layouts: Vec<GuardedLayout>,
    problems: Vec<String>,
}

fn flatten(spec: &RouteSpec, parent: &str, chain: &[RoleSet], out: &mut Flattened) {
    let full = join(parent, spec.pattern);
    let mut guards = chain.to_vec();
    if let Some(allowed) = spec.allowed {
        guards.push(allowed);
    }
    // Nodes with children are layouts; only leaves are matchable.
    let compiled = compile_pattern(&full, !spec.children.is_empty());
    match compiled {
        Err(problem) => out.problems.push(problem),
        Ok((regex, param_names, static_segments)) if spec.children.is_empty() => {
            out.routes.push(CompiledRoute { pattern: full.clone(), regex, param_names, static_segments, guards: guards.clone(), kind: spec.kind });
        }
        Ok((regex, _, static_segments)) => {
            if !guards.is_empty() {
                out.layouts.push(GuardedLayout { regex, static_segments, guards: guards.clone() });
            }
        }
    }
    for child in &spec.children {
        flatten(child, &full, &guards, out);
    }
}

pub fn normalize_request_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or("").trim();
    let segs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segs.join("/"))
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
    layouts: Vec<GuardedLayout>,
    problems: Vec<String>,
}

impl RouteTable {
    /// Build the table. Patterns that fail to compile are left out and reported
    /// by `validate`.
    pub fn new(specs: &[RouteSpec]) -> Self {
        let mut out = Flattened::default();
        for spec in specs {
            flatten(spec, "", &[], &mut out);
        }
        Self { routes: out.routes, layouts: out.layouts, problems: out.problems }
    }

    pub fn len(&self) -> usize { self.routes.len() }

    pub fn is_empty(&self) -> bool { self.routes.is_empty() }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.pattern.as_str())
    }

    /// Most specific route for `path`: more static segments wins.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch<'_>> {
        let path = normalize_request_path(path);
        let mut best: Option<(&CompiledRoute, regex::Captures<'_>)> = None;
        for r in &self.routes {
            let Some(caps) = r.regex.captures(&path) else { continue; };
            let better = match &best {
                None => true,
                Some((b, _)) => r.static_segments > b.static_segments,
            };
            if better {
                best = Some((r, caps));
            }
        }
        let (route, caps) = best?;
        let params = route
            .param_names
            .iter()
            .enumerate()
            .filter_map(|(i, n)| caps.get(i + 1).map(|m| (n.clone(), m.as_str().to_string())))
            .collect();
        Some(RouteMatch { pattern: &route.pattern, guards: &route.guards, kind: route.kind, params })
    }

    /// Guard chain of the deepest guarded layout containing `path`; empty when
    /// the path lies outside every guarded subtree.
    pub fn enclosing_guards(&self, path: &str) -> &[RoleSet] {
        let path = normalize_request_path(path);
        self.layouts
            .iter()
            .filter(|l| l.regex.is_match(&path))
            .max_by_key(|l| l.static_segments)
            .map(|l| l.guards.as_slice())
            .unwrap_or(&[])
    }

    /// Structural problems in the table; empty when sound.
    ///
    /// Flags patterns that failed to compile, duplicate patterns, allow-lists
    /// that admit nobody, and routes that sit under a guarded pattern's path
    /// without inheriting any guard.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = self.problems.clone();
        let guarded_roots: Vec<&str> = self
            .routes
            .iter()
            .filter(|r| !r.guards.is_empty())
            .map(|r| r.pattern.as_str())
            .collect();
        for (i, r) in self.routes.iter().enumerate() {
            if self.routes[..i].iter().any(|o| o.pattern.eq_ignore_ascii_case(&r.pattern)) {
                problems.push(format!("duplicate route {}", r.pattern));
            }
            if r.guards.iter().any(|g| g.is_empty()) {
                problems.push(format!("route {} admits no role", r.pattern));
            }
            let under_guard = guarded_roots.iter().any(|root| {
                *root != "/" && r.pattern.to_ascii_lowercase().starts_with(&format!("{}/", root.to_ascii_lowercase()))
            });
            if under_guard && r.guards.is_empty() {
                problems.push(format!("route {} is below a guarded path but carries no guard", r.pattern));
            }
        }
        problems
    }
}

const ALL: &[Role] = &[Role::Administrador, Role::Usuario, Role::Electricista];
const ADMIN: &[Role] = &[Role::Administrador];
const ADMIN_USUARIO: &[Role] = &[Role::Administrador, Role::Usuario];
const USUARIO: &[Role] = &[Role::Usuario];

/// The dashboard's declared routes.
pub fn dashboard_specs() -> Vec<RouteSpec> {
    vec![
        RouteSpec::public("landing"),
        RouteSpec::sign_in("sign-in"),
        RouteSpec::public("404"),
        RouteSpec::guarded("dashboard", ALL).with_children(vec![
            RouteSpec::public(""),
            RouteSpec::guarded("user", ADMIN),
            RouteSpec::guarded("proyectos", ADMIN),
            RouteSpec::guarded("proyectos/detalles/:id", ADMIN),
            RouteSpec::guarded("reclamos", ADMIN_USUARIO),
            RouteSpec::guarded("reclamos/detalle/:id", ADMIN_USUARIO),
            RouteSpec::guarded("mantenimientos", ALL),
            RouteSpec::guarded("mantenimientos/detalles/:id", ALL),
            RouteSpec::guarded("mantenimientos/detalles/:id/tabla/:id", ALL),
            RouteSpec::guarded("mantenimientos/detalles/:id/tabla/:id/crearMantenimiento", ALL),
            RouteSpec::guarded("mantenimientos/detalles/:id/tabla/:id/ver/:id/:mantenimientoId", ALL),
            RouteSpec::guarded("mantenimientos/detalles/:id/tabla/:id/editarMantenimiento/:id", ALL),
            RouteSpec::guarded("mantenimientos/usuarioLogueado", USUARIO),
            RouteSpec::guarded("mantenimientos/usuarioLogueado/vista/:id", USUARIO),
            RouteSpec::guarded("mantenimientosAdmin", ADMIN),
            RouteSpec::guarded("mantenimientosAdmin/detalles/:id", ADMIN),
            RouteSpec::guarded("mantenimientosAdmin/detalles/:id/tabla/:id", ADMIN),
            RouteSpec::guarded("mantenimientosAdmin/detalles/:id/tabla/:id/verAdmin/:id/:mantenimientoId", ADMIN),
            RouteSpec::guarded("mantenimientosAdmin/detalles/:id/tabla/:id/editarMantenimientoAdmin/:id", ADMIN),
            RouteSpec::guarded("pagos", USUARIO),
            RouteSpec::guarded("pagosAdmin", ADMIN),
            RouteSpec::guarded("pagosAdmin/detalles/:id", ADMIN),
            RouteSpec::guarded("pagosAdmin/detalles/:id/tabla/:id", ADMIN),
        ]),
    ]
}

static DASHBOARD_ROUTES: Lazy<RouteTable> = Lazy::new(|| RouteTable::new(&dashboard_specs()));

pub fn dashboard_routes() -> &'static RouteTable {
    &DASHBOARD_ROUTES
}

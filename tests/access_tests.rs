//! Route guards and the role-filtered menu, driven through the `Gate` the way a
//! page shell would use it.

use std::cell::Cell;
use std::sync::Arc;

use anyhow::Result;
use dashboard_gate::access::{
    authorize_chain, check_path, dashboard_routes, dashboard_specs, filter_menu, menu_for, nav_data, policy_for,
    Decision, Gate, GuardOutcome, HistoryNavigator, Redirect, RouteKind, RouteSpec, RouteTable,
};
use dashboard_gate::identity::{Claims, CredentialCipher, MemorySessionStore, Role, RoleSet, SessionStore, TokenIssuer};
use dashboard_gate::AuthConfig;

const SECRET: &str = "gate-secret";
const NOW: i64 = 1_750_000_000;

fn blob(role: &str, exp: i64) -> String {
    let claims = Claims {
        id: "3".into(),
        email: "tecnico@cooperativa.org".into(),
        first_name: "Raúl".into(),
        last_name: "Ibáñez".into(),
        role: role.into(),
        exp,
    };
    let token = TokenIssuer::new("k").issue(&claims).unwrap();
    CredentialCipher::new(SECRET).seal(&token).unwrap()
}

fn gate_for(role: Option<&str>) -> (Gate, Arc<MemorySessionStore>, Arc<HistoryNavigator>) {
    let store = Arc::new(MemorySessionStore::new());
    if let Some(r) = role {
        store.set("token", &blob(r, NOW + 3600)).unwrap();
    }
    let nav = Arc::new(HistoryNavigator::new());
    let gate = Gate::new(AuthConfig::default().with_secret(SECRET), store.clone(), nav.clone());
    (gate, store, nav)
}

#[test]
fn menu_never_shows_an_excluded_title() -> Result<()> {
    for role in Role::ALL {
        let policy = policy_for(role);
        let menu = filter_menu(Some(role), nav_data());
        let excluded: Vec<_> = nav_data().iter().filter(|e| policy.excludes(&e.title)).collect();
        assert!(!excluded.is_empty());
        // a rename may reuse an excluded title, never the excluded entry itself
        for e in excluded {
            assert!(!menu.contains(e), "{} shows excluded {:?}", role, e);
        }
    }
    assert!(filter_menu(None, nav_data()).is_empty());
    Ok(())
}

#[test]
fn usuario_menu_has_no_proyectos() -> Result<()> {
    let menu = menu_for(dashboard_routes(), Some(Role::Usuario), nav_data());
    assert!(menu.iter().all(|e| e.title != "Proyectos" && e.title != "Usuarios"));
    let mant = menu.iter().find(|e| e.title == "Mantenimientos").expect("renamed entry");
    assert_eq!(mant.path, "/dashboard/mantenimientos/usuarioLogueado");
    Ok(())
}

#[test]
fn every_menu_link_is_reachable_for_its_role() -> Result<()> {
    for role in Role::ALL {
        for entry in menu_for(dashboard_routes(), Some(role), nav_data()) {
            assert_eq!(check_path(dashboard_routes(), Some(role), &entry.path), Decision::Allow, "{} -> {}", role, entry.path);
        }
    }
    Ok(())
}

#[test]
fn electricista_on_admin_route_goes_to_unauthorized_and_keeps_session() -> Result<()> {
    let (gate, store, nav) = gate_for(Some("electricista"));
    let rendered = Cell::new(false);
    let out = gate.guard_at("/dashboard/proyectos", NOW, |_| rendered.set(true));
    assert_eq!(out.redirect(), Some(Redirect::Unauthorized));
    assert!(!rendered.get());
    assert_eq!(nav.last().as_deref(), Some("/404"));
    assert!(store.get("token").is_some());
    Ok(())
}

#[test]
fn nested_guards_are_anded() -> Result<()> {
    // outer dashboard admits everyone, inner pagos admits only usuario
    let (gate, _, _) = gate_for(Some("administrador"));
    assert_eq!(gate.guard_at("/dashboard/pagos", NOW, |_| ()).redirect(), Some(Redirect::Unauthorized));
    let (gate, _, _) = gate_for(Some("usuario"));
    assert!(gate.guard_at("/dashboard/pagos", NOW, |_| ()).is_rendered());
    Ok(())
}

#[test]
fn no_credential_on_dashboard_goes_to_sign_in_once() -> Result<()> {
    let (gate, _, nav) = gate_for(None);
    let out = gate.guard_at("/dashboard/reclamos", NOW, |_| unreachable!("must not render"));
    match out {
        GuardOutcome::Redirected { to, path } => {
            assert_eq!(to, Redirect::SignIn);
            assert_eq!(path, "/sign-in");
        }
        GuardOutcome::Rendered(()) => panic!("rendered without a session"),
    }
    assert_eq!(nav.history(), vec!["/sign-in".to_string()]);
    Ok(())
}

#[test]
fn expired_session_on_dashboard_logs_out() -> Result<()> {
    let store = Arc::new(MemorySessionStore::new());
    store.set("token", &blob("administrador", NOW - 3600))?;
    let nav = Arc::new(HistoryNavigator::new());
    let gate = Gate::new(AuthConfig::default().with_secret(SECRET), store.clone(), nav.clone());
    assert_eq!(gate.guard_at("/dashboard", NOW, |_| ()).redirect(), Some(Redirect::SignIn));
    assert!(store.is_empty());
    Ok(())
}

#[test]
fn rendered_page_gets_params_menu_and_active_entry() -> Result<()> {
    let (gate, _, nav) = gate_for(Some("administrador"));
    let out = gate.guard_at("/dashboard/proyectos/detalles/88", NOW, |ctx| {
        assert_eq!(ctx.param("id"), Some("88"));
        assert_eq!(ctx.identity.as_ref().map(|i| i.role), Some(Role::Administrador));
        assert!(ctx.menu.iter().any(|e| e.title == "Usuarios"));
        ctx.pattern.clone()
    });
    assert_eq!(out, GuardOutcome::Rendered("/dashboard/proyectos/detalles/:id".to_string()));

    let active = gate.guard_at("/dashboard/Proyectos", NOW, |ctx| ctx.active.clone().map(|e| e.title));
    assert_eq!(active, GuardOutcome::Rendered(Some("Proyectos".to_string())));
    assert!(nav.history().is_empty());
    Ok(())
}

#[test]
fn public_pages_render_without_a_session() -> Result<()> {
    let (gate, _, nav) = gate_for(None);
    let out = gate.guard_at("/landing", NOW, |ctx| (ctx.identity.is_none(), ctx.menu.len()));
    assert_eq!(out, GuardOutcome::Rendered((true, 0)));
    assert!(gate.guard_at("/sign-in", NOW, |_| ()).is_rendered());
    assert!(nav.history().is_empty());
    Ok(())
}

#[test]
fn signed_in_caller_is_bounced_off_sign_in() -> Result<()> {
    let (gate, store, nav) = gate_for(Some("usuario"));
    assert_eq!(gate.guard_at("/sign-in", NOW, |_| ()).redirect(), Some(Redirect::Dashboard));
    assert_eq!(nav.last().as_deref(), Some("/dashboard"));
    assert!(store.get("token").is_some());
    Ok(())
}

#[test]
fn unknown_path_redirects_to_landing() -> Result<()> {
    let (gate, _, nav) = gate_for(Some("administrador"));
    assert_eq!(gate.guard_at("/dashboard/products", NOW, |_| ()).redirect(), Some(Redirect::Landing));
    assert_eq!(nav.last().as_deref(), Some("/landing"));

    let (gate, _, nav) = gate_for(None);
    assert_eq!(gate.guard_at("/nowhere", NOW, |_| ()).redirect(), Some(Redirect::Landing));
    assert_eq!(nav.history(), vec!["/landing".to_string()]);
    Ok(())
}

#[test]
fn unknown_dashboard_path_without_session_goes_to_sign_in() -> Result<()> {
    for path in ["/dashboard/products", "/dashboard/blog", "/dashboard/proyectos/detalles"] {
        let (gate, _, nav) = gate_for(None);
        assert_eq!(gate.guard_at(path, NOW, |_| ()).redirect(), Some(Redirect::SignIn), "{}", path);
        assert_eq!(nav.history(), vec!["/sign-in".to_string()], "{}", path);
    }

    // an expired credential is cleared on the way
    let store = Arc::new(MemorySessionStore::new());
    store.set("token", &blob("usuario", NOW - 1))?;
    let gate = Gate::new(AuthConfig::default().with_secret(SECRET), store.clone(), Arc::new(HistoryNavigator::new()));
    assert_eq!(gate.guard_at("/dashboard/products", NOW, |_| ()).redirect(), Some(Redirect::SignIn));
    assert!(store.is_empty());
    Ok(())
}

struct Leaf {
    pattern: String,
    chain: Vec<RoleSet>,
    kind: RouteKind,
}

fn leaves(spec: &RouteSpec, parent: &str, chain: &[RoleSet], out: &mut Vec<Leaf>) {
    let seg = spec.pattern.trim_matches('/');
    let full = if seg.is_empty() { parent.to_string() } else { format!("{}/{}", parent, seg) };
    let mut chain = chain.to_vec();
    chain.extend(spec.allowed);
    if spec.children.is_empty() {
        out.push(Leaf { pattern: full.clone(), chain: chain.clone(), kind: spec.kind });
    }
    for child in &spec.children {
        leaves(child, &full, &chain, out);
    }
}

fn concrete(pattern: &str) -> String {
    pattern
        .split('/')
        .map(|s| if s.starts_with(':') { "17" } else { s })
        .collect::<Vec<_>>()
        .join("/")
}

#[test]
fn every_route_admits_exactly_its_declared_roles() -> Result<()> {
    let mut all = Vec::new();
    for spec in dashboard_specs() {
        leaves(&spec, "", &[], &mut all);
    }
    assert!(all.len() > 20);

    let callers: Vec<Option<Role>> = std::iter::once(None).chain(Role::ALL.into_iter().map(Some)).collect();
    for leaf in &all {
        let path = concrete(&leaf.pattern);
        let m = dashboard_routes().match_path(&path).expect("declared route matches");
        assert_eq!(m.pattern, leaf.pattern);
        assert_eq!(m.guards, leaf.chain.as_slice());

        for &role in &callers {
            let admitted = leaf.chain.iter().all(|set| role.map(|r| set.contains(r)).unwrap_or(false));
            let expected_guard = if admitted {
                Decision::Allow
            } else if role.is_none() {
                Decision::RedirectTo(Redirect::SignIn)
            } else {
                Decision::RedirectTo(Redirect::Unauthorized)
            };
            assert_eq!(authorize_chain(role, &leaf.chain), expected_guard, "{:?} on {}", role, path);

            let renders = admitted && !(leaf.kind == RouteKind::SignIn && role.is_some());
            let (gate, _, _) = gate_for(role.map(|r| r.as_str()));
            let rendered = Cell::new(false);
            let out = gate.guard_at(&path, NOW, |_| rendered.set(true));
            assert_eq!(rendered.get(), renders, "{:?} on {}", role, path);
            assert_eq!(out.is_rendered(), renders, "{:?} on {}", role, path);
            if !renders {
                assert!(out.redirect().is_some());
            }
        }
    }
    Ok(())
}

#[test]
fn custom_route_table_is_validated_and_used() -> Result<()> {
    let specs = vec![
        RouteSpec::sign_in("login"),
        RouteSpec::guarded("panel", &[Role::Administrador]).with_children(vec![RouteSpec::public("informes/:anio")]),
    ];
    let table = RouteTable::new(&specs);
    assert!(table.validate().is_empty());

    let store = Arc::new(MemorySessionStore::new());
    store.set("token", &blob("usuario", NOW + 60))?;
    let nav = Arc::new(HistoryNavigator::new());
    let gate = Gate::with_routes(AuthConfig::default().with_secret(SECRET), store, nav, Arc::new(table));
    assert_eq!(gate.guard_at("/panel/informes/2024", NOW, |_| ()).redirect(), Some(Redirect::Unauthorized));
    Ok(())
}

//! Navigation menu model and the per-role menu policy.
//!
//! The menu is declared once (`nav_data`) and reshaped per role by a fixed table:
//! entries whose title a role excludes are dropped, then the first matching
//! rename rule retitles or repaths what is left.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::identity::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavEntry {
    pub title: String,
    pub path: String,
    pub icon: String,
}

impl NavEntry {
    fn new(title: &str, path: &str, icon: &str) -> Self {
        Self { title: title.to_string(), path: path.to_string(), icon: icon.to_string() }
    }

    pub fn icon_src(&self) -> String {
        format!("/assets/icons/navbar/{}.svg", self.icon)
    }
}

static NAV_DATA: Lazy<Vec<NavEntry>> = Lazy::new(|| {
    vec![
        NavEntry::new("Menu Principal", "/dashboard", "ic-analytics"),
        NavEntry::new("Usuarios", "/dashboard/user", "ic-user"),
        NavEntry::new("Proyectos", "/dashboard/Proyectos", "ic-folder"),
        NavEntry::new("Reclamos", "/dashboard/Reclamos", "ic-book"),
        NavEntry::new("Mantenimientos", "/dashboard/Mantenimientos", "ic-note"),
        NavEntry::new("Mantenimiento", "/dashboard/mantenimientos/usuarioLogueado", "ic-note"),
        NavEntry::new("MantenimientoAdmin", "/dashboard/mantenimientosAdmin", "ic-note"),
        NavEntry::new("Pagos", "/dashboard/pagos", "ic-payment"),
    ]
});

/// The static dashboard menu, before any role filtering.
pub fn nav_data() -> &'static [NavEntry] {
    &NAV_DATA
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenameRule {
    pub title: &'static str,
    pub new_title: Option<&'static str>,
    pub new_path: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuPolicy {
    pub excluded: &'static [&'static str],
    pub renames: &'static [RenameRule],
}

impl MenuPolicy {
    pub fn excludes(&self, title: &str) -> bool {
        self.excluded.iter().any(|t| *t == title)
    }

    /// Apply the first matching rename rule, if any.
    pub fn rename(&self, entry: NavEntry) -> NavEntry {
        match self.renames.iter().find(|r| r.title == entry.title) {
            Some(rule) => NavEntry {
                title: rule.new_title.map(str::to_string).unwrap_or(entry.title),
                path: rule.new_path.map(str::to_string).unwrap_or(entry.path),
                icon: entry.icon,
            },
            None => entry,
        }
    }
}

static ADMINISTRADOR: MenuPolicy = MenuPolicy {
    excluded: &["Mantenimiento", "Mantenimientos", "Pagos"],
    renames: &[
        RenameRule { title: "MantenimientoAdmin", new_title: Some("Mantenimientos"), new_path: None },
        RenameRule { title: "MantenimientosAdmin", new_title: None, new_path: Some("/dashboard/mantenimientosAdmin") },
        RenameRule { title: "PagosAdmin", new_title: Some("Pagos"), new_path: None },
    ],
};

// The second Mantenimiento rule never fires: the first one claims the title.
static USUARIO: MenuPolicy = MenuPolicy {
    excluded: &["Proyectos", "Usuarios", "Mantenimientos", "MantenimientoAdmin", "PagosAdmin"],
    renames: &[
        RenameRule { title: "Mantenimiento", new_title: Some("Mantenimientos"), new_path: None },
        RenameRule { title: "Mantenimiento", new_title: None, new_path: Some("/dashboard/mantenimientos/usuarioLogueado") },
    ],
};

static ELECTRICISTA: MenuPolicy = MenuPolicy {
    excluded: &["Mantenimiento", "MantenimientoAdmin", "Proyectos", "Usuarios", "Reclamos"],
    renames: &[
        RenameRule { title: "Mantenimientos", new_title: None, new_path: Some("/dashboard/Mantenimientos") },
    ],
};

pub fn policy_for(role: Role) -> &'static MenuPolicy {
    match role {
        Role::Administrador => &ADMINISTRADOR,
        Role::Usuario => &USUARIO,
        Role::Electricista => &ELECTRICISTA,
    }
}

/// Reshape `nav` for `role`. Without a role nothing is shown.
pub fn filter_menu(role: Option<Role>, nav: &[NavEntry]) -> Vec<NavEntry> {
    let Some(role) = role else { return Vec::new(); };
    let policy = policy_for(role);
    nav.iter()
        .filter(|e| !policy.excludes(&e.title))
        .cloned()
        .map(|e| policy.rename(e))
        .collect()
}

fn normalize_path(p: &str) -> String {
    let trimmed = p.trim();
    let trimmed = if trimmed.len() > 1 { trimmed.trim_end_matches('/') } else { trimmed };
    trimmed.to_ascii_lowercase()
}

/// The entry to highlight for the current location: exact path match,
/// ignoring case and a trailing slash.
pub fn active_entry<'a>(menu: &'a [NavEntry], current_path: &str) -> Option<&'a NavEntry> {
    let current = normalize_path(current_path);
    menu.iter().find(|e| !e.path.is_empty() && normalize_path(&e.path) == current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(menu: &[NavEntry]) -> Vec<&str> {
        menu.iter().map(|e| e.title.as_str()).collect()
    }

    #[test]
    fn administrador_menu() {
        let m = filter_menu(Some(Role::Administrador), nav_data());
        assert_eq!(titles(&m), vec!["Menu Principal", "Usuarios", "Proyectos", "Reclamos", "Mantenimientos"]);
        let mant = m.iter().find(|e| e.title == "Mantenimientos").unwrap();
        assert_eq!(mant.path, "/dashboard/mantenimientosAdmin");
    }

    #[test]
    fn usuario_menu() {
        let m = filter_menu(Some(Role::Usuario), nav_data());
        assert_eq!(titles(&m), vec!["Menu Principal", "Reclamos", "Mantenimientos", "Pagos"]);
        let mant = m.iter().find(|e| e.title == "Mantenimientos").unwrap();
        assert_eq!(mant.path, "/dashboard/mantenimientos/usuarioLogueado");
    }

    #[test]
    fn electricista_menu() {
        let m = filter_menu(Some(Role::Electricista), nav_data());
        assert_eq!(titles(&m), vec!["Menu Principal", "Mantenimientos", "Pagos"]);
    }

    #[test]
    fn no_role_no_menu() {
        assert!(filter_menu(None, nav_data()).is_empty());
    }

    #[test]
    fn first_rename_rule_wins() {
        let e = NavEntry::new("Mantenimiento", "/x", "ic-note");
        let renamed = policy_for(Role::Usuario).rename(e);
        assert_eq!(renamed.title, "Mantenimientos");
        assert_eq!(renamed.path, "/x");
    }

    #[test]
    fn active_entry_ignores_case_and_trailing_slash() {
        let m = filter_menu(Some(Role::Administrador), nav_data());
        assert_eq!(active_entry(&m, "/dashboard/proyectos/").unwrap().title, "Proyectos");
        assert_eq!(active_entry(&m, "/dashboard").unwrap().title, "Menu Principal");
        assert!(active_entry(&m, "/dashboard/proyectos/detalles/7").is_none());
    }

    #[test]
    fn icon_source_path() {
        assert_eq!(nav_data()[0].icon_src(), "/assets/icons/navbar/ic-analytics.svg");
    }
}

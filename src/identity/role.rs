use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::session::SessionError;

/// Dashboard roles. The set is closed: a credential naming anything else is malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Administrador,
    Usuario,
    Electricista,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Administrador, Role::Usuario, Role::Electricista];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrador => "administrador",
            Role::Usuario => "usuario",
            Role::Electricista => "electricista",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "administrador" => Ok(Role::Administrador),
            "usuario" => Ok(Role::Usuario),
            "electricista" => Ok(Role::Electricista),
            other => Err(SessionError::UnknownRole(other.to_string())),
        }
    }
}

/// Allow-list of roles attached to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const fn empty() -> Self { RoleSet(0) }

    pub const fn all() -> Self { RoleSet(0b111) }

    const fn bit(role: Role) -> u8 {
        match role {
            Role::Administrador => 0b001,
            Role::Usuario => 0b010,
            Role::Electricista => 0b100,
        }
    }

    pub const fn of(roles: &[Role]) -> Self {
        let mut bits = 0u8;
        let mut i = 0;
        while i < roles.len() {
            bits |= Self::bit(roles[i]);
            i += 1;
        }
        RoleSet(bits)
    }

    pub fn contains(&self, role: Role) -> bool { self.0 & Self::bit(role) != 0 }

    pub fn is_empty(&self) -> bool { self.0 == 0 }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        Role::ALL.into_iter().filter(move |r| self.contains(*r))
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|r| r.as_str()).collect();
        write!(f, "[{}]", names.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_only_known_roles() {
        assert_eq!("usuario".parse::<Role>().unwrap(), Role::Usuario);
        assert!("Usuario".parse::<Role>().is_err());
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn role_set_membership() {
        let set = RoleSet::of(&[Role::Administrador, Role::Usuario]);
        assert!(set.contains(Role::Administrador));
        assert!(!set.contains(Role::Electricista));
        assert_eq!(set.to_string(), "[administrador,usuario]");
        assert!(RoleSet::empty().is_empty());
        assert_eq!(RoleSet::all().iter().count(), 3);
    }
}

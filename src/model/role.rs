use std::str::FromStr;

use strum_macros::{Display, EnumString};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, EnumString)]
pub enum Role {
    Admin,
    #[strum(serialize = "HR")]
    Hr,
    Manager,
    TeamLead,
    Employee,
}

impl Role {
    pub fn from_name(name: &str) -> Option<Self> {
        Role::from_str(name).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Hr => "HR",
            Role::Manager => "Manager",
            Role::TeamLead => "TeamLead",
            Role::Employee => "Employee",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_role_names() {
        assert_eq!(Role::from_name("Admin"), Some(Role::Admin));
        assert_eq!(Role::from_name("HR"), Some(Role::Hr));
        assert_eq!(Role::from_name("TeamLead"), Some(Role::TeamLead));
        assert_eq!(Role::from_name("intern"), None);
    }

    #[test]
    fn round_trips_through_as_str() {
        for role in [
            Role::Admin,
            Role::Hr,
            Role::Manager,
            Role::TeamLead,
            Role::Employee,
        ] {
            assert_eq!(Role::from_name(role.as_str()), Some(role));
        }
    }
}

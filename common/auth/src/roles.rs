use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Roles a token can carry. The set is closed; anything else fails verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Manager,
    Server,
    Cashier,
    Kitchen,
    Expo,
    Station,
    Customer,
}

/// Identity tier a role belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Membership-backed staff accounts.
    Persistent,
    /// Shared kitchen/expo devices bound to one restaurant at issuance.
    Station,
    /// Self-service customer sessions with no user row.
    Ephemeral,
}

impl Role {
    pub const ALL: [Role; 8] = [
        Role::Owner,
        Role::Manager,
        Role::Server,
        Role::Cashier,
        Role::Kitchen,
        Role::Expo,
        Role::Station,
        Role::Customer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Manager => "manager",
            Role::Server => "server",
            Role::Cashier => "cashier",
            Role::Kitchen => "kitchen",
            Role::Expo => "expo",
            Role::Station => "station",
            Role::Customer => "customer",
        }
    }

    pub fn tier(&self) -> Tier {
        match self {
            Role::Owner | Role::Manager | Role::Server | Role::Cashier => Tier::Persistent,
            Role::Kitchen | Role::Expo | Role::Station => Tier::Station,
            Role::Customer => Tier::Ephemeral,
        }
    }
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Persistent => "persistent",
            Tier::Station => "station",
            Tier::Ephemeral => "ephemeral",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| format!("unknown role '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_map_to_tiers() {
        assert_eq!(Role::Owner.tier(), Tier::Persistent);
        assert_eq!(Role::Cashier.tier(), Tier::Persistent);
        assert_eq!(Role::Kitchen.tier(), Tier::Station);
        assert_eq!(Role::Expo.tier(), Tier::Station);
        assert_eq!(Role::Customer.tier(), Tier::Ephemeral);
    }

    #[test]
    fn parse_is_case_insensitive_and_closed() {
        assert_eq!("Manager".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!(" expo ".parse::<Role>().unwrap(), Role::Expo);
        assert!("super_admin".parse::<Role>().is_err());
    }
}

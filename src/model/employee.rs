use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Role tag as stored and as sent on the wire.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum RoleKind {
    #[serde(alias = "Fixed")]
    #[strum(to_string = "FixedSite", serialize = "Fixed")]
    FixedSite,
    Roaming,
    Supervisor,
}

/// What an employee is allowed to do, with the site it is bound to.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum EmployeeRole {
    FixedSite(String),
    Roaming,
    Supervisor(String),
}

impl EmployeeRole {
    /// Builds a role from its stored parts. Fixed-site and supervisor roles need a site.
    pub fn from_parts(kind: RoleKind, site_id: Option<String>) -> Option<Self> {
        let site_id = site_id.filter(|s| !s.trim().is_empty());
        match (kind, site_id) {
            (RoleKind::FixedSite, Some(site)) => Some(EmployeeRole::FixedSite(site)),
            (RoleKind::Supervisor, Some(site)) => Some(EmployeeRole::Supervisor(site)),
            (RoleKind::Roaming, _) => Some(EmployeeRole::Roaming),
            _ => None,
        }
    }

    pub fn kind(&self) -> RoleKind {
        match self {
            EmployeeRole::FixedSite(_) => RoleKind::FixedSite,
            EmployeeRole::Roaming => RoleKind::Roaming,
            EmployeeRole::Supervisor(_) => RoleKind::Supervisor,
        }
    }

    pub fn site_id(&self) -> Option<&str> {
        match self {
            EmployeeRole::FixedSite(site) | EmployeeRole::Supervisor(site) => Some(site),
            EmployeeRole::Roaming => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Employee {
    /// Login key
    pub identifier: String,
    pub name: String,
    pub role: EmployeeRole,
    pub position: String,
    /// argon2 PHC string
    pub credential_hash: String,
}

impl Employee {
    pub fn site_id(&self) -> Option<&str> {
        self.role.site_id()
    }
}

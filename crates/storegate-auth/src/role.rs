//! Staff role enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles carried in access-token claims and checked against the
/// destination policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full system administrator.
    Admin,
    /// Store manager.
    Manager,
    /// Analytics/reporting staff.
    Analyst,
    /// Stockroom and inventory staff.
    Inventory,
    /// Sales floor staff.
    Sales,
    /// Register operator.
    Cashier,
    /// Finance and payments staff.
    Finance,
    /// Human resources staff.
    Hr,
}

impl Role {
    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Analyst => "analyst",
            Self::Inventory => "inventory",
            Self::Sales => "sales",
            Self::Cashier => "cashier",
            Self::Finance => "finance",
            Self::Hr => "hr",
        }
    }

    /// Check if this role is an admin.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = storegate_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "analyst" => Ok(Self::Analyst),
            "inventory" => Ok(Self::Inventory),
            "sales" => Ok(Self::Sales),
            "cashier" => Ok(Self::Cashier),
            "finance" => Ok(Self::Finance),
            "hr" => Ok(Self::Hr),
            _ => Err(storegate_core::AppError::validation(format!(
                "Invalid role: '{s}'"
            ))),
        }
    }
}

//! User role model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role carried in the access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Manager,
    WarehouseStaff,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::WarehouseStaff => "warehouse_staff",
        }
    }

    /// Roles allowed to read the audit trail.
    pub fn can_view_audit_logs(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Manager)
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "manager" => Ok(UserRole::Manager),
            "warehouse_staff" => Ok(UserRole::WarehouseStaff),
            _ => Err(format!("Invalid user role: {}", s)),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_str() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("Manager".parse::<UserRole>().unwrap(), UserRole::Manager);
        assert_eq!(
            "warehouse_staff".parse::<UserRole>().unwrap(),
            UserRole::WarehouseStaff
        );
        assert!("owner".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_audit_log_visibility() {
        assert!(UserRole::Admin.can_view_audit_logs());
        assert!(UserRole::Manager.can_view_audit_logs());
        assert!(!UserRole::WarehouseStaff.can_view_audit_logs());
    }

    #[test]
    fn test_role_serde() {
        let json = serde_json::to_value(UserRole::WarehouseStaff).unwrap();
        assert_eq!(json, serde_json::json!("warehouse_staff"));
        assert_eq!(UserRole::Manager.to_string(), "manager");
    }
}

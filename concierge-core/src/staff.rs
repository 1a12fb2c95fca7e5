use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::booking::validate_email;
use crate::{CoreError, CoreResult};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    FrontDesk,
    Housekeeping,
    Accounts,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::FrontDesk => "FRONT_DESK",
            Role::Housekeeping => "HOUSEKEEPING",
            Role::Accounts => "ACCOUNTS",
        }
    }

    pub fn allows(&self, permission: Permission) -> bool {
        use Permission::*;
        match self {
            Role::Admin => true,
            Role::Manager => !matches!(permission, ManageStaff),
            Role::FrontDesk => matches!(permission, ManageBookings | FrontDesk | ManagePayments | ViewRooms),
            Role::Housekeeping => matches!(permission, Housekeeping | ViewRooms),
            Role::Accounts => matches!(permission, ManagePayments),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "MANAGER" => Ok(Role::Manager),
            "FRONT_DESK" => Ok(Role::FrontDesk),
            "HOUSEKEEPING" => Ok(Role::Housekeeping),
            "ACCOUNTS" => Ok(Role::Accounts),
            other => Err(CoreError::ValidationError(format!("Unknown role: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ManageBookings,
    FrontDesk,
    ForceCheckout,
    ManagePayments,
    Housekeeping,
    ViewRooms,
    ManageRooms,
    ManageStaff,
    ViewAudit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffUser {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl StaffUser {
    /// Build a new account from an already-hashed password.
    pub fn create(
        username: &str,
        display_name: &str,
        email: &str,
        role: Role,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        let username = normalize_username(username)?;
        validate_email(email)?;
        Ok(Self {
            id: Uuid::new_v4(),
            username,
            display_name: display_name.trim().to_string(),
            email: email.trim().to_lowercase(),
            role,
            password_hash,
            active: true,
            created_at: now,
            last_login_at: None,
        })
    }

    pub fn actor(&self) -> Actor {
        Actor {
            staff_id: self.id,
            username: self.username.clone(),
            role: self.role,
        }
    }
}

/// The authenticated staff member performing an operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub staff_id: Uuid,
    pub username: String,
    pub role: Role,
}

impl Actor {
    /// Background jobs act as this identity in the audit log.
    pub fn system() -> Self {
        Self {
            staff_id: Uuid::nil(),
            username: "system".to_string(),
            role: Role::Admin,
        }
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.role.allows(permission)
    }
}

/// Lowercased; 3-32 chars of `[a-z0-9._-]`.
pub fn normalize_username(username: &str) -> CoreResult<String> {
    let username = username.trim().to_lowercase();
    let valid_chars = username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'));
    if !(3..=32).contains(&username.len()) || !valid_chars {
        return Err(CoreError::ValidationError(format!("Invalid username: {}", username)));
    }
    Ok(username)
}

pub fn validate_password(password: &str) -> CoreResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CoreError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

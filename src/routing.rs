//! Where a visitor lands after sign-in, shared by every entry point.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::User;

pub const ADMIN_HOME: &str = "/admin";
pub const OWNER_HOME: &str = "/owner";
pub const PUBLIC_DIRECTORY: &str = "/dsar";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Owner,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Admins go to the admin console; everyone else with a profile is an owner.
pub fn route_for_role(role: &str) -> &'static str {
    match role.parse::<Role>() {
        Ok(Role::Admin) => ADMIN_HOME,
        _ => OWNER_HOME,
    }
}

/// Anonymous traffic goes to the public directory.
pub fn route_for(user: Option<&User>) -> &'static str {
    user.map_or(PUBLIC_DIRECTORY, |user| route_for_role(&user.role))
}

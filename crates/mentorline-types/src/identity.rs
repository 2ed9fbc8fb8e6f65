//! Authenticated principal and mentor directory types.
//!
//! Authentication itself happens outside the engine; every core call receives
//! an already-verified [`Principal`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Role carried by the identity provider's token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Mentor,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Mentor => write!(f, "mentor"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "mentor" => Ok(Role::Mentor),
            "admin" => Ok(Role::Admin),
            other => Err(format!("invalid role: '{other}'")),
        }
    }
}

/// The caller of a core operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Approval status of a mentor in the external onboarding workflow.
///
/// Only `Approved` mentors may have new sessions created with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentorStatus {
    Pending,
    Approved,
    Rejected,
    Suspended,
}

impl MentorStatus {
    pub fn is_active(self) -> bool {
        self == MentorStatus::Approved
    }
}

impl fmt::Display for MentorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MentorStatus::Pending => write!(f, "pending"),
            MentorStatus::Approved => write!(f, "approved"),
            MentorStatus::Rejected => write!(f, "rejected"),
            MentorStatus::Suspended => write!(f, "suspended"),
        }
    }
}

impl FromStr for MentorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(MentorStatus::Pending),
            "approved" => Ok(MentorStatus::Approved),
            "rejected" => Ok(MentorStatus::Rejected),
            "suspended" => Ok(MentorStatus::Suspended),
            other => Err(format!("invalid mentor status: '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_case_insensitive() {
        assert_eq!("Mentor".parse::<Role>().unwrap(), Role::Mentor);
        assert!("guest".parse::<Role>().is_err());
    }

    #[test]
    fn test_only_approved_mentor_is_active() {
        assert!(MentorStatus::Approved.is_active());
        assert!(!MentorStatus::Pending.is_active());
        assert!(!MentorStatus::Suspended.is_active());
    }
}

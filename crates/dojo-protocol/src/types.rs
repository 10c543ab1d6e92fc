//! Wire types for the session endpoints of the backend API.
//!
//! The backend speaks camelCase JSON, so every struct here carries
//! `#[serde(rename_all = "camelCase")]`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// What a user may see and do on the site.
///
/// Variants are declared from least to most privileged, so the derived
/// `Ord` gives the privilege order:
///
/// ```text
/// Guest < Student < Instructor < Admin
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
    Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Not logged in, or logged in without a membership.
    #[default]
    Guest,
    Student,
    Instructor,
    Admin,
}

impl Role {
    /// Returns `true` if this role grants at least `required`.
    ///
    /// ```rust
    /// use dojo_protocol::Role;
    /// assert!(Role::Admin.at_least(Role::Instructor));
    /// assert!(!Role::Student.at_least(Role::Instructor));
    /// ```
    pub fn at_least(self, required: Role) -> bool {
        self >= required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Guest => "guest",
            Self::Student => "student",
            Self::Instructor => "instructor",
            Self::Admin => "admin",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// UserProfile
// ---------------------------------------------------------------------------

/// The signed-in user as the backend describes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: Role,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of the refresh-token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl RefreshRequest {
    pub fn new(refresh_token: impl Into<String>) -> Self {
        Self {
            refresh_token: refresh_token.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// TokenResponse
// ---------------------------------------------------------------------------

/// What the login and refresh endpoints answer with.
///
/// Every field is optional on the wire: the refresh endpoint may omit the
/// refresh token (keep using the old one) and usually omits the user.
/// Use [`TokenResponse::access_token`] to get a token that is actually
/// usable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

impl TokenResponse {
    /// Returns the access token, rejecting a missing or blank one.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidMessage`] when there's nothing to authenticate with.
    pub fn access_token(&self) -> Result<&str, ProtocolError> {
        match self.access_token.as_deref() {
            Some(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(ProtocolError::InvalidMessage(
                "token response carries no access token".into(),
            )),
        }
    }

    /// The refresh token, treating a blank string as absent.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }
}

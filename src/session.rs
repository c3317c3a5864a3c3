//! User sessions and capabilities.
//!
//! A user's role is resolved exactly once, when the login completes, into a
//! fixed capability set. Everything downstream asks the session
//! `can(Capability::...)` instead of looking at the e-mail address again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// Something a signed-in user is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    RunAnalysis,
    ViewOwnHistory,
    DeleteOwnAnalysis,
    ViewAllAnalyses,
    DeleteAnyAnalysis,
}

/// Role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Member => write!(f, "member"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl Role {
    /// The capability set granted by this role.
    pub fn capabilities(&self) -> BTreeSet<Capability> {
        let mut caps: BTreeSet<Capability> = [
            Capability::RunAnalysis,
            Capability::ViewOwnHistory,
            Capability::DeleteOwnAnalysis,
        ]
        .into_iter()
        .collect();

        if *self == Role::Admin {
            caps.insert(Capability::ViewAllAnalyses);
            caps.insert(Capability::DeleteAnyAnalysis);
        }

        caps
    }
}

/// Maps an authenticated identity to a role.
#[derive(Debug, Clone, Default)]
pub struct RoleResolver {
    admin_emails: Vec<String>,
}

impl RoleResolver {
    pub fn new<I, S>(admin_emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            admin_emails: admin_emails
                .into_iter()
                .map(|e| e.as_ref().trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn resolve(&self, email: &str) -> Role {
        let email = email.trim().to_lowercase();
        if self.admin_emails.contains(&email) {
            Role::Admin
        } else {
            Role::Member
        }
    }
}

/// An authenticated user with a resolved capability set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub role: Role,
    capabilities: BTreeSet<Capability>,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }
}

/// Errors raised by invalid session transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("email must not be empty")]
    EmptyEmail,
}

/// Authentication state of the application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticating {
        email: String,
    },
    Authenticated(Session),
}

impl SessionState {
    /// Short name of the current state.
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Anonymous => "anonymous",
            SessionState::Authenticating { .. } => "authenticating",
            SessionState::Authenticated(_) => "authenticated",
        }
    }

    /// The active session, if authenticated.
    #[cfg(test)]
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    /// Anonymous -> Authenticating.
    pub fn begin_login(&mut self, email: &str) -> Result<(), SessionError> {
        if !matches!(self, SessionState::Anonymous) {
            return Err(SessionError::InvalidTransition {
                action: "begin login",
                state: self.name(),
            });
        }

        let email = email.trim();
        if email.is_empty() {
            return Err(SessionError::EmptyEmail);
        }

        debug!("Login started for {}", email);
        *self = SessionState::Authenticating {
            email: email.to_string(),
        };
        Ok(())
    }

    /// Authenticating -> Authenticated, resolving the role once.
    pub fn complete_login(
        &mut self,
        user_id: &str,
        resolver: &RoleResolver,
    ) -> Result<Session, SessionError> {
        let email = match &*self {
            SessionState::Authenticating { email } => email.clone(),
            _ => {
                return Err(SessionError::InvalidTransition {
                    action: "complete login",
                    state: self.name(),
                })
            }
        };

        let role = resolver.resolve(&email);
        info!("Signed in as {} ({})", email, role);

        let session = Session {
            user_id: user_id.to_string(),
            email,
            role,
            capabilities: role.capabilities(),
            started_at: Utc::now(),
        };
        *self = SessionState::Authenticated(session.clone());
        Ok(session)
    }

    /// Authenticating -> Anonymous.
    pub fn fail_login(&mut self) -> Result<(), SessionError> {
        if !matches!(self, SessionState::Authenticating { .. }) {
            return Err(SessionError::InvalidTransition {
                action: "fail login",
                state: self.name(),
            });
        }
        *self = SessionState::Anonymous;
        Ok(())
    }

    /// Any state -> Anonymous.
    pub fn logout(&mut self) {
        if let SessionState::Authenticated(session) = self {
            debug!("Signed out {}", session.email);
        }
        *self = SessionState::Anonymous;
    }
}

/// Run the whole login flow for a locally trusted identity.
///
/// The state is left `Authenticated` on success and `Anonymous` on failure.
pub fn login(
    state: &mut SessionState,
    email: &str,
    resolver: &RoleResolver,
) -> Result<Session, SessionError> {
    state.begin_login(email)?;
    match state.complete_login(email.trim(), resolver) {
        Ok(session) => Ok(session),
        Err(e) => {
            state.fail_login()?;
            Err(e)
        }
    }
}

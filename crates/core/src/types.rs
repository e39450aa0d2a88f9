//! Identity and enumeration types shared by every layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InvalidAction;

/// The authenticated identity making a request.
///
/// Supplied by the authentication collaborator; the core never creates one
/// from request payload data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Principal(id.into())
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store-assigned record identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of activity a record tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Login,
    Logout,
    UploadFile,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Login, Action::Logout, Action::UploadFile];

    /// Wire name, e.g. `UPLOAD_FILE`.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Login => "LOGIN",
            Action::Logout => "LOGOUT",
            Action::UploadFile => "UPLOAD_FILE",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Action::Login => "Login",
            Action::Logout => "Logout",
            Action::UploadFile => "File Upload",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = InvalidAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| InvalidAction {
                value: s.to_string(),
            })
    }
}

/// Lifecycle status of a record.
///
/// Records start at [`Status::Pending`] and only move forward through
/// [`Status::InProgress`] to the terminal [`Status::Done`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Pending,
    InProgress,
    Done,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Pending, Status::InProgress, Status::Done];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "PENDING",
            Status::InProgress => "IN_PROGRESS",
            Status::Done => "DONE",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::InProgress => "In Progress",
            Status::Done => "Completed",
        }
    }

    /// Parse a wire name. Matching is exact and case-sensitive.
    pub fn parse(s: &str) -> Option<Status> {
        Status::ALL.into_iter().find(|st| st.as_str() == s)
    }

    /// The statuses reachable from `self` by a single different-value move.
    ///
    /// This is the only copy of the transition table.
    pub fn allowed_next(self) -> &'static [Status] {
        match self {
            Status::Pending => &[Status::InProgress],
            Status::InProgress => &[Status::Done],
            Status::Done => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

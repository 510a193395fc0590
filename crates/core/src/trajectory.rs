// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trajectory identifier.
//!
//! The id is embedded verbatim in object names (`trajectory-<id>/...`),
//! cache paths (`<root>/<id>/...`) and coordination keys
//! (`trajectory:<id>:...`), so anything that would escape a path segment,
//! split a key on `:`, or act as a scan wildcard is rejected up front.
//! Leading dots are reserved for hidden cache entries such as `.staging`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid trajectory id {0:?}")]
pub struct InvalidTrajectoryId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrajectoryId(String);

impl TrajectoryId {
    pub fn parse(id: impl Into<String>) -> Result<Self, InvalidTrajectoryId> {
        let id = id.into();
        if is_valid(&id) {
            Ok(Self(id))
        } else {
            Err(InvalidTrajectoryId(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && !id.contains("..")
        && !id.chars().any(|c| {
            c.is_whitespace() || c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '[' | ']')
        })
}

impl fmt::Display for TrajectoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TrajectoryId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for TrajectoryId {
    type Err = InvalidTrajectoryId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TrajectoryId {
    type Error = InvalidTrajectoryId;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<TrajectoryId> for String {
    fn from(id: TrajectoryId) -> Self {
        id.0
    }
}

impl PartialEq<str> for TrajectoryId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TrajectoryId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
#[path = "trajectory_tests.rs"]
mod tests;

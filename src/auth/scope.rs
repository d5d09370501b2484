//! OAuth2 scopes.
//!
//! A [`Scope`] is a set of scope URLs, carried on the wire as one
//! space-separated string (`"https://...spreadsheets https://...drive"`).

use std::fmt;

use serde::{Deserialize, Serialize};

const SHEETS: &str = "https://www.googleapis.com/auth/spreadsheets";
const SHEETS_READONLY: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
const DRIVE: &str = "https://www.googleapis.com/auth/drive";
const DRIVE_FILE: &str = "https://www.googleapis.com/auth/drive.file";
const DRIVE_READONLY: &str = "https://www.googleapis.com/auth/drive.readonly";

/// A set of OAuth2 scopes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(String);

impl Scope {
    /// Builds a scope from a space-separated list of scope URLs.
    pub fn new(scopes: impl Into<String>) -> Self {
        let raw: String = scopes.into();
        Self(raw.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    /// Read/write access to spreadsheets.
    pub fn sheets() -> Self {
        Self::new(SHEETS)
    }

    /// Read-only access to spreadsheets.
    pub fn sheets_readonly() -> Self {
        Self::new(SHEETS_READONLY)
    }

    /// Full Drive access.
    pub fn drive() -> Self {
        Self::new(DRIVE)
    }

    /// Access to files created or opened by the app.
    pub fn drive_file() -> Self {
        Self::new(DRIVE_FILE)
    }

    /// Read-only Drive access.
    pub fn drive_readonly() -> Self {
        Self::new(DRIVE_READONLY)
    }

    /// The union of both scope sets.
    pub fn union(&self, other: &Scope) -> Scope {
        let mut urls: Vec<&str> = self.iter().collect();
        for url in other.iter() {
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        Scope(urls.join(" "))
    }

    /// Iterates over the individual scope URLs.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.split_whitespace()
    }

    /// True if the two sets share at least one scope URL.
    pub fn contains_any(&self, other: &Scope) -> bool {
        other.iter().any(|url| self.iter().any(|own| own == url))
    }

    /// The space-separated wire form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

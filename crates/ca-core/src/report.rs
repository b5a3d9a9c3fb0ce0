//! # Report Types
//!
//! The slice of a crash report the query engine deals in: the involvement
//! classification it filters on and the summary row it hands back.

use serde::{Deserialize, Serialize};

/// Whether a crash is attributable to core software or to a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Involvement {
    /// The crash happened in core code.
    None,
    /// A plugin is directly on the stack.
    Direct,
    /// A plugin is involved, but not at the crash site.
    Indirect,
}

impl Involvement {
    /// Map an external `cause` token to its class.
    ///
    /// `"core"`, `"plugin"` and `"plugin_indirect"` are the only accepted
    /// tokens.
    pub fn from_cause(token: &str) -> Option<Self> {
        match token {
            "core" => Some(Self::None),
            "plugin" => Some(Self::Direct),
            "plugin_indirect" => Some(Self::Indirect),
            _ => None,
        }
    }

    /// The code stored in the `involvement` column.
    pub fn code(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Direct => "direct",
            Self::Indirect => "indirect",
        }
    }
}

impl std::fmt::Display for Involvement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// One row of a report listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub id: u64,
    pub version: String,
    /// Blamed plugin, empty when none.
    pub plugin: String,
    pub message: String,
    pub resolved: bool,
}

//! Page layout modes and their launch flags.

use std::fmt;
use std::str::FromStr;

use crate::BridgeError;

/// Flag that puts GrADS in batch mode (no graphics window).
const BATCH_FLAG: &str = "-b";

/// Page layout the interpreter is started with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    /// Landscape page (`-l`).
    #[default]
    Landscape,
    /// Portrait page (`-p`).
    Portrait,
}

impl LayoutMode {
    /// Returns the command-line flags selecting this layout.
    pub fn launch_flags(self) -> [&'static str; 2] {
        match self {
            LayoutMode::Landscape => [BATCH_FLAG, "-l"],
            LayoutMode::Portrait => [BATCH_FLAG, "-p"],
        }
    }

    /// Returns the canonical name of this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            LayoutMode::Landscape => "landscape",
            LayoutMode::Portrait => "portrait",
        }
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutMode {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "landscape" => Ok(LayoutMode::Landscape),
            "portrait" => Ok(LayoutMode::Portrait),
            _ => Err(BridgeError::Configuration(format!(
                "mode must be 'landscape' or 'portrait', not '{}'",
                s
            ))),
        }
    }
}

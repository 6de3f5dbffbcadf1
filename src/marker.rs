//! The marker file records which remote identity a working copy was last
//! successfully fetched from. No marker means the identity is unknown and the
//! next reconciliation starts from scratch.

use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::error::Attempt;

pub const MARKER_FILE: &str = ".tether-source";

/// Read the recorded identity. A missing directory, missing file, unreadable
/// content, or an empty line all mean "identity unknown".
pub fn read_marker(dir: &Path) -> Option<String> {
    let raw = fs::read_to_string(dir.join(MARKER_FILE)).ok()?;
    let identity = raw.trim();
    if identity.is_empty() {
        None
    } else {
        Some(identity.to_string())
    }
}

/// Record `identity` as the last successfully fetched source. Only called
/// after a fetch fully succeeded, so marker presence implies fetch success.
pub fn write_marker(dir: &Path, identity: &str) -> Attempt {
    fs::write(dir.join(MARKER_FILE), format!("{identity}\n"))
        .with_context(|| format!("could not write marker in {}", dir.display()))
}

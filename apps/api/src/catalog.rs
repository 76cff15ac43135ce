//! Read-only opportunity catalog, loaded once at startup from the scraper's JSON export.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::models::opportunity::Opportunity;

/// Loads the catalog. A missing file yields an empty catalog; malformed JSON is an error.
///
/// Records without an `id` get their derived id filled in so every later
/// stage sees the same identifier.
pub fn load_catalog(path: &Path) -> Result<Vec<Opportunity>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Catalog file '{}' not found, starting with an empty catalog", path.display());
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read catalog '{}'", path.display()))
        }
    };

    let mut opportunities: Vec<Opportunity> = serde_json::from_str(&raw)
        .with_context(|| format!("Catalog '{}' is not a valid JSON array of opportunities", path.display()))?;

    for opportunity in &mut opportunities {
        if opportunity.id.trim().is_empty() {
            opportunity.id = opportunity.effective_id();
        }
    }

    info!("Loaded {} opportunities from '{}'", opportunities.len(), path.display());
    Ok(opportunities)
}

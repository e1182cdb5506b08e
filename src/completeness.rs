//! End-of-run check that every selector found its record.

use tracing::{error, warn};

use crate::error::{SelectError, Warning};
use crate::selector::SelectorIndex;

/// Report unmatched selectors.
///
/// With `continue_on_miss` each miss becomes a warning and the run succeeds;
/// otherwise the misses are logged and returned as one fatal error. Keys are
/// listed in output order.
pub fn check(index: &SelectorIndex, continue_on_miss: bool) -> Result<Vec<Warning>, SelectError> {
    let missing: Vec<Vec<u8>> = index.unmatched().map(|s| s.key.to_vec()).collect();
    if missing.is_empty() {
        return Ok(Vec::new());
    }

    let warnings: Vec<Warning> = missing
        .iter()
        .map(|key| Warning::MissingSelector { key: key.clone() })
        .collect();
    for w in &warnings {
        if continue_on_miss {
            warn!("{w}");
        } else {
            error!("{w}");
        }
    }

    if continue_on_miss {
        Ok(warnings)
    } else {
        Err(SelectError::MissingSelectors { keys: missing })
    }
}

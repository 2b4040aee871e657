pub mod catalog;
pub mod orders;

pub use catalog::CatalogStore;
pub use orders::OrderEngine;

use chrono::Utc;

/// Current UTC time in the ISO-8601 string form stored on every row,
/// e.g. `2024-09-20T12:00:00.000000` (microsecond precision).
pub(crate) fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

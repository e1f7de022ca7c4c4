//! Module: config
//! Responsibility: tunable limits for index models and range builders.
//! Does not own: the hard crate limit (`MAX_INDEX_COLUMNS`).

use crate::MAX_INDEX_COLUMNS;
use serde::{Deserialize, Serialize};

///
/// RangeConfig
///
/// Limits applied while declaring indexes and expanding builder ranges.
/// Missing fields deserialize to their defaults.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct RangeConfig {
    /// Maximum column expressions accepted on one index model.
    pub max_index_columns: usize,

    /// Maximum size of the per-column cross product expanded by
    /// `IndexBuilder::ranges`.
    pub max_range_permutations: usize,
}

impl RangeConfig {
    pub const DEFAULT_MAX_INDEX_COLUMNS: usize = 16;
    pub const DEFAULT_MAX_RANGE_PERMUTATIONS: usize = 4096;

    /// Effective column limit, never above the crate hard limit.
    #[must_use]
    pub const fn index_column_limit(&self) -> usize {
        if self.max_index_columns < MAX_INDEX_COLUMNS {
            self.max_index_columns
        } else {
            MAX_INDEX_COLUMNS
        }
    }
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            max_index_columns: Self::DEFAULT_MAX_INDEX_COLUMNS,
            max_range_permutations: Self::DEFAULT_MAX_RANGE_PERMUTATIONS,
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: RangeConfig =
            serde_json::from_str(r#"{ "max_range_permutations": 8 }"#).expect("config parses");

        assert_eq!(config.max_range_permutations, 8);
        assert_eq!(
            config.max_index_columns,
            RangeConfig::DEFAULT_MAX_INDEX_COLUMNS
        );
    }

    #[test]
    fn column_limit_is_capped_by_hard_limit() {
        let config = RangeConfig {
            max_index_columns: MAX_INDEX_COLUMNS * 2,
            ..RangeConfig::default()
        };

        assert_eq!(config.index_column_limit(), MAX_INDEX_COLUMNS);
    }
}

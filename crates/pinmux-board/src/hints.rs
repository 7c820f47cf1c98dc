//! Chip/category hints from `#define USE_<CATEGORY>_<VARIANT>` lines.
//!
//! Hints are informational. When a category is declared more than once the
//! last declaration is the selected one; all declarations are kept for
//! documentation. The reduction is a fold over the ordered statements.

use std::collections::BTreeMap;

use serde::Serialize;

/// Categories whose names themselves contain an underscore.
const COMPOUND_CATEGORIES: &[&str] = &["GYRO_SPI", "ACC_SPI", "BARO_SPI", "BARO_I2C", "MAG_I2C"];

/// One `#define USE_...` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChipHint {
    pub category: String,
    /// Empty for plain feature flags such as `USE_MAX7456`.
    pub variant: String,
    pub line: usize,
}

impl ChipHint {
    /// Split a define name into a hint. Returns `None` unless it starts with `USE_`.
    pub fn from_define(name: &str, line: usize) -> Option<Self> {
        let body = name.strip_prefix("USE_")?;
        if body.is_empty() {
            return None;
        }

        let compound = COMPOUND_CATEGORIES
            .iter()
            .filter(|c| {
                body.strip_prefix(**c)
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('_'))
            })
            .max_by_key(|c| c.len());

        let (category, variant) = match compound {
            Some(category) => {
                let rest = &body[category.len()..];
                (category.to_string(), rest.trim_start_matches('_').to_string())
            }
            None => match body.split_once('_') {
                Some((category, variant)) => (category.to_string(), variant.to_string()),
                None => (body.to_string(), String::new()),
            },
        };

        Some(Self {
            category,
            variant,
            line,
        })
    }
}

/// Reduced chip hints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChipHints {
    declared: Vec<ChipHint>,
    selected: BTreeMap<String, String>,
}

impl ChipHints {
    /// Fold an ordered hint sequence; the last hint per category wins.
    pub fn fold(hints: impl IntoIterator<Item = ChipHint>) -> Self {
        hints.into_iter().fold(ChipHints::default(), |mut acc, hint| {
            acc.selected
                .insert(hint.category.clone(), hint.variant.clone());
            acc.declared.push(hint);
            acc
        })
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    /// The selected variant for a category.
    pub fn selected(&self, category: &str) -> Option<&str> {
        self.selected.get(category).map(String::as_str)
    }

    /// Every declared variant of a category, in declaration order.
    pub fn declared_in(&self, category: &str) -> Vec<&str> {
        self.declared
            .iter()
            .filter(|h| h.category == category)
            .map(|h| h.variant.as_str())
            .collect()
    }

    /// All declarations, in order.
    pub fn declared(&self) -> &[ChipHint] {
        &self.declared
    }

    /// Selected variant per category, ordered by category name.
    pub fn selections(&self) -> impl Iterator<Item = (&str, &str)> {
        self.selected.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_compound_category() {
        let hint = ChipHint::from_define("USE_GYRO_SPI_ICM42688P", 1).unwrap();
        assert_eq!(hint.category, "GYRO_SPI");
        assert_eq!(hint.variant, "ICM42688P");
    }

    #[test]
    fn split_simple_category() {
        let hint = ChipHint::from_define("USE_FLASH_W25Q128FV", 1).unwrap();
        assert_eq!(hint.category, "FLASH");
        assert_eq!(hint.variant, "W25Q128FV");
    }

    #[test]
    fn feature_flag_without_variant() {
        let hint = ChipHint::from_define("USE_MAX7456", 1).unwrap();
        assert_eq!(hint.category, "MAX7456");
        assert_eq!(hint.variant, "");
    }

    #[test]
    fn non_use_defines_are_not_hints() {
        assert!(ChipHint::from_define("TARGET_BOARD", 1).is_none());
        assert!(ChipHint::from_define("USE_", 1).is_none());
    }

    #[test]
    fn last_one_wins() {
        let hints = ChipHints::fold([
            ChipHint::from_define("USE_GYRO_SPI_MPU6000", 1).unwrap(),
            ChipHint::from_define("USE_FLASH_W25Q128FV", 2).unwrap(),
            ChipHint::from_define("USE_GYRO_SPI_ICM42688P", 3).unwrap(),
        ]);
        assert_eq!(hints.selected("GYRO_SPI"), Some("ICM42688P"));
        assert_eq!(hints.declared_in("GYRO_SPI"), vec!["MPU6000", "ICM42688P"]);
        assert_eq!(hints.declared().len(), 3);
    }
}

// 🏷️ Category - the fixed label set
//
// Declaration order IS the classification priority order. A description that
// matches keywords from two categories gets the one declared first here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::KeywordTableError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Food & Dining")]
    FoodAndDining,
    #[serde(rename = "Groceries")]
    Groceries,
    #[serde(rename = "Transportation")]
    Transportation,
    #[serde(rename = "Entertainment")]
    Entertainment,
    #[serde(rename = "Gambling/Sports Betting")]
    Gambling,
    #[serde(rename = "Subscriptions")]
    Subscriptions,
    #[serde(rename = "Transfers")]
    Transfers,
    #[serde(rename = "Shopping")]
    Shopping,
    #[serde(rename = "Bills & Utilities")]
    BillsAndUtilities,
    #[serde(rename = "Health")]
    Health,
    #[serde(rename = "Income")]
    Income,
    /// Fallback when no keyword matches
    #[serde(rename = "Other")]
    Other,
}

const ALL: [Category; 12] = [
    Category::FoodAndDining,
    Category::Groceries,
    Category::Transportation,
    Category::Entertainment,
    Category::Gambling,
    Category::Subscriptions,
    Category::Transfers,
    Category::Shopping,
    Category::BillsAndUtilities,
    Category::Health,
    Category::Income,
    Category::Other,
];

impl Category {
    /// All twelve labels in priority order, `Other` last.
    pub fn all() -> &'static [Category] {
        &ALL
    }

    /// Human-readable label, also used in CSV export
    pub fn label(&self) -> &'static str {
        match self {
            Category::FoodAndDining => "Food & Dining",
            Category::Groceries => "Groceries",
            Category::Transportation => "Transportation",
            Category::Entertainment => "Entertainment",
            Category::Gambling => "Gambling/Sports Betting",
            Category::Subscriptions => "Subscriptions",
            Category::Transfers => "Transfers",
            Category::Shopping => "Shopping",
            Category::BillsAndUtilities => "Bills & Utilities",
            Category::Health => "Health",
            Category::Income => "Income",
            Category::Other => "Other",
        }
    }

    /// Position in the priority order (0 = highest)
    pub fn priority(&self) -> usize {
        ALL.iter().position(|c| c == self).unwrap_or(ALL.len())
    }

    /// Chart color for UI (hex)
    pub fn color(&self) -> &'static str {
        match self {
            Category::FoodAndDining => "#e6550d",
            Category::Groceries => "#31a354",
            Category::Transportation => "#3182bd",
            Category::Entertainment => "#9e9ac8",
            Category::Gambling => "#de2d26",
            Category::Subscriptions => "#fd8d3c",
            Category::Transfers => "#74c476",
            Category::Shopping => "#e377c2",
            Category::BillsAndUtilities => "#636363",
            Category::Health => "#17becf",
            Category::Income => "#2ca02c",
            Category::Other => "#bdbdbd",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = KeywordTableError;

    /// Case-insensitive label lookup ("food & dining" → FoodAndDining)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ALL.iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| KeywordTableError::UnknownCategory(wanted.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twelve_labels_other_last() {
        assert_eq!(Category::all().len(), 12);
        assert_eq!(Category::all().last(), Some(&Category::Other));
        assert_eq!(Category::FoodAndDining.priority(), 0);
        assert_eq!(Category::Other.priority(), 11);
    }

    #[test]
    fn test_label_parse_case_insensitive() {
        for category in Category::all() {
            let upper = category.label().to_uppercase();
            assert_eq!(upper.parse::<Category>().unwrap(), *category);
        }
        assert!("Groceries & Stuff".parse::<Category>().is_err());
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&Category::Gambling).unwrap();
        assert_eq!(json, "\"Gambling/Sports Betting\"");

        let back: Category = serde_json::from_str("\"Bills & Utilities\"").unwrap();
        assert_eq!(back, Category::BillsAndUtilities);
    }
}

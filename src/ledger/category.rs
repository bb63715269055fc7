//! Budget categories
//!
//! The fixed set of spending categories a district may allocate against.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Spending category of an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetCategory {
    General,
    Infrastructure,
    Technology,
    Sports,
    Academics,
    StaffDevelopment,
    Maintenance,
    Other,
}

impl BudgetCategory {
    /// All categories, in display order.
    pub const ALL: [BudgetCategory; 8] = [
        BudgetCategory::General,
        BudgetCategory::Infrastructure,
        BudgetCategory::Technology,
        BudgetCategory::Sports,
        BudgetCategory::Academics,
        BudgetCategory::StaffDevelopment,
        BudgetCategory::Maintenance,
        BudgetCategory::Other,
    ];

    /// Returns the wire-format string
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetCategory::General => "general",
            BudgetCategory::Infrastructure => "infrastructure",
            BudgetCategory::Technology => "technology",
            BudgetCategory::Sports => "sports",
            BudgetCategory::Academics => "academics",
            BudgetCategory::StaffDevelopment => "staff_development",
            BudgetCategory::Maintenance => "maintenance",
            BudgetCategory::Other => "other",
        }
    }
}

impl fmt::Display for BudgetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BudgetCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BudgetCategory::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown budget category: {}", s))
    }
}

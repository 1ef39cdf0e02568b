//! Domain models for Tally

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Expense category
///
/// Closed set; serialized using the display label (e.g. "Food & Dining").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Food & Dining")]
    FoodAndDining,
    #[serde(rename = "Transportation")]
    Transportation,
    #[serde(rename = "Shopping")]
    Shopping,
    #[serde(rename = "Entertainment")]
    Entertainment,
    #[serde(rename = "Bills & Utilities")]
    BillsAndUtilities,
    #[serde(rename = "Healthcare")]
    Healthcare,
    #[serde(rename = "Education")]
    Education,
    #[serde(rename = "Travel")]
    Travel,
    #[serde(rename = "Personal Care")]
    PersonalCare,
    #[serde(rename = "Other")]
    Other,
}

impl Category {
    /// All categories, in display order
    pub const ALL: [Category; 10] = [
        Self::FoodAndDining,
        Self::Transportation,
        Self::Shopping,
        Self::Entertainment,
        Self::BillsAndUtilities,
        Self::Healthcare,
        Self::Education,
        Self::Travel,
        Self::PersonalCare,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FoodAndDining => "Food & Dining",
            Self::Transportation => "Transportation",
            Self::Shopping => "Shopping",
            Self::Entertainment => "Entertainment",
            Self::BillsAndUtilities => "Bills & Utilities",
            Self::Healthcare => "Healthcare",
            Self::Education => "Education",
            Self::Travel => "Travel",
            Self::PersonalCare => "Personal Care",
            Self::Other => "Other",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    /// Exact label match; labels are case sensitive
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recorded expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    /// Owner of the expense
    pub user_id: String,
    pub amount: f64,
    pub category: Category,
    pub note: Option<String>,
    /// Calendar date of the expense (YYYY-MM-DD)
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated expense ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub amount: f64,
    pub category: Category,
    pub note: Option<String>,
    pub date: NaiveDate,
}

/// User profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Same identifier as the expense owner
    pub id: String,
    pub name: Option<String>,
    pub preferred_currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Default currency for newly created profiles
pub const DEFAULT_CURRENCY: &str = "USD";

/// Normalized profile changes
///
/// `name: Some(None)` clears the stored name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<Option<String>>,
    pub preferred_currency: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.preferred_currency.is_none()
    }
}

/// Total spending for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub total: f64,
    /// English month name, e.g. "March"
    pub month: String,
    pub year: i32,
}

/// Spending for one category within a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAggregate {
    pub category: Category,
    pub total: f64,
    /// Share of the window total, 0-100
    pub percentage: f64,
}

/// Spending on a single day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySpending {
    pub date: NaiveDate,
    pub total: f64,
}

/// AI-generated spending insights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingInsights {
    pub insights: String,
    pub generated_at: DateTime<Utc>,
}

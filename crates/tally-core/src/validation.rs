//! Input validation for expenses and profiles
//!
//! Raw inputs keep their fields as `serde_json::Value` so that type mismatches
//! ("amount": "12") are reported per field instead of failing the whole body.
//! Each validator returns a [`ValidationErrors`] map; an empty map means the
//! input is valid and can be converted into its typed form.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::models::{Category, Expense, NewExpense, ProfileUpdate};

/// Maximum trimmed length of a profile name
pub const MAX_NAME_LENGTH: usize = 100;

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("valid date regex"))
}

fn currency_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z]{3}$").expect("valid currency regex"))
}

/// Field name to error message, in the order the fields were checked
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    entries: Vec<(String, String)>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for a field; a later error for the same field replaces
    /// the message but keeps the original position
    pub fn insert(&mut self, field: &str, message: &str) {
        match self.entries.iter_mut().find(|(f, _)| f == field) {
            Some(entry) => entry.1 = message.to_string(),
            None => self.entries.push((field.to_string(), message.to_string())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, m)| m.as_str())
    }

    /// Message of the first failing field, for user-facing responses
    pub fn first(&self) -> Option<&str> {
        self.entries.first().map(|(_, m)| m.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(f, m)| (f.as_str(), m.as_str()))
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, message) in &self.entries {
            map.serialize_entry(field, message)?;
        }
        map.end()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.first().unwrap_or("Invalid input"))
    }
}

// ============================================================================
// Expenses
// ============================================================================

/// Expense fields as received, before validation
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawExpenseInput {
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub category: Option<Value>,
    #[serde(default)]
    pub note: Option<Value>,
    #[serde(default)]
    pub date: Option<Value>,
}

/// Fields supplied in a partial update
///
/// Absent and `null` fields keep the stored value.
pub type ExpensePatch = RawExpenseInput;

impl RawExpenseInput {
    /// Build a complete candidate record from this patch and the stored expense
    pub fn merge_onto(&self, existing: &Expense) -> RawExpenseInput {
        RawExpenseInput {
            amount: self
                .amount
                .clone()
                .or_else(|| Some(Value::from(existing.amount))),
            category: self
                .category
                .clone()
                .or_else(|| Some(Value::from(existing.category.as_str()))),
            note: self
                .note
                .clone()
                .or_else(|| existing.note.clone().map(Value::from)),
            date: self
                .date
                .clone()
                .or_else(|| Some(Value::from(existing.date.format("%Y-%m-%d").to_string()))),
        }
    }
}

/// Validate an expense input; all fields are checked
pub fn validate_expense_input(input: &RawExpenseInput) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    match &input.amount {
        None => errors.insert("amount", "Amount is required"),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(amount) if !amount.is_finite() => {
                errors.insert("amount", "Amount must be a valid number")
            }
            Some(amount) if amount <= 0.0 => {
                errors.insert("amount", "Amount must be greater than 0")
            }
            Some(_) => {}
            None => errors.insert("amount", "Amount must be a valid number"),
        },
        Some(_) => errors.insert("amount", "Amount must be a number"),
    }

    match &input.category {
        None => errors.insert("category", "Category is required"),
        Some(Value::String(s)) if s.is_empty() => errors.insert("category", "Category is required"),
        Some(Value::String(s)) => {
            if s.parse::<Category>().is_err() {
                errors.insert("category", "Invalid category");
            }
        }
        Some(_) => errors.insert("category", "Category must be a string"),
    }

    match &input.date {
        None => errors.insert("date", "Date is required"),
        Some(Value::String(s)) if s.is_empty() => errors.insert("date", "Date is required"),
        Some(Value::String(s)) => {
            if !date_pattern().is_match(s) {
                errors.insert("date", "Date must be in YYYY-MM-DD format");
            } else if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_err() {
                errors.insert("date", "Invalid date");
            }
        }
        Some(_) => errors.insert("date", "Date must be a string"),
    }

    match &input.note {
        None | Some(Value::String(_)) => {}
        Some(_) => errors.insert("note", "Note must be a string"),
    }

    errors
}

impl TryFrom<&RawExpenseInput> for NewExpense {
    type Error = ValidationErrors;

    fn try_from(input: &RawExpenseInput) -> Result<Self, Self::Error> {
        let errors = validate_expense_input(input);
        if !errors.is_empty() {
            return Err(errors);
        }

        // Validation guarantees every field below is present and well formed
        let amount = input.amount.as_ref().and_then(Value::as_f64);
        let category = input
            .category
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<Category>().ok());
        let date = input
            .date
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());

        match (amount, category, date) {
            (Some(amount), Some(category), Some(date)) => Ok(NewExpense {
                amount,
                category,
                note: input
                    .note
                    .as_ref()
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
                date,
            }),
            _ => {
                let mut errors = ValidationErrors::new();
                errors.insert("expense", "Invalid expense");
                Err(errors)
            }
        }
    }
}

// ============================================================================
// Profiles
// ============================================================================

/// Profile fields as received, before validation
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawProfileInput {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub preferred_currency: Option<Value>,
}

/// Validate a profile update; both fields are optional
pub fn validate_profile_input(input: &RawProfileInput) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    match &input.name {
        None => {}
        Some(Value::String(name)) => {
            if name.trim().chars().count() > MAX_NAME_LENGTH {
                errors.insert("name", "Name must be less than 100 characters");
            }
        }
        Some(_) => errors.insert("name", "Name must be a string"),
    }

    match &input.preferred_currency {
        None => {}
        Some(Value::String(currency)) => {
            let currency = normalize_currency(currency);
            if currency.chars().count() != 3 {
                errors.insert(
                    "preferred_currency",
                    "Currency must be a 3-letter code (e.g., USD, EUR)",
                );
            } else if !currency_pattern().is_match(&currency) {
                errors.insert("preferred_currency", "Currency must contain only letters");
            }
        }
        Some(_) => errors.insert("preferred_currency", "Currency must be a string"),
    }

    errors
}

/// Uppercase and trim a currency code
pub fn normalize_currency(code: &str) -> String {
    code.trim().to_uppercase()
}

impl TryFrom<&RawProfileInput> for ProfileUpdate {
    type Error = ValidationErrors;

    fn try_from(input: &RawProfileInput) -> Result<Self, Self::Error> {
        let errors = validate_profile_input(input);
        if !errors.is_empty() {
            return Err(errors);
        }

        let name = input.name.as_ref().and_then(Value::as_str).map(|name| {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        });

        let preferred_currency = input
            .preferred_currency
            .as_ref()
            .and_then(Value::as_str)
            .map(normalize_currency);

        Ok(ProfileUpdate {
            name,
            preferred_currency,
        })
    }
}

//! Expense operations
//!
//! Every query takes the owner id and filters on it; an expense owned by
//! someone else behaves exactly like a missing one.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{Expense, NewExpense};

const EXPENSE_COLUMNS: &str = "id, user_id, amount, category, note, date, created_at, updated_at";

impl Database {
    /// Insert an expense for `user_id` and return the stored row
    pub fn insert_expense(&self, user_id: &str, expense: &NewExpense) -> Result<Expense> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO expenses (user_id, amount, category, note, date) VALUES (?, ?, ?, ?, ?)",
            params![
                user_id,
                expense.amount,
                expense.category.as_str(),
                expense.note,
                expense.date.to_string(),
            ],
        )?;
        let id = conn.last_insert_rowid();

        let sql = format!("SELECT {} FROM expenses WHERE id = ?", EXPENSE_COLUMNS);
        let stored = conn.query_row(&sql, params![id], Self::row_to_expense)?;
        Ok(stored)
    }

    /// List the owner's expenses, newest date first
    ///
    /// `start` and `end` are inclusive bounds on the expense date.
    pub fn list_expenses(
        &self,
        user_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Expense>> {
        let conn = self.conn()?;

        let mut sql = format!("SELECT {} FROM expenses WHERE user_id = ?", EXPENSE_COLUMNS);
        let mut values: Vec<String> = vec![user_id.to_string()];

        if let Some(start) = start {
            sql.push_str(" AND date >= ?");
            values.push(start.to_string());
        }
        if let Some(end) = end {
            sql.push_str(" AND date <= ?");
            values.push(end.to_string());
        }
        sql.push_str(" ORDER BY date DESC, id DESC");

        let mut stmt = conn.prepare(&sql)?;
        let expenses = stmt
            .query_map(rusqlite::params_from_iter(values.iter()), Self::row_to_expense)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(expenses)
    }

    /// Get one of the owner's expenses
    pub fn get_expense(&self, user_id: &str, id: i64) -> Result<Option<Expense>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM expenses WHERE id = ? AND user_id = ?",
            EXPENSE_COLUMNS
        );

        let expense = conn
            .query_row(&sql, params![id, user_id], Self::row_to_expense)
            .optional()?;

        Ok(expense)
    }

    /// Replace the fields of one of the owner's expenses
    ///
    /// Returns `None` when the expense does not exist for this owner.
    pub fn update_expense(
        &self,
        user_id: &str,
        id: i64,
        expense: &NewExpense,
    ) -> Result<Option<Expense>> {
        let conn = self.conn()?;

        let changed = conn.execute(
            r#"
            UPDATE expenses
            SET amount = ?, category = ?, note = ?, date = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND user_id = ?
            "#,
            params![
                expense.amount,
                expense.category.as_str(),
                expense.note,
                expense.date.to_string(),
                id,
                user_id,
            ],
        )?;

        if changed == 0 {
            return Ok(None);
        }
        drop(conn);

        self.get_expense(user_id, id)
    }

    /// Delete one of the owner's expenses; returns whether a row was removed
    pub fn delete_expense(&self, user_id: &str, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM expenses WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }

    /// Of the given ids, those that are not owned by `user_id`
    pub fn foreign_expense_ids(&self, user_id: &str, ids: &[i64]) -> Result<Vec<i64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT 1 FROM expenses WHERE id = ? AND user_id = ?")?;

        let mut foreign = Vec::new();
        for id in ids {
            if !stmt.exists(params![id, user_id])? {
                foreign.push(*id);
            }
        }

        Ok(foreign)
    }

    pub(crate) fn row_to_expense(row: &rusqlite::Row) -> rusqlite::Result<Expense> {
        let category_str: String = row.get(3)?;
        let date_str: String = row.get(5)?;
        let created_at_str: String = row.get(6)?;
        let updated_at_str: String = row.get(7)?;

        let category = category_str.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                e.into(),
            )
        })?;

        Ok(Expense {
            id: row.get(0)?,
            user_id: row.get(1)?,
            amount: row.get(2)?,
            category,
            note: row.get(4)?,
            date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").unwrap_or_default(),
            created_at: parse_datetime(&created_at_str),
            updated_at: parse_datetime(&updated_at_str),
        })
    }
}

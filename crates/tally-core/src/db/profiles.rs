//! Profile operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{Profile, ProfileUpdate, DEFAULT_CURRENCY};

impl Database {
    /// Get the profile of a user
    pub fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let conn = self.conn()?;
        let profile = conn
            .query_row(
                "SELECT id, name, preferred_currency, created_at, updated_at FROM profiles WHERE id = ?",
                params![user_id],
                Self::row_to_profile,
            )
            .optional()?;
        Ok(profile)
    }

    /// Get the profile of a user, creating it on first access
    ///
    /// Concurrent first accesses all see the same row.
    pub fn get_or_create_profile(&self, user_id: &str) -> Result<Profile> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO profiles (id, preferred_currency) VALUES (?, ?)",
            params![user_id, DEFAULT_CURRENCY],
        )?;
        drop(conn);

        self.get_profile(user_id)?
            .ok_or_else(|| crate::Error::NotFound(format!("profile {}", user_id)))
    }

    /// Apply a normalized update; returns `None` when the profile does not exist
    pub fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<Option<Profile>> {
        let conn = self.conn()?;

        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Option<String>> = Vec::new();

        if let Some(name) = &update.name {
            sets.push("name = ?");
            values.push(name.clone());
        }
        if let Some(currency) = &update.preferred_currency {
            sets.push("preferred_currency = ?");
            values.push(Some(currency.clone()));
        }

        if !sets.is_empty() {
            sets.push("updated_at = CURRENT_TIMESTAMP");
            let sql = format!("UPDATE profiles SET {} WHERE id = ?", sets.join(", "));
            values.push(Some(user_id.to_string()));

            let changed = conn.execute(&sql, rusqlite::params_from_iter(values.iter()))?;
            if changed == 0 {
                return Ok(None);
            }
        }
        drop(conn);

        self.get_profile(user_id)
    }

    /// Delete the user's expenses and profile in one transaction
    ///
    /// Returns the number of expenses removed.
    pub fn delete_account(&self, user_id: &str) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let removed = tx.execute("DELETE FROM expenses WHERE user_id = ?", params![user_id])?;
        tx.execute("DELETE FROM profiles WHERE id = ?", params![user_id])?;
        tx.commit()?;

        Ok(removed)
    }

    fn row_to_profile(row: &rusqlite::Row) -> rusqlite::Result<Profile> {
        let created_at_str: String = row.get(3)?;
        let updated_at_str: String = row.get(4)?;
        Ok(Profile {
            id: row.get(0)?,
            name: row.get(1)?,
            preferred_currency: row.get(2)?,
            created_at: parse_datetime(&created_at_str),
            updated_at: parse_datetime(&updated_at_str),
        })
    }
}

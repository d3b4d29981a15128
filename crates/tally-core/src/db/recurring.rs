//! Saved recurring expense operations

use chrono::{Duration, NaiveDate};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    Frequency, NewRecurringExpense, RecurringExpense, RecurringExpenseUpdate, RecurringStatus,
};
use crate::store::RecurringExpenseStore;

const SELECT_COLUMNS: &str = r#"
    SELECT id, merchant, merchant_key, category, frequency, interval_days,
           amount, currency, next_due, status, created_at
    FROM recurring_expenses
"#;

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn row_to_recurring(row: &Row) -> rusqlite::Result<RecurringExpense> {
    let frequency_str: String = row.get(4)?;
    let next_due_str: String = row.get(8)?;
    let status_str: String = row.get(9)?;
    let created_at_str: String = row.get(10)?;

    Ok(RecurringExpense {
        id: row.get(0)?,
        merchant: row.get(1)?,
        merchant_key: row.get(2)?,
        category: row.get(3)?,
        frequency: frequency_str
            .parse::<Frequency>()
            .map_err(|e| conversion_error(4, e))?,
        interval_days: row.get(5)?,
        amount: row.get(6)?,
        currency: row.get(7)?,
        next_due: NaiveDate::parse_from_str(&next_due_str, "%Y-%m-%d")
            .map_err(|e| conversion_error(8, e.to_string()))?,
        status: status_str
            .parse::<RecurringStatus>()
            .map_err(|e| conversion_error(9, e))?,
        created_at: parse_datetime(&created_at_str),
    })
}

fn not_found(id: i64) -> Error {
    Error::NotFound(format!("recurring expense {}", id))
}

impl RecurringExpenseStore for Database {
    fn create_recurring(&self, new: &NewRecurringExpense) -> Result<i64> {
        if new.interval_days <= 0 {
            return Err(Error::InvalidData(format!(
                "interval_days must be positive, got {}",
                new.interval_days
            )));
        }
        if !new.amount.is_finite() {
            return Err(Error::InvalidData("amount must be finite".to_string()));
        }

        let conn = self.conn()?;

        // Unique by merchant key. An existing row gets the detected figures
        // refreshed; user-edited name, category and status are kept.
        let id = conn.query_row(
            r#"
            INSERT INTO recurring_expenses
                (merchant, merchant_key, category, frequency, interval_days, amount, currency, next_due, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'active')
            ON CONFLICT(merchant_key) DO UPDATE SET
                frequency = excluded.frequency,
                interval_days = excluded.interval_days,
                amount = excluded.amount,
                currency = excluded.currency,
                next_due = excluded.next_due
            RETURNING id
            "#,
            params![
                new.merchant,
                new.merchant_key,
                new.category,
                new.frequency.as_str(),
                new.interval_days,
                new.amount,
                new.currency,
                new.next_due.to_string(),
            ],
            |row| row.get(0),
        )?;

        Ok(id)
    }

    fn get_recurring(&self, id: i64) -> Result<Option<RecurringExpense>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                &format!("{} WHERE id = ?", SELECT_COLUMNS),
                params![id],
                row_to_recurring,
            )
            .optional()?;

        Ok(result)
    }

    fn list_recurring(&self, status: Option<RecurringStatus>) -> Result<Vec<RecurringExpense>> {
        let conn = self.conn()?;

        let expenses = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE status = ? ORDER BY next_due ASC, id ASC",
                    SELECT_COLUMNS
                ))?;
                let rows = stmt.query_map(params![status.as_str()], row_to_recurring)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("{} ORDER BY next_due ASC, id ASC", SELECT_COLUMNS))?;
                let rows = stmt.query_map([], row_to_recurring)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        Ok(expenses)
    }

    fn update_recurring(&self, id: i64, update: &RecurringExpenseUpdate) -> Result<()> {
        let mut expense = self.get_recurring(id)?.ok_or_else(|| not_found(id))?;

        if let Some(merchant) = &update.merchant {
            expense.merchant = merchant.clone();
        }
        if let Some(category) = &update.category {
            expense.category = category.clone();
        }
        if let Some(frequency) = update.frequency {
            expense.frequency = frequency;
        }
        if let Some(interval_days) = update.interval_days {
            if interval_days <= 0 {
                return Err(Error::InvalidData(format!(
                    "interval_days must be positive, got {}",
                    interval_days
                )));
            }
            expense.interval_days = interval_days;
        }
        if let Some(amount) = update.amount {
            if !amount.is_finite() {
                return Err(Error::InvalidData("amount must be finite".to_string()));
            }
            expense.amount = amount;
        }
        if let Some(next_due) = update.next_due {
            expense.next_due = next_due;
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE recurring_expenses
            SET merchant = ?, category = ?, frequency = ?, interval_days = ?, amount = ?, next_due = ?
            WHERE id = ?
            "#,
            params![
                expense.merchant,
                expense.category,
                expense.frequency.as_str(),
                expense.interval_days,
                expense.amount,
                expense.next_due.to_string(),
                id
            ],
        )?;

        Ok(())
    }

    fn skip_next(&self, id: i64) -> Result<NaiveDate> {
        let expense = self.get_recurring(id)?.ok_or_else(|| not_found(id))?;
        let next_due = expense.next_due + Duration::days(expense.interval_days);

        let conn = self.conn()?;
        conn.execute(
            "UPDATE recurring_expenses SET next_due = ? WHERE id = ?",
            params![next_due.to_string(), id],
        )?;

        Ok(next_due)
    }

    fn set_recurring_status(&self, id: i64, status: RecurringStatus) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE recurring_expenses SET status = ? WHERE id = ?",
            params![status.as_str(), id],
        )?;

        if updated == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn delete_recurring(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM recurring_expenses WHERE id = ?", params![id])?;

        if deleted == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }
}

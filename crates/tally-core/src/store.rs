//! Persistence of saved recurring expenses
//!
//! Detection results are ephemeral. When the user saves one, it is handed to a
//! store which assigns it an identity and owns its lifecycle from then on
//! (edit, skip an occurrence, pause/cancel, delete).

use chrono::NaiveDate;
use tracing::info;

use crate::error::Result;
use crate::models::{
    DetectedRecurringExpense, NewRecurringExpense, RecurringExpense, RecurringExpenseUpdate,
    RecurringStatus,
};

/// CRUD operations on saved recurring expenses
pub trait RecurringExpenseStore {
    /// Save a recurring expense, returning its id.
    ///
    /// Saving a merchant key that already exists refreshes the stored amount,
    /// frequency, interval and next due date and returns the existing id.
    fn create_recurring(&self, new: &NewRecurringExpense) -> Result<i64>;

    fn get_recurring(&self, id: i64) -> Result<Option<RecurringExpense>>;

    /// List saved expenses, optionally filtered by status, soonest due first
    fn list_recurring(&self, status: Option<RecurringStatus>) -> Result<Vec<RecurringExpense>>;

    fn update_recurring(&self, id: i64, update: &RecurringExpenseUpdate) -> Result<()>;

    /// Skip the next occurrence, returning the new due date
    fn skip_next(&self, id: i64) -> Result<NaiveDate>;

    fn set_recurring_status(&self, id: i64, status: RecurringStatus) -> Result<()>;

    fn delete_recurring(&self, id: i64) -> Result<()>;
}

/// Save the selected detections as active recurring expenses
pub fn save_detected<S>(store: &S, selected: &[DetectedRecurringExpense]) -> Result<Vec<i64>>
where
    S: RecurringExpenseStore + ?Sized,
{
    let ids = selected
        .iter()
        .map(|detected| store.create_recurring(&NewRecurringExpense::from(detected)))
        .collect::<Result<Vec<_>>>()?;

    info!("Saved {} recurring expenses", ids.len());
    Ok(ids)
}

//! Domain models for Tally

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A transaction row as stored by the hosted backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    /// Raw merchant string as entered or imported
    pub merchant: String,
    pub amount: f64,
    pub currency: String,
    pub category: Option<String>,
    /// Missing dates are tolerated on input and skipped during detection
    pub transaction_date: Option<NaiveDate>,
    #[serde(default)]
    pub transaction_type: TransactionType,
}

/// Direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    #[default]
    Expense,
    Income,
    Transfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
            Self::Transfer => "transfer",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            "transfer" => Ok(Self::Transfer),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Billing frequency of a recurring expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
        }
    }

    /// Classify a median interval (in days) into a frequency bucket.
    ///
    /// Buckets are inclusive: weekly 5–9, biweekly 10–17, monthly 25–35,
    /// quarterly 80–100. Anything between or outside them has no frequency.
    pub fn from_interval(days: f64) -> Option<Self> {
        if (5.0..=9.0).contains(&days) {
            Some(Self::Weekly)
        } else if (10.0..=17.0).contains(&days) {
            Some(Self::Biweekly)
        } else if (25.0..=35.0).contains(&days) {
            Some(Self::Monthly)
        } else if (80.0..=100.0).contains(&days) {
            Some(Self::Quarterly)
        } else {
            None
        }
    }

    /// Charges per calendar year
    pub fn per_year(&self) -> f64 {
        match self {
            Self::Weekly => 52.0,
            Self::Biweekly => 26.0,
            Self::Monthly => 12.0,
            Self::Quarterly => 4.0,
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "biweekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            _ => Err(format!("Unknown frequency: {}", s)),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recurring expense inferred from transaction history
///
/// Ephemeral: produced by one detection run. Persist selected entries with
/// [`crate::store::save_detected`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedRecurringExpense {
    /// Display name (most common raw merchant string in the group)
    pub merchant: String,
    /// Normalized key the group was formed on
    pub merchant_key: String,
    pub category: String,
    pub frequency: Frequency,
    /// Median observed interval between charges
    pub interval_days: f64,
    pub average_amount: f64,
    /// Most common currency in the group
    pub currency: String,
    /// Amounts were averaged and summed across currencies without conversion
    pub mixed_currency: bool,
    /// 0–100
    pub confidence: u8,
    /// Group members, ascending by date
    pub transactions: Vec<Transaction>,
    pub first_seen: NaiveDate,
    pub last_seen: NaiveDate,
    pub next_expected: NaiveDate,
    pub missed_payment: bool,
    pub total_spent_this_year: f64,
}

impl DetectedRecurringExpense {
    pub fn occurrences(&self) -> usize {
        self.transactions.len()
    }
}

/// Lifecycle status of a saved recurring expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurringStatus {
    Active,
    /// Temporarily not expected (user paused tracking)
    Paused,
    Cancelled,
}

impl RecurringStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for RecurringStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown recurring status: {}", s)),
        }
    }
}

impl std::fmt::Display for RecurringStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recurring expense saved by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringExpense {
    pub id: i64,
    pub merchant: String,
    pub merchant_key: String,
    pub category: String,
    pub frequency: Frequency,
    pub interval_days: i64,
    pub amount: f64,
    pub currency: String,
    pub next_due: NaiveDate,
    pub status: RecurringStatus,
    pub created_at: DateTime<Utc>,
}

impl RecurringExpense {
    /// Projected spend over a calendar year at the current amount
    pub fn annual_cost(&self) -> f64 {
        self.amount * self.frequency.per_year()
    }
}

/// A recurring expense to be saved (before DB insertion)
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecurringExpense {
    pub merchant: String,
    pub merchant_key: String,
    pub category: String,
    pub frequency: Frequency,
    pub interval_days: i64,
    pub amount: f64,
    pub currency: String,
    pub next_due: NaiveDate,
}

impl From<&DetectedRecurringExpense> for NewRecurringExpense {
    fn from(detected: &DetectedRecurringExpense) -> Self {
        Self {
            merchant: detected.merchant.clone(),
            merchant_key: detected.merchant_key.clone(),
            category: detected.category.clone(),
            frequency: detected.frequency,
            interval_days: detected.interval_days.round() as i64,
            amount: detected.average_amount,
            currency: detected.currency.clone(),
            next_due: detected.next_expected,
        }
    }
}

/// Partial edit of a saved recurring expense; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecurringExpenseUpdate {
    pub merchant: Option<String>,
    pub category: Option<String>,
    pub frequency: Option<Frequency>,
    pub interval_days: Option<i64>,
    pub amount: Option<f64>,
    pub next_due: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_buckets() {
        assert_eq!(Frequency::from_interval(7.0), Some(Frequency::Weekly));
        assert_eq!(Frequency::from_interval(5.0), Some(Frequency::Weekly));
        assert_eq!(Frequency::from_interval(14.0), Some(Frequency::Biweekly));
        assert_eq!(Frequency::from_interval(30.0), Some(Frequency::Monthly));
        assert_eq!(Frequency::from_interval(35.0), Some(Frequency::Monthly));
        assert_eq!(Frequency::from_interval(91.0), Some(Frequency::Quarterly));

        // Gaps between buckets
        assert_eq!(Frequency::from_interval(4.0), None);
        assert_eq!(Frequency::from_interval(9.5), None);
        assert_eq!(Frequency::from_interval(21.0), None);
        assert_eq!(Frequency::from_interval(60.0), None);
        assert_eq!(Frequency::from_interval(365.0), None);
    }

    #[test]
    fn test_frequency_round_trip_str() {
        for freq in [
            Frequency::Weekly,
            Frequency::Biweekly,
            Frequency::Monthly,
            Frequency::Quarterly,
        ] {
            assert_eq!(freq.as_str().parse::<Frequency>().unwrap(), freq);
        }
        assert!("yearly".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_transaction_deserializes_backend_row() {
        let json = r#"{
            "id": "tx-1",
            "merchant": "Netflix",
            "amount": 15.99,
            "currency": "USD",
            "category": null,
            "transaction_date": "2024-01-05",
            "transaction_type": "expense"
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.transaction_date, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(tx.transaction_type, TransactionType::Expense);
        assert!(tx.category.is_none());
    }

    #[test]
    fn test_transaction_missing_date_and_type() {
        let json = r#"{"id": "tx-2", "merchant": "Gym", "amount": 40.0, "currency": "EUR", "category": "Fitness", "transaction_date": null}"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert!(tx.transaction_date.is_none());
        assert_eq!(tx.transaction_type, TransactionType::Expense);
    }

    #[test]
    fn test_recurring_status_parse() {
        assert_eq!(
            "canceled".parse::<RecurringStatus>().unwrap(),
            RecurringStatus::Cancelled
        );
        assert_eq!(RecurringStatus::Paused.to_string(), "paused");
    }

    #[test]
    fn test_annual_cost() {
        let expense = RecurringExpense {
            id: 1,
            merchant: "Spotify".to_string(),
            merchant_key: "spotify".to_string(),
            category: "Music".to_string(),
            frequency: Frequency::Monthly,
            interval_days: 30,
            amount: 10.0,
            currency: "USD".to_string(),
            next_due: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            status: RecurringStatus::Active,
            created_at: Utc::now(),
        };
        assert_eq!(expense.annual_cost(), 120.0);
    }
}

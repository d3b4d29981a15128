//! Tally Core Library
//!
//! Recurring expense detection for the Tally personal tracker:
//! - Merchant normalization and grouping
//! - Frequency inference and confidence scoring over transaction history
//! - Memoized detection for append-mostly histories
//! - A persistence seam for saved recurring expenses, with a SQLite store
//! - TOML-configurable detection thresholds

pub mod cache;
pub mod config;
pub mod db;
pub mod detect;
pub mod error;
pub mod models;
pub mod normalize;
pub mod stats;
pub mod store;

pub use cache::CachedDetector;
pub use config::DetectionConfig;
pub use db::Database;
pub use detect::{detect_recurring, detect_recurring_today, RecurringDetector};
pub use error::{Error, Result};
pub use models::{
    DetectedRecurringExpense, Frequency, NewRecurringExpense, RecurringExpense,
    RecurringExpenseUpdate, RecurringStatus, Transaction, TransactionType,
};
pub use normalize::MerchantNormalizer;
pub use store::{save_detected, RecurringExpenseStore};

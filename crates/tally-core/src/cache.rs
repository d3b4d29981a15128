//! Memoized detection
//!
//! Transaction histories are append-mostly, so a detection result stays valid
//! until a transaction is added or removed. The cache key is the transaction
//! count plus the id of the most recent transaction, together with `today`
//! (missed-payment and yearly totals depend on it).

use chrono::NaiveDate;
use tracing::debug;

use crate::detect::RecurringDetector;
use crate::models::{DetectedRecurringExpense, Transaction};

#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheKey {
    transaction_count: usize,
    most_recent_id: Option<String>,
    today: NaiveDate,
}

impl CacheKey {
    fn new(transactions: &[Transaction], today: NaiveDate) -> Self {
        // Latest dated transaction; equal dates resolve to the greatest id
        let most_recent_id = transactions
            .iter()
            .filter_map(|tx| tx.transaction_date.map(|date| (date, tx.id.as_str())))
            .max()
            .map(|(_, id)| id.to_string());

        Self {
            transaction_count: transactions.len(),
            most_recent_id,
            today,
        }
    }
}

/// A detector that reuses its last result while the input looks unchanged
#[derive(Debug, Clone, Default)]
pub struct CachedDetector {
    detector: RecurringDetector,
    cached: Option<(CacheKey, Vec<DetectedRecurringExpense>)>,
}

impl CachedDetector {
    pub fn new(detector: RecurringDetector) -> Self {
        Self {
            detector,
            cached: None,
        }
    }

    pub fn detector(&self) -> &RecurringDetector {
        &self.detector
    }

    /// Return the cached result for this input, recomputing on a key change
    pub fn detect(
        &mut self,
        transactions: &[Transaction],
        today: NaiveDate,
    ) -> &[DetectedRecurringExpense] {
        let key = CacheKey::new(transactions, today);

        let stale = match &self.cached {
            Some((cached_key, _)) => *cached_key != key,
            None => true,
        };

        if stale {
            debug!(
                "Recomputing recurring detection ({} transactions)",
                key.transaction_count
            );
            let result = self.detector.detect(transactions, today);
            self.cached = Some((key, result));
        }

        match &self.cached {
            Some((_, result)) => result.as_slice(),
            None => &[],
        }
    }

    /// Whether a result is currently held
    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }

    /// Drop the cached result (e.g. after a transaction was edited in place)
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;
    use chrono::Duration;

    fn monthly(merchant: &str, amount: f64, count: usize) -> Vec<Transaction> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..count)
            .map(|i| Transaction {
                id: format!("{}-{}", merchant, i),
                merchant: merchant.to_string(),
                amount,
                currency: "USD".to_string(),
                category: None,
                transaction_date: Some(start + Duration::days(30 * i as i64)),
                transaction_type: TransactionType::Expense,
            })
            .collect()
    }

    #[test]
    fn test_cache_key_uses_latest_transaction() {
        let mut transactions = monthly("Hulu", 17.99, 3);
        transactions.reverse();
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let key = CacheKey::new(&transactions, today);
        assert_eq!(key.transaction_count, 3);
        assert_eq!(key.most_recent_id.as_deref(), Some("Hulu-2"));
    }

    #[test]
    fn test_reuses_result_until_input_changes() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let mut cache = CachedDetector::default();
        let mut transactions = monthly("Hulu", 17.99, 3);

        let first = cache.detect(&transactions, today).to_vec();
        assert_eq!(first.len(), 1);
        assert!(cache.is_cached());

        // An edit that keeps count and latest id is served from cache
        transactions[0].amount = 1000.0;
        let second = cache.detect(&transactions, today).to_vec();
        assert_eq!(first, second);

        // A new transaction changes the key
        transactions.extend(monthly("Spotify", 10.99, 3));
        let third = cache.detect(&transactions, today);
        assert_eq!(third.len(), 2);
    }

    #[test]
    fn test_new_day_recomputes() {
        let transactions = monthly("Hulu", 17.99, 3);
        let mut cache = CachedDetector::default();

        let before = cache
            .detect(&transactions, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap())
            .to_vec();
        assert!(!before[0].missed_payment);

        let after = cache.detect(&transactions, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert!(after[0].missed_payment);
    }

    #[test]
    fn test_invalidate() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let mut cache = CachedDetector::default();
        cache.detect(&monthly("Hulu", 17.99, 3), today);
        cache.invalidate();
        assert!(!cache.is_cached());
        assert!(cache.detect(&[], today).is_empty());
    }
}

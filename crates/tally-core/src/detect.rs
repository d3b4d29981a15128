//! Recurring expense detection
//!
//! Groups a transaction history by normalized merchant and, for each group
//! with enough evidence, infers:
//! - the billing frequency from the median interval between charges
//! - a 0–100 confidence from occurrence count, interval and amount regularity
//! - when the next charge is expected, and whether it is overdue
//!
//! Detection is a pure function of the transactions and `today`.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use chrono::{Datelike, Duration, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::config::DetectionConfig;
use crate::models::{DetectedRecurringExpense, Frequency, Transaction, TransactionType};
use crate::normalize::{categorize_merchant_fallback, display_name, MerchantNormalizer};
use crate::stats::{coefficient_of_variation, mean, upper_median};

/// Category used when neither the transactions nor the merchant name suggest one
pub const DEFAULT_CATEGORY: &str = "Other";

const COUNT_SIGNAL_MAX: f64 = 40.0;
const REGULARITY_SIGNAL_MAX: f64 = 40.0;
const AMOUNT_SIGNAL_MAX: f64 = 20.0;

/// Detects recurring expenses in a transaction history
#[derive(Debug, Clone)]
pub struct RecurringDetector {
    config: DetectionConfig,
    normalizer: MerchantNormalizer,
}

impl RecurringDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            normalizer: MerchantNormalizer::new(),
        }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Detect recurring expenses as of `today`.
    ///
    /// Results are ordered by descending confidence, then descending average
    /// amount, then merchant key. Non-expense transactions are skipped unless
    /// `expenses_only` is turned off.
    pub fn detect(
        &self,
        transactions: &[Transaction],
        today: NaiveDate,
    ) -> Vec<DetectedRecurringExpense> {
        if transactions.is_empty() {
            return Vec::new();
        }

        let groups = self.group_by_merchant(transactions);
        let group_count = groups.len();

        // Sorted keys keep log output stable; the final sort fixes result order
        let mut keys: Vec<&String> = groups.keys().collect();
        keys.sort();

        let mut detected: Vec<DetectedRecurringExpense> = keys
            .into_iter()
            .filter_map(|key| self.analyze_group(key, &groups[key], today))
            .collect();

        detected.sort_by(compare_detections);

        info!(
            "Recurring detection: {} transactions, {} merchants, {} recurring",
            transactions.len(),
            group_count,
            detected.len()
        );

        detected
    }

    /// Bucket usable transactions by normalized merchant key
    fn group_by_merchant<'t>(
        &self,
        transactions: &'t [Transaction],
    ) -> HashMap<String, Vec<&'t Transaction>> {
        let mut by_merchant: HashMap<String, Vec<&Transaction>> = HashMap::new();

        for tx in transactions {
            if self.config.expenses_only && tx.transaction_type != TransactionType::Expense {
                continue;
            }
            if tx.transaction_date.is_none() {
                debug!("Skipping transaction {} - missing date", tx.id);
                continue;
            }
            if !tx.amount.is_finite() {
                debug!("Skipping transaction {} - non-finite amount", tx.id);
                continue;
            }

            let key = self.normalizer.normalize(&tx.merchant);
            if key.is_empty() {
                debug!(
                    "Skipping transaction {} - merchant {:?} has no usable name",
                    tx.id, tx.merchant
                );
                continue;
            }

            by_merchant.entry(key).or_default().push(tx);
        }

        by_merchant
    }

    /// Classify one merchant group, or `None` if it is not recurring
    fn analyze_group(
        &self,
        key: &str,
        group: &[&Transaction],
        today: NaiveDate,
    ) -> Option<DetectedRecurringExpense> {
        if group.len() < self.config.min_occurrences {
            return None;
        }

        let mut sorted: Vec<(NaiveDate, &Transaction)> = group
            .iter()
            .filter_map(|tx| tx.transaction_date.map(|date| (date, *tx)))
            .collect();
        sorted.sort_by(|(a_date, a), (b_date, b)| {
            a_date.cmp(b_date).then_with(|| a.id.cmp(&b.id))
        });

        let distinct_dates: BTreeSet<NaiveDate> = sorted.iter().map(|(date, _)| *date).collect();
        if distinct_dates.len() < self.config.min_distinct_dates {
            debug!(
                "Discarding {} - {} charges on only {} distinct dates",
                key,
                sorted.len(),
                distinct_dates.len()
            );
            return None;
        }

        let intervals = charge_intervals(&sorted);
        let median_interval = upper_median(&intervals);
        let Some(frequency) = Frequency::from_interval(median_interval) else {
            debug!(
                "Discarding {} - median interval of {} days matches no frequency",
                key, median_interval
            );
            return None;
        };

        let amounts: Vec<f64> = sorted.iter().map(|(_, tx)| tx.amount).collect();
        let confidence = confidence_score(
            sorted.len(),
            coefficient_of_variation(&intervals),
            coefficient_of_variation(&amounts),
        );

        let (first_seen, _) = *sorted.first()?;
        let (last_seen, _) = *sorted.last()?;
        let Some(next_expected) = Duration::try_days(median_interval.round() as i64)
            .and_then(|period| last_seen.checked_add_signed(period))
        else {
            debug!(
                "Discarding {} - next charge after {} is out of date range",
                key, last_seen
            );
            return None;
        };

        // A grace cutoff before the earliest representable date is never passed
        let missed_payment = Duration::try_days(self.config.grace_period_days)
            .and_then(|grace| today.checked_sub_signed(grace))
            .is_some_and(|cutoff| next_expected < cutoff);

        let total_spent_this_year: f64 = sorted
            .iter()
            .filter(|(date, _)| date.year() == today.year())
            .map(|(_, tx)| tx.amount)
            .sum();

        let (currency, mixed_currency) = dominant_currency(&sorted);
        if mixed_currency {
            warn!(
                "Recurring merchant {} mixes currencies; amounts are combined without conversion",
                key
            );
        }

        let merchant = display_name(sorted.iter().map(|(_, tx)| tx.merchant.as_str()))?;
        let category = group_category(key, &sorted);

        debug!(
            "Found recurring expense: {} @ {:.2}/{} (confidence {})",
            merchant,
            mean(&amounts),
            frequency,
            confidence
        );

        Some(DetectedRecurringExpense {
            merchant,
            merchant_key: key.to_string(),
            category,
            frequency,
            interval_days: median_interval,
            average_amount: mean(&amounts),
            currency,
            mixed_currency,
            confidence,
            transactions: sorted.iter().map(|(_, tx)| (*tx).clone()).collect(),
            first_seen,
            last_seen,
            next_expected,
            missed_payment,
            total_spent_this_year,
        })
    }
}

impl Default for RecurringDetector {
    fn default() -> Self {
        Self::new(DetectionConfig::default())
    }
}

/// Detect recurring expenses with the default configuration.
///
/// The default only considers expense transactions; income and transfers
/// that recur (payroll, savings sweeps) are skipped. Build a
/// [`RecurringDetector`] with `expenses_only = false` to include them.
pub fn detect_recurring(
    transactions: &[Transaction],
    today: NaiveDate,
) -> Vec<DetectedRecurringExpense> {
    RecurringDetector::default().detect(transactions, today)
}

/// Detect recurring expenses as of the current UTC date
pub fn detect_recurring_today(transactions: &[Transaction]) -> Vec<DetectedRecurringExpense> {
    detect_recurring(transactions, Utc::now().date_naive())
}

/// Day gaps between consecutive charges.
///
/// Same-day duplicates (0-day gaps) are dropped as long as some positive gap
/// remains.
fn charge_intervals(sorted: &[(NaiveDate, &Transaction)]) -> Vec<f64> {
    let intervals: Vec<f64> = sorted
        .windows(2)
        .map(|w| (w[1].0 - w[0].0).num_days() as f64)
        .collect();

    if intervals.iter().any(|&days| days > 0.0) {
        intervals.into_iter().filter(|&days| days > 0.0).collect()
    } else {
        intervals
    }
}

/// Count signal: `min(40, (occurrences - 3) * 8 + 16)`
pub fn count_signal(occurrences: usize) -> f64 {
    let extra = occurrences.saturating_sub(3) as f64;
    (extra * 8.0 + 16.0).min(COUNT_SIGNAL_MAX)
}

/// Interval regularity: CV ≤ 0.1 scores 40, falling linearly to 0 at CV ≥ 0.5
pub fn regularity_signal(interval_cv: f64) -> f64 {
    linear_signal(interval_cv, 0.1, 0.5, REGULARITY_SIGNAL_MAX)
}

/// Amount regularity: CV ≤ 0.05 scores 20, falling linearly to 0 at CV ≥ 0.3
pub fn amount_signal(amount_cv: f64) -> f64 {
    linear_signal(amount_cv, 0.05, 0.3, AMOUNT_SIGNAL_MAX)
}

fn linear_signal(cv: f64, full_at: f64, zero_at: f64, max: f64) -> f64 {
    if cv.is_nan() || cv >= zero_at {
        0.0
    } else if cv <= full_at {
        max
    } else {
        max * (zero_at - cv) / (zero_at - full_at)
    }
}

/// Combine the three signals into a 0–100 confidence
pub fn confidence_score(occurrences: usize, interval_cv: f64, amount_cv: f64) -> u8 {
    let total =
        count_signal(occurrences) + regularity_signal(interval_cv) + amount_signal(amount_cv);
    total.clamp(0.0, 100.0).round() as u8
}

/// Most common currency in the group and whether more than one appears
fn dominant_currency(sorted: &[(NaiveDate, &Transaction)]) -> (String, bool) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for (_, tx) in sorted {
        *counts.entry(tx.currency.trim().to_uppercase()).or_insert(0) += 1;
    }

    let mixed = counts.len() > 1;
    let currency = counts
        .into_iter()
        .max_by(|(a, a_count), (b, b_count)| a_count.cmp(b_count).then_with(|| b.cmp(a)))
        .map(|(currency, _)| currency)
        .unwrap_or_default();

    (currency, mixed)
}

/// Most common non-empty category, falling back to merchant heuristics
fn group_category(key: &str, sorted: &[(NaiveDate, &Transaction)]) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (_, tx) in sorted {
        if let Some(category) = tx.category.as_deref().map(str::trim) {
            if !category.is_empty() {
                *counts.entry(category).or_insert(0) += 1;
            }
        }
    }

    counts
        .into_iter()
        .max_by(|(a, a_count), (b, b_count)| a_count.cmp(b_count).then_with(|| b.cmp(a)))
        .map(|(category, _)| category.to_string())
        .or_else(|| categorize_merchant_fallback(key).map(str::to_string))
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}

fn compare_detections(a: &DetectedRecurringExpense, b: &DetectedRecurringExpense) -> Ordering {
    b.confidence
        .cmp(&a.confidence)
        .then_with(|| b.average_amount.total_cmp(&a.average_amount))
        .then_with(|| a.merchant_key.cmp(&b.merchant_key))
}

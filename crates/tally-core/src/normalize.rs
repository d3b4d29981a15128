//! Merchant name normalization
//!
//! Raw merchant strings from card feeds and manual entry vary per charge
//! ("Netflix", "NETFLIX.COM*12345", "SQ *BLUE BOTTLE #12"). The normalizer
//! reduces them to a stable grouping key so one merchant forms one group.

use std::collections::HashMap;

use regex::Regex;

/// Canonicalizes raw merchant strings into grouping keys
#[derive(Debug, Clone)]
pub struct MerchantNormalizer {
    /// Wallet and payment-processor prefixes that vary per charge
    payment_prefix: Regex,
    /// Domain suffixes (`netflix.com` and `netflix` are the same merchant)
    domain_suffix: Regex,
    /// Store/location numbers (`#1234`, `store 12`, `no. 7`)
    store_number: Regex,
    punctuation: Regex,
    /// Trailing transaction-reference numbers (4+ digits, attached or spaced)
    trailing_reference: Regex,
}

impl MerchantNormalizer {
    pub fn new() -> Self {
        Self {
            payment_prefix: Regex::new(
                r"^(?:(?:aplpay|applepay|gpay)\s+|(?:sq|sp|tst|paypal)\s*\*\s*)",
            )
            .expect("valid regex"),
            domain_suffix: Regex::new(r"\.(?:com|net|org|io|co|us)\b").expect("valid regex"),
            store_number: Regex::new(r"#\s*\d+|\b(?:store|str|no)\.?\s*\d+\b")
                .expect("valid regex"),
            punctuation: Regex::new(r"[^\p{L}\p{N}\s]").expect("valid regex"),
            trailing_reference: Regex::new(r"(?:\s*\d{4,})+\s*$").expect("valid regex"),
        }
    }

    /// Normalize a raw merchant string into its grouping key.
    ///
    /// Returns an empty string when nothing identifying is left (blank or
    /// punctuation-only input); callers treat that as a malformed row.
    /// A reference number is only stripped when a letter remains, so an
    /// all-digit merchant keeps its digits as the key.
    pub fn normalize(&self, raw: &str) -> String {
        let lower = raw.trim().to_lowercase();
        let cleaned = self.payment_prefix.replace(&lower, "");
        let cleaned = self.domain_suffix.replace_all(&cleaned, "");
        let cleaned = self.store_number.replace_all(&cleaned, " ");
        let cleaned = self.punctuation.replace_all(&cleaned, " ");
        let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        let stripped = self.trailing_reference.replace(&collapsed, "");
        let stripped = stripped.trim();
        if stripped.chars().any(char::is_alphabetic) {
            stripped.to_string()
        } else {
            collapsed
        }
    }
}

impl Default for MerchantNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick the display name for a merchant group.
///
/// Most frequent raw string wins; ties go to the longest, then to the
/// lexicographically smallest so the choice is independent of input order.
pub fn display_name<'a, I>(raw_names: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for name in raw_names {
        *counts.entry(name.trim()).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .max_by(|(a_name, a_count), (b_name, b_count)| {
            a_count
                .cmp(b_count)
                .then_with(|| a_name.len().cmp(&b_name.len()))
                .then_with(|| b_name.cmp(a_name))
        })
        .map(|(name, _)| name.to_string())
}

/// Categorize a merchant by service type using hardcoded patterns.
/// Used when none of the group's transactions carry a category.
pub fn categorize_merchant_fallback(merchant_key: &str) -> Option<&'static str> {
    let m = merchant_key.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| m.contains(n));

    if has(&[
        "netflix",
        "hulu",
        "disney",
        "hbo",
        "paramount",
        "peacock",
        "prime video",
        "apple tv",
    ]) {
        return Some("Streaming");
    }

    if has(&["spotify", "apple music", "tidal", "pandora", "youtube music"]) {
        return Some("Music");
    }

    if has(&["icloud", "google one", "dropbox", "onedrive"]) {
        return Some("Cloud Storage");
    }

    if has(&[
        "nyt",
        "new york times",
        "wsj",
        "washington post",
        "medium",
        "substack",
    ]) {
        return Some("News");
    }

    if has(&[
        "peloton",
        "strava",
        "fitbit",
        "myfitnesspal",
        "headspace",
        "calm",
        "gym",
        "fitness",
    ]) {
        return Some("Fitness");
    }

    if has(&["github", "openai", "adobe", "microsoft", "notion", "figma"]) {
        return Some("Software");
    }

    if has(&["electric", "energy", "water", "gas co", "internet", "comcast", "verizon"]) {
        return Some("Utilities");
    }

    if has(&["insurance", "geico", "allstate", "progressive"]) {
        return Some("Insurance");
    }

    if has(&["rent", "mortgage", "hoa"]) {
        return Some("Housing");
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_merchant() {
        let n = MerchantNormalizer::new();
        assert_eq!(n.normalize("Netflix"), "netflix");
        assert_eq!(n.normalize("NETFLIX.COM"), "netflix");
        assert_eq!(n.normalize("NETFLIX.COM*12345"), "netflix");
        assert_eq!(n.normalize("  Spotify   USA "), "spotify usa");
    }

    #[test]
    fn test_normalize_strips_store_numbers_and_references() {
        let n = MerchantNormalizer::new();
        assert_eq!(n.normalize("Starbucks #1234"), "starbucks");
        assert_eq!(n.normalize("STARBUCKS STORE 88 SEATTLE"), "starbucks seattle");
        assert_eq!(n.normalize("Planet Fitness 000123456"), "planet fitness");
        assert_eq!(n.normalize("ACME GYM 2024 0099"), "acme gym");
        // Short numbers are part of the name, not references
        assert_eq!(n.normalize("24 Hour Fitness"), "24 hour fitness");
        assert_eq!(n.normalize("Studio 54"), "studio 54");
    }

    #[test]
    fn test_normalize_strips_attached_references() {
        let n = MerchantNormalizer::new();
        assert_eq!(n.normalize("Spotify12345"), "spotify");
        assert_eq!(n.normalize("SPOTIFY67890"), "spotify");
        assert_eq!(n.normalize("Spotify"), "spotify");
        assert_eq!(n.normalize("ACME GYM2024 0099"), "acme gym");
        // Nothing but digits: the digits are the name
        assert_eq!(n.normalize("12345678"), "12345678");
        assert_eq!(n.normalize("0042 1234"), "0042 1234");
    }

    #[test]
    fn test_normalize_payment_prefixes() {
        let n = MerchantNormalizer::new();
        assert_eq!(n.normalize("APLPAY STARBUCKS"), "starbucks");
        assert_eq!(n.normalize("SQ *BLUE BOTTLE"), "blue bottle");
        assert_eq!(n.normalize("TST* Corner Deli"), "corner deli");
        assert_eq!(n.normalize("PAYPAL *DROPBOX"), "dropbox");
    }

    #[test]
    fn test_normalize_degenerate_input() {
        let n = MerchantNormalizer::new();
        assert_eq!(n.normalize(""), "");
        assert_eq!(n.normalize("  *** "), "");
        assert_eq!(n.normalize("#1234"), "");
    }

    #[test]
    fn test_display_name_prefers_most_common() {
        let name = display_name(["Netflix", "NETFLIX.COM", "Netflix"]).unwrap();
        assert_eq!(name, "Netflix");
    }

    #[test]
    fn test_display_name_tie_breaks() {
        // Equal counts: longest wins
        let name = display_name(["Netflix", "NETFLIX.COM"]).unwrap();
        assert_eq!(name, "NETFLIX.COM");

        // Equal counts and length: lexicographically smallest, in any order
        let a = display_name(["Hulu", "HULU"]).unwrap();
        let b = display_name(["HULU", "Hulu"]).unwrap();
        assert_eq!(a, "HULU");
        assert_eq!(a, b);

        assert!(display_name(std::iter::empty()).is_none());
    }

    #[test]
    fn test_categorize_fallback() {
        assert_eq!(categorize_merchant_fallback("netflix"), Some("Streaming"));
        assert_eq!(categorize_merchant_fallback("spotify usa"), Some("Music"));
        assert_eq!(
            categorize_merchant_fallback("city electric co"),
            Some("Utilities")
        );
        assert_eq!(categorize_merchant_fallback("random store"), None);
    }
}

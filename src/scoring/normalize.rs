use std::collections::HashSet;

use serde::Serialize;

use crate::{NormalizedProduct, RawProduct};

/// Rating used when no row carries a valid rating to take the median of.
const FALLBACK_RATING: f64 = 3.0;

/// Row accounting for one normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub rows_read: usize,
    pub duplicates_removed: usize,
    pub invalid_dropped: usize,
    pub ratings_imputed: usize,
    pub rating_counts_imputed: usize,
    pub rows_kept: usize,
}

/// A row after field parsing but before the required-field check and imputation.
#[derive(Debug, Clone)]
struct ParsedRow {
    product_id: String,
    product_name: String,
    category: String,
    discounted_price: Option<f64>,
    actual_price: Option<f64>,
    discount_percentage: Option<f64>,
    rating: Option<f64>,
    rating_count: Option<u64>,
    review_title: Option<String>,
    review_content: Option<String>,
}

impl ParsedRow {
    fn from_raw(raw: RawProduct) -> Self {
        Self {
            discounted_price: raw.discounted_price.as_deref().and_then(parse_price),
            actual_price: raw.actual_price.as_deref().and_then(parse_price),
            discount_percentage: raw
                .discount_percentage
                .as_deref()
                .and_then(parse_percentage),
            rating: raw.rating.as_deref().and_then(parse_number),
            rating_count: raw.rating_count.as_deref().and_then(parse_count),
            review_title: non_empty(raw.review_title),
            review_content: non_empty(raw.review_content),
            product_id: raw.product_id.trim().to_string(),
            product_name: raw.product_name.trim().to_string(),
            category: raw.category.trim().to_string(),
        }
    }

    fn dedup_key(&self) -> String {
        let float_key = |value: Option<f64>| {
            value
                .map(|v| v.to_bits().to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        format!(
            "{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{:?}\u{1f}{:?}\u{1f}{:?}",
            self.product_id,
            self.product_name,
            self.category,
            float_key(self.discounted_price),
            float_key(self.actual_price),
            float_key(self.discount_percentage),
            float_key(self.rating),
            self.rating_count,
            self.review_title,
            self.review_content,
        )
    }

    /// Clears parsed values that fall outside their valid range. Runs after
    /// deduplication, which compares the values as parsed.
    fn clear_out_of_range(&mut self) {
        self.discounted_price = self.discounted_price.filter(|price| *price >= 0.0);
        self.actual_price = self.actual_price.filter(|price| *price > 0.0);
        self.discount_percentage = self
            .discount_percentage
            .filter(|pct| (0.0..=100.0).contains(pct));
        self.rating = self.rating.filter(|rating| (1.0..=5.0).contains(rating));
    }

    fn has_required_fields(&self) -> bool {
        self.actual_price.is_some()
            && self.discounted_price.is_some()
            && self.discount_percentage.is_some()
    }
}

/// Cleans raw rows into numeric records.
///
/// Exact duplicates (after parsing) are removed first, then rows missing any of
/// `actual_price`, `discounted_price` or `discount_percentage`, or holding one
/// out of range, are dropped. A missing or out-of-range rating takes the median of the surviving valid ratings and a missing
/// rating count becomes zero.
pub fn normalize(rows: Vec<RawProduct>) -> (Vec<NormalizedProduct>, NormalizeReport) {
    let mut report = NormalizeReport {
        rows_read: rows.len(),
        ..NormalizeReport::default()
    };

    let mut seen = HashSet::new();
    let mut parsed = Vec::with_capacity(rows.len());
    for raw in rows {
        let row = ParsedRow::from_raw(raw);
        if seen.insert(row.dedup_key()) {
            parsed.push(row);
        } else {
            report.duplicates_removed += 1;
        }
    }

    let before = parsed.len();
    parsed.iter_mut().for_each(ParsedRow::clear_out_of_range);
    parsed.retain(ParsedRow::has_required_fields);
    report.invalid_dropped = before - parsed.len();

    let valid_ratings: Vec<f64> = parsed.iter().filter_map(|row| row.rating).collect();
    let fill_rating = median(&valid_ratings).unwrap_or_else(|| {
        if !parsed.is_empty() {
            tracing::warn!(
                fallback = FALLBACK_RATING,
                "no valid ratings to impute from, using fallback"
            );
        }
        FALLBACK_RATING
    });

    let mut products = Vec::with_capacity(parsed.len());
    for row in parsed {
        let rating = row.rating.unwrap_or_else(|| {
            report.ratings_imputed += 1;
            fill_rating
        });
        let rating_count = row.rating_count.unwrap_or_else(|| {
            report.rating_counts_imputed += 1;
            0
        });
        products.push(NormalizedProduct {
            product_id: row.product_id,
            product_name: row.product_name,
            category: row.category,
            discounted_price: row.discounted_price.unwrap_or_default(),
            actual_price: row.actual_price.unwrap_or_default(),
            discount_percentage: row.discount_percentage.unwrap_or_default(),
            rating,
            rating_count,
            review_title: row.review_title,
            review_content: row.review_content,
        });
    }

    report.rows_kept = products.len();
    tracing::info!(
        rows_read = report.rows_read,
        duplicates_removed = report.duplicates_removed,
        invalid_dropped = report.invalid_dropped,
        ratings_imputed = report.ratings_imputed,
        rating_counts_imputed = report.rating_counts_imputed,
        rows_kept = report.rows_kept,
        "normalized catalog rows"
    );

    (products, report)
}

/// Parses a currency string such as `₹1,099` or `$ 12.50`.
pub fn parse_price(value: &str) -> Option<f64> {
    let cleaned: String = value
        .chars()
        .filter(|ch| ch.is_ascii_digit() || matches!(ch, '.' | '-'))
        .collect();
    parse_number(&cleaned)
}

/// Parses a percentage string such as `64%`.
pub fn parse_percentage(value: &str) -> Option<f64> {
    parse_number(value.replace('%', "").trim())
}

/// Parses a comma-grouped count such as `24,269`.
pub fn parse_count(value: &str) -> Option<u64> {
    let number = parse_number(&value.replace(',', ""))?;
    if number < 0.0 || number.fract() != 0.0 {
        return None;
    }
    Some(number as u64)
}

pub fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|number| number.is_finite())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

pub(crate) fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, discounted: &str, actual: &str, pct: &str, rating: &str, count: &str) -> RawProduct {
        let field = |value: &str| {
            if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        };
        RawProduct {
            product_id: id.to_string(),
            product_name: format!("Product {id}"),
            category: "Electronics|Cables".to_string(),
            discounted_price: field(discounted),
            actual_price: field(actual),
            discount_percentage: field(pct),
            rating: field(rating),
            rating_count: field(count),
            review_title: None,
            review_content: None,
        }
    }

    #[test]
    fn parses_locale_formatted_fields() {
        assert_eq!(parse_price("₹1,099"), Some(1099.0));
        assert_eq!(parse_price("â‚¹399"), Some(399.0));
        assert_eq!(parse_price("$ 12.50"), Some(12.5));
        assert_eq!(parse_price("n/a"), None);
        assert_eq!(parse_percentage("64%"), Some(64.0));
        assert_eq!(parse_count("24,269"), Some(24269));
        assert_eq!(parse_count("-3"), None);
        assert_eq!(parse_number("|"), None);
    }

    #[test]
    fn drops_rows_missing_required_numerics() {
        let rows = vec![
            raw("a", "₹399", "₹1,099", "64%", "4.2", "24,269"),
            raw("b", "", "₹1,099", "64%", "4.2", "10"),
            raw("c", "₹399", "free", "64%", "4.2", "10"),
            raw("d", "₹399", "₹1,099", "", "4.2", "10"),
        ];
        let (products, report) = normalize(rows);
        assert_eq!(products.len(), 1);
        assert_eq!(report.invalid_dropped, 3);
        assert_eq!(products[0].actual_price, 1099.0);
        assert_eq!(products[0].rating_count, 24269);
    }

    #[test]
    fn removes_exact_duplicates_before_imputation() {
        let rows = vec![
            raw("a", "100", "200", "50%", "4.0", "10"),
            raw("a", "100", "200", "50%", "4.0", "10"),
            raw("b", "100", "200", "50%", "", ""),
        ];
        let (products, report) = normalize(rows);
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(products.len(), 2);
        assert_eq!(report.ratings_imputed, 1);
        assert_eq!(report.rating_counts_imputed, 1);
        assert_eq!(products[1].rating, 4.0);
        assert_eq!(products[1].rating_count, 0);
    }

    #[test]
    fn imputes_missing_rating_with_median() {
        let rows = vec![
            raw("a", "10", "20", "50%", "3.0", "1"),
            raw("b", "10", "20", "50%", "4.0", "1"),
            raw("c", "10", "20", "50%", "5.0", "1"),
            raw("d", "10", "20", "50%", "4.6", "1"),
            raw("e", "10", "20", "50%", "|", "1"),
        ];
        let (products, report) = normalize(rows);
        assert_eq!(report.ratings_imputed, 1);
        assert!((products[4].rating - 4.3).abs() < 1e-9);
    }

    #[test]
    fn rejects_non_positive_actual_price() {
        let rows = vec![raw("a", "0", "0", "0%", "4.0", "1")];
        let (products, report) = normalize(rows);
        assert!(products.is_empty());
        assert_eq!(report.invalid_dropped, 1);
    }

    #[test]
    fn out_of_range_values_still_count_as_distinct() {
        let rows = vec![
            raw("x", "100", "200", "50%", "6.0", "10"),
            raw("x", "100", "200", "50%", "0.5", "10"),
            raw("y", "100", "200", "50%", "4.0", "10"),
        ];
        let (products, report) = normalize(rows);
        assert_eq!(report.duplicates_removed, 0);
        assert_eq!(report.ratings_imputed, 2);
        assert_eq!(products.len(), 3);
        assert_eq!(products[0].rating, 4.0);
        assert_eq!(products[1].rating, 4.0);

        let rows = vec![
            raw("z", "100", "0", "50%", "4.0", "10"),
            raw("z", "100", "-3", "50%", "4.0", "10"),
        ];
        let (products, report) = normalize(rows);
        assert!(products.is_empty());
        assert_eq!(report.duplicates_removed, 0);
        assert_eq!(report.invalid_dropped, 2);
    }

    #[test]
    fn median_handles_even_and_odd_lengths() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }
}

pub mod config;
pub mod error;
pub mod insights;
pub mod rules;
pub mod scoring;
pub mod snapshot;
pub mod synthetic;

use serde::{Deserialize, Serialize};

pub use error::{Error, Result};

/// Columns every input catalog must carry. `review_title` and `review_content`
/// are optional.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "product_id",
    "product_name",
    "category",
    "discounted_price",
    "actual_price",
    "discount_percentage",
    "rating",
    "rating_count",
];

/// One catalog row as it arrives: numerics are still locale-formatted strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProduct {
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub discounted_price: Option<String>,
    pub actual_price: Option<String>,
    pub discount_percentage: Option<String>,
    pub rating: Option<String>,
    pub rating_count: Option<String>,
    #[serde(default)]
    pub review_title: Option<String>,
    #[serde(default)]
    pub review_content: Option<String>,
}

/// A row after cleaning and imputation. Every numeric is finite.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedProduct {
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub discounted_price: f64,
    pub actual_price: f64,
    pub discount_percentage: f64,
    pub rating: f64,
    pub rating_count: u64,
    pub review_title: Option<String>,
    pub review_content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceBucket {
    #[serde(rename = "Very Low")]
    VeryLow,
    Low,
    Medium,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl PriceBucket {
    pub const ALL: [PriceBucket; 5] = [
        PriceBucket::VeryLow,
        PriceBucket::Low,
        PriceBucket::Medium,
        PriceBucket::High,
        PriceBucket::VeryHigh,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PriceBucket::VeryLow => "Very Low",
            PriceBucket::Low => "Low",
            PriceBucket::Medium => "Medium",
            PriceBucket::High => "High",
            PriceBucket::VeryHigh => "Very High",
        }
    }
}

/// Business names for the five market segments. The discriminant is the
/// segment index written to the `segment` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentName {
    #[serde(rename = "Best Deals")]
    BestDeals,
    #[serde(rename = "Discount Trap")]
    DiscountTrap,
    #[serde(rename = "Hidden Gems")]
    HiddenGems,
    #[serde(rename = "Market Leaders")]
    MarketLeaders,
    #[serde(rename = "Premium Picks")]
    PremiumPicks,
}

impl SegmentName {
    pub const ALL: [SegmentName; 5] = [
        SegmentName::BestDeals,
        SegmentName::DiscountTrap,
        SegmentName::HiddenGems,
        SegmentName::MarketLeaders,
        SegmentName::PremiumPicks,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> u8 {
        match self {
            SegmentName::BestDeals => 0,
            SegmentName::DiscountTrap => 1,
            SegmentName::HiddenGems => 2,
            SegmentName::MarketLeaders => 3,
            SegmentName::PremiumPicks => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SegmentName::BestDeals => "Best Deals",
            SegmentName::DiscountTrap => "Discount Trap",
            SegmentName::HiddenGems => "Hidden Gems",
            SegmentName::MarketLeaders => "Market Leaders",
            SegmentName::PremiumPicks => "Premium Picks",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        let wanted = normalize_text(value);
        Self::ALL
            .into_iter()
            .find(|segment| normalize_text(segment.label()) == wanted)
    }
}

/// The three intelligence scores, each in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreTriple {
    pub value: f64,
    pub trust: f64,
    pub popularity: f64,
}

impl ScoreTriple {
    pub fn as_array(&self) -> [f64; 3] {
        [self.value, self.trust, self.popularity]
    }
}

/// An enriched catalog row. Field order is the column order of the output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub discounted_price: f64,
    pub actual_price: f64,
    pub discount_percentage: f64,
    pub rating: f64,
    pub rating_count: u64,
    pub review_title: Option<String>,
    pub review_content: Option<String>,
    pub discount_amount: f64,
    pub discount_ratio: f64,
    pub price_bucket: PriceBucket,
    pub main_category: String,
    pub popularity_score: f64,
    pub weighted_rating: f64,
    pub trust_score: f64,
    pub value_score: f64,
    pub segment: u8,
    pub segment_name: SegmentName,
    pub sentiment_score: f64,
    pub risk_flag: u8,
}

impl Product {
    pub fn scores(&self) -> ScoreTriple {
        ScoreTriple {
            value: self.value_score,
            trust: self.trust_score,
            popularity: self.popularity_score,
        }
    }

    pub fn is_risky(&self) -> bool {
        self.risk_flag == 1
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}

pub(crate) fn normalize_text(value: &str) -> String {
    value
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_number(value: f64) -> String {
    let rounded = value.round().max(0.0) as i64;
    let mut chars: Vec<char> = rounded.to_string().chars().collect();
    let mut result = String::new();
    let mut count = 0usize;

    while let Some(ch) = chars.pop() {
        if count == 3 {
            result.push(',');
            count = 0;
        }
        result.push(ch);
        count += 1;
    }

    result.chars().rev().collect()
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

pub fn format_float(value: f64, digits: usize) -> String {
    format!("{:.1$}", value, digits)
}

pub(crate) fn stable_hash64(bytes: &[u8]) -> u64 {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_index_matches_table_position() {
        for (position, segment) in SegmentName::ALL.iter().enumerate() {
            assert_eq!(segment.index() as usize, position);
            assert_eq!(SegmentName::from_index(position), Some(*segment));
        }
        assert_eq!(SegmentName::from_index(5), None);
    }

    #[test]
    fn segment_label_lookup_ignores_case_and_spacing() {
        assert_eq!(
            SegmentName::from_label("  hidden   GEMS "),
            Some(SegmentName::HiddenGems)
        );
        assert_eq!(SegmentName::from_label("Bargains"), None);
    }

    #[test]
    fn format_number_groups_thousands() {
        assert_eq!(format_number(1234567.4), "1,234,567");
        assert_eq!(format_number(999.0), "999");
        assert_eq!(format_number(-5.0), "0");
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A mid-range enriched product with the given scores.
    pub fn product(id: &str, value: f64, trust: f64, popularity: f64) -> Product {
        Product {
            product_id: id.to_string(),
            product_name: format!("Product {id}"),
            category: "Electronics|Audio|Headphones".to_string(),
            discounted_price: 500.0,
            actual_price: 1000.0,
            discount_percentage: 50.0,
            rating: 4.0,
            rating_count: 1200,
            review_title: None,
            review_content: None,
            discount_amount: 500.0,
            discount_ratio: 0.5,
            price_bucket: PriceBucket::Medium,
            main_category: "Electronics".to_string(),
            popularity_score: popularity,
            weighted_rating: 4.0,
            trust_score: trust,
            value_score: value,
            segment: 0,
            segment_name: SegmentName::BestDeals,
            sentiment_score: 0.0,
            risk_flag: 0,
        }
    }
}

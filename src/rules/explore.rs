use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::insights::SentimentLabel;
use crate::rules::{assign_badge, Badge};
use crate::{normalize_text, Product, SegmentName};

/// Read-only explorer filters. Every bound is inclusive and every field is
/// optional; the default filter keeps everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductFilter {
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
    pub category: Option<String>,
    pub segment: Option<SegmentName>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_discount: Option<f64>,
    pub max_discount: Option<f64>,
    pub min_rating: Option<f64>,
    pub max_rating: Option<f64>,
    pub risk_only: bool,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(search) = self.search.as_deref().map(str::trim) {
            if !search.is_empty()
                && !product
                    .product_name
                    .to_lowercase()
                    .contains(&search.to_lowercase())
            {
                return false;
            }
        }
        if let Some(category) = self.category.as_deref() {
            if normalize_text(&product.main_category) != normalize_text(category) {
                return false;
            }
        }
        if let Some(segment) = self.segment {
            if product.segment_name != segment {
                return false;
            }
        }
        if self.risk_only && !product.is_risky() {
            return false;
        }

        within(product.discounted_price, self.min_price, self.max_price)
            && within(product.discount_percentage, self.min_discount, self.max_discount)
            && within(product.rating, self.min_rating, self.max_rating)
    }
}

/// Filters the catalog and orders the matches by trust, then value, both
/// descending. Equal pairs keep catalog order.
pub fn explore<'a>(products: &'a [Product], filter: &ProductFilter) -> Vec<&'a Product> {
    let mut matches: Vec<&Product> = products.iter().filter(|p| filter.matches(p)).collect();
    matches.sort_by(|a, b| {
        b.trust_score
            .partial_cmp(&a.trust_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                b.value_score
                    .partial_cmp(&a.value_score)
                    .unwrap_or(Ordering::Equal)
            })
    });
    matches
}

/// Looks a product up by id, falling back to an exact (case-insensitive) name.
pub fn find_product<'a>(products: &'a [Product], key: &str) -> Option<&'a Product> {
    let key = key.trim();
    products
        .iter()
        .find(|product| product.product_id == key)
        .or_else(|| {
            let wanted = normalize_text(key);
            products
                .iter()
                .find(|product| normalize_text(&product.product_name) == wanted)
        })
}

/// Drill-down view of one product.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail<'a> {
    pub product: &'a Product,
    pub badge: Option<Badge>,
    pub sentiment: SentimentLabel,
}

impl<'a> ProductDetail<'a> {
    pub fn new(product: &'a Product) -> Self {
        Self {
            product,
            badge: assign_badge(product),
            sentiment: SentimentLabel::from_score(product.sentiment_score),
        }
    }
}

fn within(value: f64, min: Option<f64>, max: Option<f64>) -> bool {
    min.map(|min| value >= min).unwrap_or(true) && max.map(|max| value <= max).unwrap_or(true)
}

use serde::{Deserialize, Serialize};

use catalog_intel::insights::SentimentLabel;
use catalog_intel::rules::{
    assign_badge, Badge, Comparison, Preference, ProductDetail, RecommendQuery, Recommendation,
    WhatIfInput, WhatIfOutcome,
};
use catalog_intel::scoring::NormalizeReport;
use catalog_intel::{PriceBucket, Product, SegmentName};

#[derive(Debug, Default, Deserialize)]
pub struct ApiRecommendParams {
    pub budget: Option<f64>,
    pub min_rating: Option<f64>,
    pub category: Option<String>,
    pub preference: Option<String>,
    pub top_n: Option<usize>,
}

impl ApiRecommendParams {
    pub fn into_query(self) -> Result<RecommendQuery, String> {
        let mut query = RecommendQuery::default();
        if let Some(budget) = self.budget {
            if !budget.is_finite() || budget < 0.0 {
                return Err(format!("invalid budget: {}", budget));
            }
            query.budget = budget;
        }
        if let Some(min_rating) = self.min_rating {
            if !(0.0..=5.0).contains(&min_rating) {
                return Err(format!("invalid min_rating (0-5): {}", min_rating));
            }
            query.min_rating = min_rating;
        }
        if let Some(preference) = self.preference.as_deref() {
            query.preference = Preference::from_label(preference)
                .ok_or_else(|| format!("invalid preference: {}", preference))?;
        }
        if let Some(top_n) = self.top_n {
            query.top_n = top_n;
        }
        query.category = self.category.filter(|category| !category.trim().is_empty());
        Ok(query)
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiCompareParams {
    pub a: String,
    pub b: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiSimulateRequest {
    pub product_id: String,
    pub new_actual_price: f64,
    pub new_discounted_price: f64,
}

impl ApiSimulateRequest {
    pub fn into_input(self) -> (String, WhatIfInput) {
        (
            self.product_id,
            WhatIfInput {
                new_actual_price: self.new_actual_price,
                new_discounted_price: self.new_discounted_price,
            },
        )
    }
}

#[derive(Debug, Serialize)]
pub struct ApiHealth {
    pub status: &'static str,
    pub snapshot_id: String,
    pub products: usize,
}

/// Compact row for list views.
#[derive(Debug, Serialize)]
pub struct ApiProductRow {
    pub product_id: String,
    pub product_name: String,
    pub main_category: String,
    pub discounted_price: f64,
    pub actual_price: f64,
    pub discount_percentage: f64,
    pub rating: f64,
    pub rating_count: u64,
    pub price_bucket: PriceBucket,
    pub value_score: f64,
    pub trust_score: f64,
    pub popularity_score: f64,
    pub segment_name: SegmentName,
    pub risk_flag: u8,
    pub badge: Option<Badge>,
}

impl ApiProductRow {
    pub fn from_product(product: &Product) -> Self {
        Self {
            product_id: product.product_id.clone(),
            product_name: product.product_name.clone(),
            main_category: product.main_category.clone(),
            discounted_price: product.discounted_price,
            actual_price: product.actual_price,
            discount_percentage: product.discount_percentage,
            rating: product.rating,
            rating_count: product.rating_count,
            price_bucket: product.price_bucket,
            value_score: product.value_score,
            trust_score: product.trust_score,
            popularity_score: product.popularity_score,
            segment_name: product.segment_name,
            risk_flag: product.risk_flag,
            badge: assign_badge(product),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiProductList {
    pub snapshot_id: String,
    pub count: usize,
    pub products: Vec<ApiProductRow>,
}

#[derive(Debug, Serialize)]
pub struct ApiProductDetail {
    pub product: Product,
    pub badge: Option<Badge>,
    pub sentiment: SentimentLabel,
}

impl ApiProductDetail {
    pub fn from_detail(detail: ProductDetail<'_>) -> Self {
        Self {
            product: detail.product.clone(),
            badge: detail.badge,
            sentiment: detail.sentiment,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiRecommendation {
    pub rank: usize,
    pub final_score: f64,
    #[serde(flatten)]
    pub product: ApiProductRow,
}

#[derive(Debug, Serialize)]
pub struct ApiRecommendations {
    pub preference: Preference,
    pub count: usize,
    pub recommendations: Vec<ApiRecommendation>,
}

impl ApiRecommendations {
    pub fn from_ranked(preference: Preference, ranked: &[Recommendation<'_>]) -> Self {
        let recommendations: Vec<ApiRecommendation> = ranked
            .iter()
            .enumerate()
            .map(|(idx, item)| ApiRecommendation {
                rank: idx + 1,
                final_score: item.final_score,
                product: ApiProductRow::from_product(item.product),
            })
            .collect();
        Self {
            preference,
            count: recommendations.len(),
            recommendations,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiComparison {
    pub a: ApiProductRow,
    pub b: ApiProductRow,
    #[serde(flatten)]
    pub comparison: Comparison,
}

#[derive(Debug, Serialize)]
pub struct ApiSimulation {
    pub product: ApiProductRow,
    #[serde(flatten)]
    pub outcome: WhatIfOutcome,
}

#[derive(Debug, Serialize)]
pub struct ApiReload {
    pub snapshot_id: String,
    pub previous_snapshot_id: String,
    pub products: usize,
    pub report: Option<NormalizeReport>,
}

pub mod reviews;
pub mod summary;

use serde::Serialize;

use crate::Product;

pub use reviews::{review_report, ReviewReport, SentimentLabel};
pub use summary::{
    auto_insights, category_summary, kpis, AutoInsights, CatalogKpis, CategoryHighlight,
    CategorySummary,
};

/// Cap on the riskiest-products list.
pub const DEFAULT_RISKY_LIMIT: usize = 50;

/// Every catalog-level view in one value.
#[derive(Debug, Clone, Serialize)]
pub struct InsightsReport<'a> {
    pub kpis: CatalogKpis,
    pub categories: Vec<CategorySummary>,
    pub highlights: AutoInsights,
    pub reviews: ReviewReport<'a>,
}

pub fn build_report(products: &[Product], risky_limit: usize) -> InsightsReport<'_> {
    InsightsReport {
        kpis: kpis(products),
        categories: category_summary(products),
        highlights: auto_insights(products),
        reviews: review_report(products, risky_limit),
    }
}

use serde::Serialize;
use std::collections::BTreeMap;

use crate::{mean, Product, SegmentName};

/// Headline numbers for any slice of the catalog. Averages are `None` for an
/// empty slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogKpis {
    pub product_count: usize,
    pub avg_rating: Option<f64>,
    pub avg_discount: Option<f64>,
    pub avg_trust: Option<f64>,
}

pub fn kpis<'a, I>(products: I) -> CatalogKpis
where
    I: IntoIterator<Item = &'a Product>,
{
    let mut ratings = Vec::new();
    let mut discounts = Vec::new();
    let mut trusts = Vec::new();
    for product in products {
        ratings.push(product.rating);
        discounts.push(product.discount_percentage);
        trusts.push(product.trust_score);
    }
    let average = |values: &[f64]| (!values.is_empty()).then(|| mean(values));

    CatalogKpis {
        product_count: ratings.len(),
        avg_rating: average(&ratings),
        avg_discount: average(&discounts),
        avg_trust: average(&trusts),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub main_category: String,
    pub product_count: usize,
    pub avg_discount: f64,
    pub avg_rating: f64,
    pub avg_value: f64,
    pub avg_trust: f64,
    pub avg_popularity: f64,
}

/// Per main-category averages, largest categories first.
pub fn category_summary(products: &[Product]) -> Vec<CategorySummary> {
    let mut groups: BTreeMap<&str, Vec<&Product>> = BTreeMap::new();
    for product in products {
        groups
            .entry(product.main_category.as_str())
            .or_default()
            .push(product);
    }

    let mut summaries: Vec<CategorySummary> = groups
        .into_iter()
        .map(|(category, members)| {
            let avg = |field: fn(&Product) -> f64| {
                mean(&members.iter().map(|p| field(p)).collect::<Vec<_>>())
            };
            CategorySummary {
                main_category: category.to_string(),
                product_count: members.len(),
                avg_discount: avg(|p| p.discount_percentage),
                avg_rating: avg(|p| p.rating),
                avg_value: avg(|p| p.value_score),
                avg_trust: avg(|p| p.trust_score),
                avg_popularity: avg(|p| p.popularity_score),
            }
        })
        .collect();

    // Groups arrive in name order, so equal counts stay alphabetical.
    summaries.sort_by(|a, b| b.product_count.cmp(&a.product_count));
    summaries
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryHighlight {
    pub main_category: String,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoInsights {
    pub highest_discount_category: Option<CategoryHighlight>,
    pub most_trusted_category: Option<CategoryHighlight>,
    pub discount_trap_count: usize,
    pub best_deals_count: usize,
}

pub fn auto_insights(products: &[Product]) -> AutoInsights {
    let categories = category_summary(products);
    let highlight = |field: fn(&CategorySummary) -> f64| {
        let mut best: Option<&CategorySummary> = None;
        for summary in &categories {
            if best.map(|b| field(summary) > field(b)).unwrap_or(true) {
                best = Some(summary);
            }
        }
        best.map(|summary| CategoryHighlight {
            main_category: summary.main_category.clone(),
            average: field(summary),
        })
    };
    let segment_count = |segment: SegmentName| {
        products
            .iter()
            .filter(|product| product.segment_name == segment)
            .count()
    };

    AutoInsights {
        highest_discount_category: highlight(|s| s.avg_discount),
        most_trusted_category: highlight(|s| s.avg_trust),
        discount_trap_count: segment_count(SegmentName::DiscountTrap),
        best_deals_count: segment_count(SegmentName::BestDeals),
    }
}

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::scoring::Bounds;
use crate::{normalize_text, Product, ScoreTriple};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preference {
    #[default]
    BestOverall,
    BestValue,
    MostTrusted,
    MostPopular,
}

impl Preference {
    pub fn from_label(value: &str) -> Option<Self> {
        match normalize_text(value).replace(['-', '_'], " ").as_str() {
            "best overall" | "overall" => Some(Preference::BestOverall),
            "best value" | "best value (discount)" | "value" => Some(Preference::BestValue),
            "most trusted" | "trusted" | "trust" => Some(Preference::MostTrusted),
            "most popular" | "popular" | "popularity" => Some(Preference::MostPopular),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Preference::BestOverall => "Best overall",
            Preference::BestValue => "Best value",
            Preference::MostTrusted => "Most trusted",
            Preference::MostPopular => "Most popular",
        }
    }
}

/// Linear blend of the three intelligence scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
    pub trust: f64,
    pub value: f64,
    pub popularity: f64,
}

impl RankingWeights {
    pub fn combine(&self, scores: &ScoreTriple) -> f64 {
        self.trust * scores.trust + self.value * scores.value + self.popularity * scores.popularity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub best_overall: RankingWeights,
    pub best_value: RankingWeights,
    pub most_trusted: RankingWeights,
    pub most_popular: RankingWeights,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            best_overall: RankingWeights {
                trust: 0.45,
                value: 0.35,
                popularity: 0.20,
            },
            best_value: RankingWeights {
                trust: 0.25,
                value: 0.60,
                popularity: 0.15,
            },
            most_trusted: RankingWeights {
                trust: 0.70,
                value: 0.20,
                popularity: 0.10,
            },
            most_popular: RankingWeights {
                trust: 0.20,
                value: 0.10,
                popularity: 0.70,
            },
        }
    }
}

impl RankingConfig {
    pub fn weights(&self, preference: Preference) -> &RankingWeights {
        match preference {
            Preference::BestOverall => &self.best_overall,
            Preference::BestValue => &self.best_value,
            Preference::MostTrusted => &self.most_trusted,
            Preference::MostPopular => &self.most_popular,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendQuery {
    /// Highest acceptable discounted price.
    pub budget: f64,
    pub min_rating: f64,
    /// Restricts candidates to one main category.
    pub category: Option<String>,
    pub preference: Preference,
    pub top_n: usize,
}

impl Default for RecommendQuery {
    fn default() -> Self {
        Self {
            budget: 2000.0,
            min_rating: 3.5,
            category: None,
            preference: Preference::BestOverall,
            top_n: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation<'a> {
    pub product: &'a Product,
    pub final_score: f64,
}

/// Ranks the products that fit the budget and rating floor.
///
/// Scores are re-normalized to [0, 1] within the filtered pool before the
/// preference weights apply, so the ranking adapts to what is left after
/// filtering. Ties keep input order. An empty pool yields an empty list.
pub fn recommend<'a>(
    products: &'a [Product],
    query: &RecommendQuery,
    config: &RankingConfig,
) -> Vec<Recommendation<'a>> {
    let category = query.category.as_deref().map(normalize_text);
    let pool: Vec<&Product> = products
        .iter()
        .filter(|product| {
            category
                .as_deref()
                .map(|wanted| normalize_text(&product.main_category) == wanted)
                .unwrap_or(true)
        })
        .filter(|product| {
            product.discounted_price <= query.budget && product.rating >= query.min_rating
        })
        .collect();

    let (Some(value), Some(trust), Some(popularity)) = (
        Bounds::from_values(pool.iter().map(|p| p.value_score)),
        Bounds::from_values(pool.iter().map(|p| p.trust_score)),
        Bounds::from_values(pool.iter().map(|p| p.popularity_score)),
    ) else {
        return Vec::new();
    };

    let weights = config.weights(query.preference);
    let mut ranked: Vec<Recommendation<'a>> = pool
        .into_iter()
        .map(|product| {
            let local = ScoreTriple {
                value: value.scale(product.value_score),
                trust: trust.scale(product.trust_score),
                popularity: popularity.scale(product.popularity_score),
            };
            Recommendation {
                product,
                final_score: weights.combine(&local),
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(Ordering::Equal)
    });
    ranked.truncate(query.top_n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preference_labels_parse() {
        assert_eq!(Preference::from_label("Most trusted"), Some(Preference::MostTrusted));
        assert_eq!(Preference::from_label("best-value"), Some(Preference::BestValue));
        assert_eq!(
            Preference::from_label("Best value (discount)"),
            Some(Preference::BestValue)
        );
        assert_eq!(Preference::from_label("most_popular"), Some(Preference::MostPopular));
        assert_eq!(Preference::from_label("cheapest"), None);
    }

    #[test]
    fn default_weights_sum_to_one() {
        let config = RankingConfig::default();
        for preference in [
            Preference::BestOverall,
            Preference::BestValue,
            Preference::MostTrusted,
            Preference::MostPopular,
        ] {
            let w = config.weights(preference);
            assert!((w.trust + w.value + w.popularity - 1.0).abs() < 1e-12);
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::{clamp, mean, Error, NormalizedProduct, PriceBucket, Product, Result};

/// Scaled value for a column whose min equals its max.
pub const NEUTRAL_SCALE: f64 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Quantile of `rating_count` used as the shrinkage strength `m`.
    pub shrinkage_quantile: f64,
    /// Weight of the discount component in `value_score`; the price component
    /// takes the rest.
    pub discount_weight: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            shrinkage_quantile: 0.6,
            discount_weight: 0.6,
        }
    }
}

/// Observed range of one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut bounds: Option<Bounds> = None;
        for value in values {
            bounds = Some(match bounds {
                None => Bounds {
                    min: value,
                    max: value,
                },
                Some(current) => Bounds {
                    min: current.min.min(value),
                    max: current.max.max(value),
                },
            });
        }
        bounds
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.max - self.min).is_normal() || self.max <= self.min
    }

    /// Min-max scales `value` into [0, 1] relative to these bounds.
    pub fn scale(&self, value: f64) -> f64 {
        if self.is_degenerate() {
            return NEUTRAL_SCALE;
        }
        (value - self.min) / (self.max - self.min)
    }
}

/// Bayesian-average damping toward the catalog mean rating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shrinkage {
    /// Review count at which a product's own rating and the mean weigh equally.
    pub m: f64,
    /// Mean rating across the catalog.
    pub c: f64,
}

impl Shrinkage {
    pub fn weighted_rating(&self, rating: f64, rating_count: u64) -> f64 {
        let v = rating_count as f64;
        let total = v + self.m;
        if total <= 0.0 {
            return self.c;
        }
        (v / total) * rating + (self.m / total) * self.c
    }
}

/// Five equal-width, right-closed bins over `discounted_price`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBuckets {
    pub bounds: Bounds,
}

impl PriceBuckets {
    pub fn bucket(&self, price: f64) -> PriceBucket {
        if self.bounds.is_degenerate() {
            return PriceBucket::Medium;
        }
        let width = (self.bounds.max - self.bounds.min) / PriceBucket::ALL.len() as f64;
        let position = ((price - self.bounds.min) / width).ceil() as i64 - 1;
        let index = position.clamp(0, PriceBucket::ALL.len() as i64 - 1) as usize;
        PriceBucket::ALL[index]
    }
}

/// The bounds `value_score` is computed against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueScaling {
    pub discount: Bounds,
    pub price: Bounds,
    pub discount_weight: f64,
}

impl ValueScaling {
    /// Rebuilds the scaling from an already enriched catalog.
    pub fn from_products(products: &[Product], discount_weight: f64) -> Option<Self> {
        Some(Self {
            discount: Bounds::from_values(products.iter().map(|p| p.discount_percentage))?,
            price: Bounds::from_values(products.iter().map(|p| p.discounted_price))?,
            discount_weight,
        })
    }

    /// Rewards a high discount and a low absolute price. Always within [0, 100].
    pub fn value_score(&self, discount_percentage: f64, discounted_price: f64) -> f64 {
        let discount_component = self.discount.scale(discount_percentage);
        let price_component = 1.0 - self.price.scale(discounted_price);
        let blended = self.discount_weight * discount_component
            + (1.0 - self.discount_weight) * price_component;
        clamp(blended * 100.0, 0.0, 100.0)
    }
}

/// Catalog-wide constants needed to score any single record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreScaling {
    pub rating_count: Bounds,
    pub weighted_rating: Bounds,
    pub value: ValueScaling,
    pub shrinkage: Shrinkage,
    pub price_buckets: PriceBuckets,
}

/// Per-record derived columns.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedFeatures {
    pub discount_amount: f64,
    pub discount_ratio: f64,
    pub price_bucket: PriceBucket,
    pub main_category: String,
    pub popularity_score: f64,
    pub weighted_rating: f64,
    pub trust_score: f64,
    pub value_score: f64,
}

impl ScoreScaling {
    /// Fits the scaling over a non-empty, validated record set.
    pub fn fit(records: &[NormalizedProduct], config: &FeatureConfig) -> Result<Option<Self>> {
        if records.is_empty() {
            return Ok(None);
        }
        for record in records {
            validate(record)?;
        }

        let counts: Vec<f64> = records.iter().map(|r| r.rating_count as f64).collect();
        let ratings: Vec<f64> = records.iter().map(|r| r.rating).collect();
        let m = quantile(&counts, config.shrinkage_quantile).unwrap_or(0.0);
        let shrinkage = Shrinkage {
            m,
            c: mean(&ratings),
        };

        let weighted = records
            .iter()
            .map(|r| shrinkage.weighted_rating(r.rating, r.rating_count));

        let price = Bounds::from_values(records.iter().map(|r| r.discounted_price));
        let discount = Bounds::from_values(records.iter().map(|r| r.discount_percentage));
        let (Some(rating_count), Some(weighted_rating), Some(price), Some(discount)) = (
            Bounds::from_values(counts),
            Bounds::from_values(weighted),
            price,
            discount,
        ) else {
            return Ok(None);
        };

        tracing::debug!(m, c = shrinkage.c, "fitted rating shrinkage");

        Ok(Some(Self {
            rating_count,
            weighted_rating,
            value: ValueScaling {
                discount,
                price,
                discount_weight: clamp(config.discount_weight, 0.0, 1.0),
            },
            shrinkage,
            price_buckets: PriceBuckets { bounds: price },
        }))
    }

    pub fn derive(&self, record: &NormalizedProduct) -> Result<DerivedFeatures> {
        validate(record)?;

        let discount_amount = record.actual_price - record.discounted_price;
        let weighted_rating = self
            .shrinkage
            .weighted_rating(record.rating, record.rating_count);

        Ok(DerivedFeatures {
            discount_amount,
            discount_ratio: discount_amount / record.actual_price,
            price_bucket: self.price_buckets.bucket(record.discounted_price),
            main_category: main_category(&record.category),
            popularity_score: clamp(
                self.rating_count.scale(record.rating_count as f64) * 100.0,
                0.0,
                100.0,
            ),
            weighted_rating,
            trust_score: clamp(
                self.weighted_rating.scale(weighted_rating) * 100.0,
                0.0,
                100.0,
            ),
            value_score: self
                .value
                .value_score(record.discount_percentage, record.discounted_price),
        })
    }
}

/// First segment of a `|`-delimited category path.
pub fn main_category(category: &str) -> String {
    category
        .split('|')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Linear-interpolated quantile, `q` in [0, 1].
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let position = clamp(q, 0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

fn validate(record: &NormalizedProduct) -> Result<()> {
    let checks = [
        ("actual_price", record.actual_price, record.actual_price > 0.0),
        (
            "discounted_price",
            record.discounted_price,
            record.discounted_price >= 0.0,
        ),
        (
            "discount_percentage",
            record.discount_percentage,
            (0.0..=100.0).contains(&record.discount_percentage),
        ),
        ("rating", record.rating, true),
    ];
    for (field, value, in_range) in checks {
        if !value.is_finite() || !in_range {
            return Err(Error::InvalidInput {
                product_id: record.product_id.clone(),
                field,
                value,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, price: f64, pct: f64, rating: f64, count: u64) -> NormalizedProduct {
        NormalizedProduct {
            product_id: id.to_string(),
            product_name: id.to_string(),
            category: "Home&Kitchen|Kitchen|Kettles".to_string(),
            discounted_price: price,
            actual_price: price * 2.0,
            discount_percentage: pct,
            rating,
            rating_count: count,
            review_title: None,
            review_content: None,
        }
    }

    #[test]
    fn degenerate_bounds_scale_to_neutral() {
        let bounds = Bounds { min: 7.0, max: 7.0 };
        assert_eq!(bounds.scale(7.0), NEUTRAL_SCALE);
        assert_eq!(bounds.scale(100.0), NEUTRAL_SCALE);
    }

    #[test]
    fn quantile_interpolates_linearly() {
        let values = [0.0, 10.0, 20.0, 30.0, 40.0];
        assert_eq!(quantile(&values, 0.6), Some(24.0));
        assert_eq!(quantile(&values, 0.0), Some(0.0));
        assert_eq!(quantile(&values, 1.0), Some(40.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn main_category_takes_first_path_segment() {
        assert_eq!(main_category("Computers&Accessories|Cables|USB"), "Computers&Accessories");
        assert_eq!(main_category("Toys"), "Toys");
    }

    #[test]
    fn price_buckets_are_right_closed() {
        let buckets = PriceBuckets {
            bounds: Bounds { min: 0.0, max: 100.0 },
        };
        assert_eq!(buckets.bucket(0.0), PriceBucket::VeryLow);
        assert_eq!(buckets.bucket(20.0), PriceBucket::VeryLow);
        assert_eq!(buckets.bucket(20.5), PriceBucket::Low);
        assert_eq!(buckets.bucket(60.0), PriceBucket::Medium);
        assert_eq!(buckets.bucket(100.0), PriceBucket::VeryHigh);

        let constant = PriceBuckets {
            bounds: Bounds { min: 5.0, max: 5.0 },
        };
        assert_eq!(constant.bucket(5.0), PriceBucket::Medium);
    }

    #[test]
    fn shrinkage_pulls_sparse_ratings_toward_mean() {
        let shrinkage = Shrinkage { m: 100.0, c: 3.5 };
        let sparse = shrinkage.weighted_rating(5.0, 1);
        let dense = shrinkage.weighted_rating(5.0, 1_000_000);
        assert!((sparse - 3.5).abs() < 0.1);
        assert!((dense - 5.0).abs() < 0.001);
        assert_eq!(Shrinkage { m: 0.0, c: 4.1 }.weighted_rating(2.0, 0), 4.1);
    }

    #[test]
    fn derive_scores_stay_in_range() {
        let records = vec![
            record("a", 100.0, 10.0, 4.0, 10),
            record("b", 500.0, 70.0, 3.1, 5_000),
            record("c", 900.0, 40.0, 4.8, 200),
        ];
        let scaling = ScoreScaling::fit(&records, &FeatureConfig::default())
            .unwrap()
            .unwrap();
        for record in &records {
            let derived = scaling.derive(record).unwrap();
            for score in [derived.popularity_score, derived.trust_score, derived.value_score] {
                assert!((0.0..=100.0).contains(&score));
            }
            assert_eq!(derived.main_category, "Home&Kitchen");
            assert!((derived.discount_ratio - 0.5).abs() < 1e-12);
        }
        let cheap_high_discount = ScoreScaling::fit(&records, &FeatureConfig::default())
            .unwrap()
            .unwrap()
            .value
            .value_score(70.0, 100.0);
        assert!((cheap_high_discount - 100.0).abs() < 1e-9);
    }

    #[test]
    fn derive_rejects_invalid_numbers_loudly() {
        let records = vec![record("a", 100.0, 10.0, 4.0, 10)];
        let scaling = ScoreScaling::fit(&records, &FeatureConfig::default())
            .unwrap()
            .unwrap();
        let mut broken = records[0].clone();
        broken.discounted_price = f64::NAN;
        assert!(matches!(
            scaling.derive(&broken),
            Err(Error::InvalidInput { field: "discounted_price", .. })
        ));
        broken.discounted_price = -1.0;
        assert!(scaling.derive(&broken).is_err());
    }

    #[test]
    fn fit_on_empty_input_passes_through() {
        assert!(ScoreScaling::fit(&[], &FeatureConfig::default())
            .unwrap()
            .is_none());
    }
}

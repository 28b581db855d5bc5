use serde::{Deserialize, Serialize};

use crate::rules::{first_match, Cascade};
use crate::scoring::ValueScaling;
use crate::{clamp, Error, Product, Result};

/// Lowest price the simulator accepts for either hypothetical price.
pub const MIN_SIMULATED_PRICE: f64 = 1.0;

/// Relative price rise above which a trusted product reads as premium.
const PREMIUM_PRICE_RATIO: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WhatIfInput {
    pub new_actual_price: f64,
    pub new_discounted_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SimulatedSegment {
    #[serde(rename = "Best Deals (simulated)")]
    BestDeals,
    #[serde(rename = "Discount Trap (simulated)")]
    DiscountTrap,
    #[serde(rename = "Hidden Gems (simulated)")]
    HiddenGems,
    #[serde(rename = "Premium Picks (simulated)")]
    PremiumPicks,
    #[serde(rename = "Balanced / Market")]
    Balanced,
}

impl SimulatedSegment {
    pub fn label(self) -> &'static str {
        match self {
            SimulatedSegment::BestDeals => "Best Deals (simulated)",
            SimulatedSegment::DiscountTrap => "Discount Trap (simulated)",
            SimulatedSegment::HiddenGems => "Hidden Gems (simulated)",
            SimulatedSegment::PremiumPicks => "Premium Picks (simulated)",
            SimulatedSegment::Balanced => "Balanced / Market",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DealTrend {
    Improved,
    Weakened,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WhatIfOutcome {
    pub new_discount_percentage: f64,
    pub new_value_score: f64,
    pub trust_score: f64,
    pub popularity_score: f64,
    pub segment: SimulatedSegment,
    pub trend: DealTrend,
}

struct SimulatedDeal {
    value_score: f64,
    discount_percentage: f64,
    trust_score: f64,
    popularity_score: f64,
    new_discounted_price: f64,
    stored_discounted_price: f64,
}

const SEGMENT_RULES: &Cascade<SimulatedDeal, SimulatedSegment> = &[
    (
        |d| d.value_score >= 80.0 && d.trust_score >= 70.0,
        SimulatedSegment::BestDeals,
    ),
    (
        |d| d.discount_percentage >= 60.0 && d.trust_score < 40.0,
        SimulatedSegment::DiscountTrap,
    ),
    (
        |d| d.trust_score >= 80.0 && d.popularity_score < 25.0,
        SimulatedSegment::HiddenGems,
    ),
    (
        |d| {
            d.new_discounted_price > d.stored_discounted_price * PREMIUM_PRICE_RATIO
                && d.trust_score >= 70.0
        },
        SimulatedSegment::PremiumPicks,
    ),
];

/// Re-scores `product` under hypothetical prices.
///
/// The value score is computed against the catalog's own bounds so it stays
/// comparable to the batch scores. Trust and popularity are carried over
/// unchanged.
pub fn simulate_deal(
    product: &Product,
    scaling: &ValueScaling,
    input: &WhatIfInput,
) -> Result<WhatIfOutcome> {
    for (name, price) in [
        ("new_actual_price", input.new_actual_price),
        ("new_discounted_price", input.new_discounted_price),
    ] {
        if !price.is_finite() || price < MIN_SIMULATED_PRICE {
            return Err(Error::InvalidSimulation(format!(
                "{name} must be at least {MIN_SIMULATED_PRICE}, got {price}"
            )));
        }
    }

    let new_discount_percentage = clamp(
        (1.0 - input.new_discounted_price / input.new_actual_price) * 100.0,
        0.0,
        100.0,
    );
    let new_value_score =
        scaling.value_score(new_discount_percentage, input.new_discounted_price);

    let deal = SimulatedDeal {
        value_score: new_value_score,
        discount_percentage: new_discount_percentage,
        trust_score: product.trust_score,
        popularity_score: product.popularity_score,
        new_discounted_price: input.new_discounted_price,
        stored_discounted_price: product.discounted_price,
    };
    let segment = first_match(SEGMENT_RULES, &deal).unwrap_or(SimulatedSegment::Balanced);

    let trend = if new_value_score > product.value_score {
        DealTrend::Improved
    } else if new_value_score < product.value_score {
        DealTrend::Weakened
    } else {
        DealTrend::Unchanged
    };

    Ok(WhatIfOutcome {
        new_discount_percentage,
        new_value_score,
        trust_score: product.trust_score,
        popularity_score: product.popularity_score,
        segment,
        trend,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::product;
    use crate::scoring::Bounds;

    fn scaling() -> ValueScaling {
        ValueScaling {
            discount: Bounds { min: 0.0, max: 100.0 },
            price: Bounds { min: 0.0, max: 1000.0 },
            discount_weight: 0.6,
        }
    }

    fn input(actual: f64, discounted: f64) -> WhatIfInput {
        WhatIfInput {
            new_actual_price: actual,
            new_discounted_price: discounted,
        }
    }

    #[test]
    fn half_price_is_fifty_percent_off() {
        let base = product("p1", 50.0, 60.0, 40.0);
        let outcome = simulate_deal(&base, &scaling(), &input(1000.0, 500.0)).unwrap();
        assert_eq!(outcome.new_discount_percentage, 50.0);
        assert_eq!(outcome.new_value_score, 50.0);
        assert_eq!(outcome.trend, DealTrend::Unchanged);
        assert_eq!(outcome.segment, SimulatedSegment::Balanced);
        assert_eq!(outcome.trust_score, 60.0);
    }

    #[test]
    fn deep_cut_on_trusted_product_is_best_deal() {
        let base = product("p1", 50.0, 75.0, 40.0);
        let outcome = simulate_deal(&base, &scaling(), &input(1000.0, 10.0)).unwrap();
        assert!(outcome.new_value_score >= 80.0);
        assert_eq!(outcome.segment, SimulatedSegment::BestDeals);
        assert_eq!(outcome.trend, DealTrend::Improved);
    }

    #[test]
    fn untrusted_deep_discount_is_a_trap() {
        let base = product("p1", 50.0, 30.0, 40.0);
        let outcome = simulate_deal(&base, &scaling(), &input(1000.0, 300.0)).unwrap();
        assert_eq!(outcome.segment, SimulatedSegment::DiscountTrap);
    }

    #[test]
    fn price_rise_on_trusted_product_is_premium() {
        // Stored discounted price is 500; 700 is more than 20% above it.
        let base = product("p1", 50.0, 72.0, 40.0);
        let outcome = simulate_deal(&base, &scaling(), &input(800.0, 700.0)).unwrap();
        assert_eq!(outcome.segment, SimulatedSegment::PremiumPicks);
        assert_eq!(outcome.trend, DealTrend::Weakened);
    }

    #[test]
    fn discounted_above_actual_clamps_to_zero() {
        let base = product("p1", 50.0, 50.0, 40.0);
        let outcome = simulate_deal(&base, &scaling(), &input(100.0, 150.0)).unwrap();
        assert_eq!(outcome.new_discount_percentage, 0.0);
    }

    #[test]
    fn rejects_prices_below_minimum() {
        let base = product("p1", 50.0, 50.0, 40.0);
        for (actual, discounted) in [(0.0, 500.0), (1000.0, 0.5), (f64::NAN, 10.0)] {
            let err = simulate_deal(&base, &scaling(), &input(actual, discounted)).unwrap_err();
            assert!(matches!(err, Error::InvalidSimulation(_)));
        }
    }
}

use serde::Serialize;

use crate::rules::{first_match, Cascade};
use crate::Product;

/// Human-facing deal badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Badge {
    #[serde(rename = "Hot Deal")]
    HotDeal,
    #[serde(rename = "Discount Trap")]
    DiscountTrap,
    #[serde(rename = "Hidden Gem")]
    HiddenGem,
    #[serde(rename = "Top Rated")]
    TopRated,
    #[serde(rename = "Best Value")]
    BestValue,
}

impl Badge {
    pub fn label(self) -> &'static str {
        match self {
            Badge::HotDeal => "Hot Deal",
            Badge::DiscountTrap => "Discount Trap",
            Badge::HiddenGem => "Hidden Gem",
            Badge::TopRated => "Top Rated",
            Badge::BestValue => "Best Value",
        }
    }
}

/// The inputs the badge rules look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BadgeSignals {
    pub value_score: f64,
    pub trust_score: f64,
    pub popularity_score: f64,
    pub discount_percentage: f64,
}

impl From<&Product> for BadgeSignals {
    fn from(product: &Product) -> Self {
        Self {
            value_score: product.value_score,
            trust_score: product.trust_score,
            popularity_score: product.popularity_score,
            discount_percentage: product.discount_percentage,
        }
    }
}

// Order matters: earlier rules shadow later ones.
const BADGE_RULES: &Cascade<BadgeSignals, Badge> = &[
    (|s| s.value_score >= 80.0 && s.trust_score >= 70.0, Badge::HotDeal),
    (|s| s.discount_percentage >= 60.0 && s.trust_score < 40.0, Badge::DiscountTrap),
    (|s| s.trust_score >= 80.0 && s.popularity_score < 25.0, Badge::HiddenGem),
    (|s| s.trust_score >= 85.0, Badge::TopRated),
    (|s| s.discount_percentage >= 50.0, Badge::BestValue),
];

pub fn badge_for(signals: &BadgeSignals) -> Option<Badge> {
    first_match(BADGE_RULES, signals)
}

pub fn assign_badge(product: &Product) -> Option<Badge> {
    badge_for(&BadgeSignals::from(product))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(value: f64, trust: f64, popularity: f64, discount: f64) -> BadgeSignals {
        BadgeSignals {
            value_score: value,
            trust_score: trust,
            popularity_score: popularity,
            discount_percentage: discount,
        }
    }

    #[test]
    fn hot_deal_takes_priority() {
        for (popularity, discount) in [(0.0, 0.0), (10.0, 95.0), (99.0, 55.0)] {
            assert_eq!(
                badge_for(&signals(85.0, 75.0, popularity, discount)),
                Some(Badge::HotDeal)
            );
        }
        // Would also qualify as Hidden Gem and Top Rated.
        assert_eq!(badge_for(&signals(90.0, 95.0, 5.0, 70.0)), Some(Badge::HotDeal));
    }

    #[test]
    fn cascade_falls_through_in_order() {
        assert_eq!(badge_for(&signals(10.0, 30.0, 50.0, 65.0)), Some(Badge::DiscountTrap));
        assert_eq!(badge_for(&signals(10.0, 82.0, 10.0, 65.0)), Some(Badge::HiddenGem));
        assert_eq!(badge_for(&signals(10.0, 90.0, 60.0, 10.0)), Some(Badge::TopRated));
        assert_eq!(badge_for(&signals(10.0, 50.0, 60.0, 50.0)), Some(Badge::BestValue));
        assert_eq!(badge_for(&signals(10.0, 50.0, 60.0, 10.0)), None);
    }

    #[test]
    fn thresholds_are_inclusive() {
        assert_eq!(badge_for(&signals(80.0, 70.0, 0.0, 0.0)), Some(Badge::HotDeal));
        assert_eq!(badge_for(&signals(79.9, 70.0, 50.0, 0.0)), None);
        assert_eq!(badge_for(&signals(0.0, 40.0, 50.0, 60.0)), Some(Badge::BestValue));
    }
}

//! Stateless decision functions over an enriched catalog. Nothing here mutates
//! a stored score.

pub mod badge;
pub mod compare;
pub mod explore;
pub mod recommend;
pub mod whatif;

pub use badge::{assign_badge, Badge};
pub use compare::{compare, Comparison, ComparisonOutcome, Side};
pub use explore::{explore, find_product, ProductDetail, ProductFilter};
pub use recommend::{
    recommend, Preference, RankingConfig, RankingWeights, RecommendQuery, Recommendation,
};
pub use whatif::{simulate_deal, DealTrend, SimulatedSegment, WhatIfInput, WhatIfOutcome};

/// An ordered rule list: the outcome of the first predicate that holds wins.
pub type Cascade<T, O> = [(fn(&T) -> bool, O)];

pub fn first_match<T, O: Copy>(rules: &Cascade<T, O>, input: &T) -> Option<O> {
    rules
        .iter()
        .find(|(predicate, _)| predicate(input))
        .map(|(_, outcome)| *outcome)
}

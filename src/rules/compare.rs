use serde::Serialize;

use crate::rules::RankingWeights;
use crate::Product;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    A,
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ComparisonOutcome {
    Winner { side: Side },
    /// Equal overall scores. `trust_leader` hints at the side with the higher
    /// trust score but the tie is left unresolved.
    Tie { trust_leader: Option<Side> },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Comparison {
    pub score_a: f64,
    pub score_b: f64,
    #[serde(flatten)]
    pub outcome: ComparisonOutcome,
}

/// Head-to-head on the overall intelligence score (`weights` should be the
/// "Best overall" blend).
pub fn compare(a: &Product, b: &Product, weights: &RankingWeights) -> Comparison {
    let score_a = weights.combine(&a.scores());
    let score_b = weights.combine(&b.scores());

    let outcome = if score_a > score_b {
        ComparisonOutcome::Winner { side: Side::A }
    } else if score_b > score_a {
        ComparisonOutcome::Winner { side: Side::B }
    } else {
        let trust_leader = if a.trust_score > b.trust_score {
            Some(Side::A)
        } else if b.trust_score > a.trust_score {
            Some(Side::B)
        } else {
            None
        };
        ComparisonOutcome::Tie { trust_leader }
    };

    Comparison {
        score_a,
        score_b,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::product;

    fn overall() -> RankingWeights {
        RankingWeights {
            trust: 0.45,
            value: 0.35,
            popularity: 0.20,
        }
    }

    #[test]
    fn higher_overall_score_wins() {
        let a = product("a", 60.0, 90.0, 40.0);
        let b = product("b", 60.0, 50.0, 40.0);
        let result = compare(&a, &b, &overall());
        assert!(result.score_a > result.score_b);
        assert_eq!(result.outcome, ComparisonOutcome::Winner { side: Side::A });

        let swapped = compare(&b, &a, &overall());
        assert_eq!(swapped.outcome, ComparisonOutcome::Winner { side: Side::B });
    }

    #[test]
    fn equal_scores_tie_with_trust_hint() {
        let a = product("a", 50.0, 50.0, 50.0);
        let b = product("b", 50.0, 50.0, 50.0);
        let result = compare(&a, &b, &overall());
        assert_eq!(result.outcome, ComparisonOutcome::Tie { trust_leader: None });

        let even = RankingWeights {
            trust: 0.5,
            value: 0.5,
            popularity: 0.0,
        };
        let a = product("a", 40.0, 60.0, 0.0);
        let b = product("b", 60.0, 40.0, 0.0);
        let result = compare(&a, &b, &even);
        assert_eq!(result.score_a, result.score_b);
        assert_eq!(
            result.outcome,
            ComparisonOutcome::Tie {
                trust_leader: Some(Side::A)
            }
        );
    }

    #[test]
    fn outcome_serializes_flat() {
        let a = product("a", 90.0, 90.0, 90.0);
        let b = product("b", 10.0, 10.0, 10.0);
        let json = serde_json::to_value(compare(&a, &b, &overall())).unwrap();
        assert_eq!(json["outcome"], "winner");
        assert_eq!(json["side"], "a");
    }
}

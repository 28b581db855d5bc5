use serde::Serialize;
use std::cmp::Ordering;

use crate::{mean, Product};

const POSITIVE_THRESHOLD: f64 = 0.35;
const NEGATIVE_THRESHOLD: f64 = -0.20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= POSITIVE_THRESHOLD {
            SentimentLabel::Positive
        } else if score <= NEGATIVE_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Neutral => "Neutral",
            SentimentLabel::Negative => "Negative",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewReport<'a> {
    pub avg_sentiment: f64,
    pub risk_count: usize,
    /// Share of risk-flagged products, 0..100.
    pub risk_percentage: f64,
    /// Risk-flagged products, most negative sentiment first, then least trusted.
    pub riskiest: Vec<&'a Product>,
}

pub fn review_report(products: &[Product], limit: usize) -> ReviewReport<'_> {
    let sentiments: Vec<f64> = products.iter().map(|p| p.sentiment_score).collect();
    let mut riskiest: Vec<&Product> = products.iter().filter(|p| p.is_risky()).collect();
    let risk_count = riskiest.len();

    riskiest.sort_by(|a, b| {
        a.sentiment_score
            .partial_cmp(&b.sentiment_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                a.trust_score
                    .partial_cmp(&b.trust_score)
                    .unwrap_or(Ordering::Equal)
            })
    });
    riskiest.truncate(limit);

    let risk_percentage = if products.is_empty() {
        0.0
    } else {
        risk_count as f64 / products.len() as f64 * 100.0
    };

    ReviewReport {
        avg_sentiment: mean(&sentiments),
        risk_count,
        risk_percentage,
        riskiest,
    }
}

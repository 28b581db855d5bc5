use crate::scoring::{
    normalize, FeatureConfig, FittedStats, NormalizeReport, Segmenter, TextSignalExtractor,
};
use crate::{mean, NormalizedProduct, Product, RawProduct, Result, ScoreTriple};

/// Output of one full pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub products: Vec<Product>,
    /// `None` when no row survived normalization.
    pub stats: Option<FittedStats>,
    pub report: NormalizeReport,
}

/// Raw rows → normalized → derived features → segments → text signals.
#[derive(Debug, Clone)]
pub struct ScoringPipeline {
    features: FeatureConfig,
    segmenter: Segmenter,
    text: TextSignalExtractor,
}

impl ScoringPipeline {
    pub fn new(features: FeatureConfig, segmenter: Segmenter, text: TextSignalExtractor) -> Self {
        Self {
            features,
            segmenter,
            text,
        }
    }

    pub fn run(&self, rows: Vec<RawProduct>) -> Result<PipelineOutput> {
        let (records, report) = normalize(rows);
        let Some(stats) = FittedStats::fit(&records, &self.features, &self.segmenter)? else {
            tracing::warn!("no rows survived normalization, producing an empty catalog");
            return Ok(PipelineOutput {
                products: Vec::new(),
                stats: None,
                report,
            });
        };

        let products = records
            .into_iter()
            .map(|record| self.enrich(record, &stats))
            .collect::<Result<Vec<_>>>()?;

        let risky = products.iter().filter(|product| product.is_risky()).count();
        let sentiments: Vec<f64> = products.iter().map(|p| p.sentiment_score).collect();
        tracing::info!(
            products = products.len(),
            risk_flagged = risky,
            avg_sentiment = mean(&sentiments),
            "scored catalog"
        );

        Ok(PipelineOutput {
            products,
            stats: Some(stats),
            report,
        })
    }

    fn enrich(&self, record: NormalizedProduct, stats: &FittedStats) -> Result<Product> {
        let derived = stats.scaling.derive(&record)?;
        let (segment, segment_name) = stats.segments.assign(&ScoreTriple {
            value: derived.value_score,
            trust: derived.trust_score,
            popularity: derived.popularity_score,
        });
        let text = self.text.extract(record.review_content.as_deref());

        Ok(Product {
            product_id: record.product_id,
            product_name: record.product_name,
            category: record.category,
            discounted_price: record.discounted_price,
            actual_price: record.actual_price,
            discount_percentage: record.discount_percentage,
            rating: record.rating,
            rating_count: record.rating_count,
            review_title: record.review_title,
            review_content: record.review_content,
            discount_amount: derived.discount_amount,
            discount_ratio: derived.discount_ratio,
            price_bucket: derived.price_bucket,
            main_category: derived.main_category,
            popularity_score: derived.popularity_score,
            weighted_rating: derived.weighted_rating,
            trust_score: derived.trust_score,
            value_score: derived.value_score,
            segment,
            segment_name,
            sentiment_score: text.sentiment_score,
            risk_flag: text.risk_flag,
        })
    }
}

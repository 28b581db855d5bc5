use serde::{Deserialize, Serialize};

use crate::scoring::{FeatureConfig, ScoreScaling, SegmentModel, Segmenter};
use crate::{NormalizedProduct, Result, ScoreTriple};

/// Everything fitted once over the whole catalog: scaling bounds, shrinkage
/// constants and the segment model. Scoring and decision functions take it by
/// reference; nothing is refitted per record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedStats {
    pub scaling: ScoreScaling,
    pub segments: SegmentModel,
}

impl FittedStats {
    /// Returns `None` for an empty catalog.
    pub fn fit(
        records: &[NormalizedProduct],
        features: &FeatureConfig,
        segmenter: &Segmenter,
    ) -> Result<Option<Self>> {
        let Some(scaling) = ScoreScaling::fit(records, features)? else {
            return Ok(None);
        };

        let scores = records
            .iter()
            .map(|record| {
                let derived = scaling.derive(record)?;
                Ok(ScoreTriple {
                    value: derived.value_score,
                    trust: derived.trust_score,
                    popularity: derived.popularity_score,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let segments = segmenter.fit(&scores)?;

        Ok(Some(Self { scaling, segments }))
    }
}

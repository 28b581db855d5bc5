pub mod features;
pub mod fit;
pub mod normalize;
pub mod pipeline;
pub mod segment;
pub mod text;

pub use features::{
    Bounds, DerivedFeatures, FeatureConfig, PriceBuckets, ScoreScaling, Shrinkage, ValueScaling,
};
pub use fit::FittedStats;
pub use normalize::{normalize, NormalizeReport};
pub use pipeline::{PipelineOutput, ScoringPipeline};
pub use segment::{KMeans, SegmentLabeling, SegmentModel, SegmentationConfig, Segmenter};
pub use text::{Lexicon, RiskDetector, SentimentScorer, TextConfig, TextSignalExtractor, TextSignals};

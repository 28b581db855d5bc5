use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::rules::RankingConfig;
use crate::scoring::{
    FeatureConfig, ScoringPipeline, SegmentLabeling, SegmentationConfig, Segmenter, TextConfig,
    TextSignalExtractor,
};
use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raw marketplace export.
    pub input: PathBuf,
    /// Enriched catalog written by `run` and read by every view.
    pub output: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/amazon.csv"),
            output: PathBuf::from("data/amazon_enriched.csv"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub features: FeatureConfig,
    pub segmentation: SegmentationConfig,
    pub text: TextConfig,
    pub ranking: RankingConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn load(path: Option<PathBuf>) -> Result<(Self, Option<PathBuf>)> {
        let config_path = path.or_else(default_config_path);
        let mut config = match config_path.as_ref() {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(path)
                    .map_err(|err| Error::Config(format!("failed to read config: {}", err)))?;
                toml::from_str(&contents)
                    .map_err(|err| Error::Config(format!("failed to parse config: {}", err)))?
            }
            _ => AppConfig::default(),
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok((config, config_path))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|err| Error::Config(format!("failed to create config dir: {}", err)))?;
        }
        let payload = toml::to_string_pretty(self)
            .map_err(|err| Error::Config(format!("failed to serialize config: {}", err)))?;
        std::fs::write(path, payload)
            .map_err(|err| Error::Config(format!("failed to write config: {}", err)))?;
        Ok(())
    }

    /// Assembles the scoring pipeline. Loads the sentiment lexicon, so a bad
    /// `[text].lexicon_path` surfaces here.
    pub fn build_pipeline(&self) -> Result<ScoringPipeline> {
        Ok(ScoringPipeline::new(
            self.features.clone(),
            Segmenter::new(self.segmentation.clone()),
            TextSignalExtractor::from_config(&self.text)?,
        ))
    }

    fn validate(&self) -> Result<()> {
        let features = &self.features;
        if !(0.0..=1.0).contains(&features.shrinkage_quantile) {
            return Err(Error::Config(format!(
                "features.shrinkage_quantile must be within [0, 1], got {}",
                features.shrinkage_quantile
            )));
        }
        if !(0.0..=1.0).contains(&features.discount_weight) {
            return Err(Error::Config(format!(
                "features.discount_weight must be within [0, 1], got {}",
                features.discount_weight
            )));
        }
        if self.segmentation.n_init == 0 || self.segmentation.max_iter == 0 {
            return Err(Error::Config(
                "segmentation.n_init and segmentation.max_iter must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(input) = env::var("CATALOG_INPUT") {
            if !input.trim().is_empty() {
                self.pipeline.input = PathBuf::from(input);
            }
        }
        if let Ok(output) = env::var("CATALOG_OUTPUT") {
            if !output.trim().is_empty() {
                self.pipeline.output = PathBuf::from(output);
            }
        }
        if let Ok(seed) = env::var("CATALOG_SEED") {
            if let Ok(value) = seed.trim().parse::<u64>() {
                self.segmentation.seed = value;
            }
        }
        if let Ok(labeling) = env::var("CATALOG_LABELING") {
            if !labeling.trim().is_empty() {
                self.segmentation.labeling = SegmentLabeling::from_label(&labeling)
                    .ok_or_else(|| {
                        Error::Config(format!("unknown segment labeling: {}", labeling))
                    })?;
            }
        }
        if let Ok(host) = env::var("CATALOG_HOST") {
            if !host.trim().is_empty() {
                self.server.host = host;
            }
        }
        if let Ok(port) = env::var("CATALOG_PORT") {
            if let Ok(value) = port.trim().parse::<u16>() {
                self.server.port = value;
            }
        }
        if let Ok(level) = env::var("CATALOG_LOG_LEVEL") {
            if !level.trim().is_empty() {
                self.logging.level = level;
            }
        }
        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("CATALOG_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    Some(PathBuf::from("config/catalog.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [segmentation]
            seed = 7
            labeling = "ranked"

            [server]
            port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(config.segmentation.seed, 7);
        assert_eq!(config.segmentation.labeling, SegmentLabeling::Ranked);
        assert_eq!(config.segmentation.n_init, 10);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.text.risk_keywords.len(), 12);
    }

    #[test]
    fn written_config_reads_back() {
        let path = std::env::temp_dir()
            .join(format!("catalog-intel-config-{}", std::process::id()))
            .join("catalog.toml");
        let mut config = AppConfig::default();
        config.ranking.most_trusted.trust = 0.8;
        config.write(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let restored: AppConfig = toml::from_str(&contents).unwrap();
        assert_eq!(restored.ranking.most_trusted.trust, 0.8);
        assert_eq!(restored.pipeline.output, config.pipeline.output);
    }

    #[test]
    fn out_of_range_weight_is_rejected() {
        let mut config = AppConfig::default();
        config.features.discount_weight = 1.5;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}

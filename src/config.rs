use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub lang_code: String,
    /// Model identifier, used to derive the bundled config file name.
    pub repo_id: String,
    pub config_dir: PathBuf,
    /// Explicit config file; overrides the `config_dir`/`repo_id` convention.
    pub config_path: Option<PathBuf>,
    /// Pattern splitting raw text into top-level segments. `None` keeps the text whole.
    pub split_pattern: Option<String>,
}

impl PipelineConfig {
    pub const DEFAULT_REPO_ID: &'static str = "hexgrad/Kokoro-82M";
    pub const DEFAULT_SPLIT_PATTERN: &'static str = r"\n+";

    pub fn new(lang_code: impl Into<String>) -> Self {
        Self {
            lang_code: lang_code.into(),
            ..Self::default()
        }
    }

    /// `hexgrad/Kokoro-82M` resolves to `<config_dir>/hexgrad_Kokoro_82M_config.json`.
    pub fn resolved_config_path(&self) -> PathBuf {
        if let Some(path) = &self.config_path {
            return path.clone();
        }
        let file_name = format!("{}_config.json", self.repo_id.replace(['/', '-'], "_"));
        self.config_dir.join(file_name)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lang_code: "a".to_string(),
            repo_id: Self::DEFAULT_REPO_ID.to_string(),
            config_dir: PathBuf::from("configs"),
            config_path: None,
            split_pattern: Some(Self::DEFAULT_SPLIT_PATTERN.to_string()),
        }
    }
}

/// The subset of a Kokoro `config.json` this crate reads.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub vocab: Option<HashMap<String, u32>>,
    #[serde(default)]
    pub plbert: PlbertConfig,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct PlbertConfig {
    #[serde(default)]
    pub max_position_embeddings: Option<usize>,
}

impl ModelConfig {
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let data =
            std::fs::read_to_string(path).map_err(|e| PipelineError::io("read config.json", e))?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(data).map_err(|e| PipelineError::json("parse config.json", e))
    }

    pub fn context_length(&self) -> Option<usize> {
        self.plbert.max_position_embeddings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.lang_code, "a");
        assert_eq!(config.repo_id, PipelineConfig::DEFAULT_REPO_ID);
        assert_eq!(config.split_pattern.as_deref(), Some(r"\n+"));
        assert!(config.config_path.is_none());
    }

    #[test]
    fn config_path_follows_repo_id_convention() {
        let config = PipelineConfig {
            repo_id: "hexgrad/Kokoro-82M-v1.1-zh".to_string(),
            config_dir: PathBuf::from("bundled"),
            ..PipelineConfig::default()
        };
        assert_eq!(
            config.resolved_config_path(),
            PathBuf::from("bundled").join("hexgrad_Kokoro_82M_v1.1_zh_config.json")
        );
    }

    #[test]
    fn explicit_config_path_wins() {
        let config = PipelineConfig {
            config_path: Some(PathBuf::from("/tmp/custom.json")),
            ..PipelineConfig::new("b")
        };
        assert_eq!(config.lang_code, "b");
        assert_eq!(config.resolved_config_path(), PathBuf::from("/tmp/custom.json"));
    }

    #[test]
    fn model_config_reads_vocab_and_context_length() {
        let json = r#"{
            "istftnet": {"upsample_rates": [10, 6]},
            "n_token": 178,
            "plbert": {"hidden_size": 768, "max_position_embeddings": 512},
            "vocab": {";": 1, ":": 2, "a": 43}
        }"#;
        let config = ModelConfig::from_json(json).expect("valid config json");
        assert_eq!(config.context_length(), Some(512));
        assert_eq!(config.vocab.as_ref().map(HashMap::len), Some(3));
    }

    #[test]
    fn model_config_tolerates_missing_sections() {
        let config = ModelConfig::from_json("{}").expect("valid config json");
        assert!(config.vocab.is_none());
        assert!(config.context_length().is_none());
    }

    #[test]
    fn model_config_load_reports_missing_file() {
        let err = ModelConfig::load(Path::new("/nonexistent/kokoro_config.json")).unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }
}

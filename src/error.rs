use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON parse error while {context}: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("configuration error: {message}")]
    Config { message: String },
    #[error("unsupported language code '{code}'")]
    UnsupportedLanguage { code: String },
    #[error("{context}: {message}")]
    Runtime {
        context: &'static str,
        message: String,
    },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl PipelineError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub(crate) fn unsupported_language(code: impl Into<String>) -> Self {
        Self::UnsupportedLanguage { code: code.into() }
    }

    /// Wraps a failure reported by an external collaborator (G2P, synthesizer, voice store).
    pub fn runtime(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Runtime {
            context,
            message: err.to_string(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// True for errors that can only come out of pipeline construction.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::UnsupportedLanguage { .. } | Self::Io { .. } | Self::Json { .. }
        )
    }
}

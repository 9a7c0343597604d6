pub mod alignment;
pub mod chunking;
pub mod config;
pub mod error;
pub mod language;
pub mod pipeline;
pub mod types;
pub mod vocab;

pub use config::{ModelConfig, PipelineConfig};
pub use error::PipelineError;
pub use language::Language;
pub use pipeline::builder::PipelineBuilder;
pub use pipeline::runtime::{GenerateOptions, OutputMode, Pipeline, ResultStream, Speed, TextInput};
pub use pipeline::traits::{
    Synthesizer, TextPhonemizer, TimestampAligner, VoiceStore, WordPhonemizer,
};
pub use pipeline::voices::VoicePack;
pub use types::{Chunk, EncodedSequence, PipelineResult, ResultOutput, SynthesisOutput, Token};
pub use vocab::Vocabulary;

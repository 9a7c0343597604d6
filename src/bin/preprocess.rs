use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Parser;
use kokoro_prep::{
    GenerateOptions, Pipeline, PipelineBuilder, PipelineConfig, PipelineResult, Token,
};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[path = "preprocess/json_response_writer.rs"]
mod json_response_writer;

#[derive(Debug, Parser)]
#[command(name = "preprocess")]
#[command(about = "Chunk pre-phonemized text and encode it into Kokoro input ids")]
struct Args {
    /// Request JSON; read from stdin when omitted.
    #[arg(long, env = "KOKORO_PREP_INPUT")]
    input: Option<PathBuf>,
    /// Response JSON; written to stdout when omitted.
    #[arg(long, env = "KOKORO_PREP_OUT")]
    out: Option<PathBuf>,
    #[arg(long, env = "KOKORO_PREP_LANG_CODE", default_value = "a")]
    lang_code: String,
    #[arg(
        long,
        env = "KOKORO_PREP_CONFIG_KEY",
        default_value = PipelineConfig::DEFAULT_REPO_ID
    )]
    config_key: String,
    #[arg(long, env = "KOKORO_PREP_CONFIG_DIR", default_value = "configs")]
    config_dir: PathBuf,
    /// Explicit model config file, overriding the bundled-config lookup.
    #[arg(long, env = "KOKORO_PREP_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct PreprocessRequest {
    segments: Vec<RequestSegment>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RequestSegment {
    Tokens { tokens: Vec<Token> },
    Phonemes { phonemes: String },
}

#[derive(Debug, Serialize)]
struct ResultItem {
    graphemes: String,
    phonemes: String,
    text_index: Option<usize>,
    input_ids: Option<Vec<u32>>,
    truncated: bool,
}

#[derive(Debug, Serialize)]
struct PreprocessResponse {
    results: Vec<ResultItem>,
    lang_code_used: String,
    config_key_used: String,
    generated_at: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run() {
        tracing::error!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = Args::parse();

    let config = PipelineConfig {
        lang_code: args.lang_code.clone(),
        repo_id: args.config_key.clone(),
        config_dir: args.config_dir.clone(),
        config_path: args.config.clone(),
        split_pattern: None,
    };
    let pipeline = PipelineBuilder::new(config)
        .build()
        .map_err(|err| format!("Could not initialize pipeline for '{}': {err}", args.lang_code))?;

    let request = read_request(args.input.as_deref())?;
    let results = preprocess(&pipeline, request)?;
    tracing::info!(results = results.len(), "preprocessing complete");

    let response = PreprocessResponse {
        results,
        lang_code_used: args.lang_code,
        config_key_used: args.config_key,
        generated_at: Utc::now().to_rfc3339(),
    };
    json_response_writer::write_json(args.out.as_deref(), &response)
}

fn read_request(path: Option<&Path>) -> Result<PreprocessRequest, String> {
    let data = match path {
        Some(path) => fs::read_to_string(path)
            .map_err(|err| format!("Failed to read request '{}': {err}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|err| format!("Failed to read request from stdin: {err}"))?;
            buf
        }
    };
    serde_json::from_str(&data).map_err(|err| format!("Failed to parse request JSON: {err}"))
}

fn preprocess(pipeline: &Pipeline, request: PreprocessRequest) -> Result<Vec<ResultItem>, String> {
    let options = GenerateOptions::default();
    let mut items = Vec::new();
    for (index, segment) in request.segments.into_iter().enumerate() {
        match segment {
            RequestSegment::Tokens { tokens } => {
                let stream = pipeline
                    .generate_from_tokens(tokens, &options)
                    .map_err(|err| err.to_string())?;
                for result in stream {
                    match result {
                        Ok(result) => items.push(to_item(result, index)),
                        Err(err) => tracing::warn!(index, "skipping chunk: {err}"),
                    }
                }
            }
            RequestSegment::Phonemes { phonemes } => {
                match pipeline.generate_from_phonemes(&phonemes, &options) {
                    Ok(Some(result)) => items.push(to_item(result, index)),
                    Ok(None) => {}
                    Err(err) => tracing::warn!(index, "skipping segment: {err}"),
                }
            }
        }
    }
    Ok(items)
}

fn to_item(result: PipelineResult, index: usize) -> ResultItem {
    let truncated = matches!(
        &result.output,
        kokoro_prep::ResultOutput::Encoded(seq) if seq.is_truncated()
    );
    ResultItem {
        input_ids: result.input_ids().map(<[u32]>::to_vec),
        graphemes: result.graphemes,
        phonemes: result.phonemes,
        text_index: Some(index),
        truncated,
    }
}

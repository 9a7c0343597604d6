use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::PipelineError;
use crate::language::Language;
use crate::pipeline::traits::VoiceStore;

/// Style embeddings for one voice, one row per input phoneme length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VoicePack {
    pub rows: Vec<Vec<f32>>,
}

impl VoicePack {
    pub fn new(rows: Vec<Vec<f32>>) -> Self {
        Self { rows }
    }

    /// Style row for a phoneme string of `phoneme_len` chars, clamped to the last row.
    pub fn style_for(&self, phoneme_len: usize) -> Option<&[f32]> {
        if self.rows.is_empty() {
            return None;
        }
        let idx = phoneme_len.saturating_sub(1).min(self.rows.len() - 1);
        Some(&self.rows[idx])
    }

    /// Element-wise mean of equally shaped packs.
    pub fn mean(packs: &[Arc<VoicePack>]) -> Result<VoicePack, PipelineError> {
        let Some(first) = packs.first() else {
            return Err(PipelineError::invalid_input("cannot blend zero voices"));
        };
        let shape: Vec<usize> = first.rows.iter().map(Vec::len).collect();
        let mut rows: Vec<Vec<f32>> = shape.iter().map(|&w| vec![0.0; w]).collect();

        for pack in packs {
            if pack.rows.len() != shape.len()
                || pack.rows.iter().map(Vec::len).ne(shape.iter().copied())
            {
                return Err(PipelineError::invalid_input(
                    "voices being blended have different shapes",
                ));
            }
            for (acc, row) in rows.iter_mut().zip(&pack.rows) {
                for (a, v) in acc.iter_mut().zip(row) {
                    *a += v;
                }
            }
        }

        let n = packs.len() as f32;
        for row in &mut rows {
            for v in row.iter_mut() {
                *v /= n;
            }
        }
        Ok(VoicePack { rows })
    }
}

/// Per-pipeline cache of loaded and blended voices.
pub struct VoiceCache {
    store: Box<dyn VoiceStore>,
    language: Language,
    loaded: Mutex<HashMap<String, Arc<VoicePack>>>,
}

impl VoiceCache {
    pub const DELIMITER: char = ',';

    pub fn new(store: Box<dyn VoiceStore>, language: Language) -> Self {
        Self {
            store,
            language,
            loaded: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, name: &str) -> Option<Arc<VoicePack>> {
        let guard = self.loaded.lock().unwrap_or_else(|e| e.into_inner());
        guard.get(name).cloned()
    }

    fn remember(&self, name: &str, pack: Arc<VoicePack>) {
        let mut guard = self.loaded.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert(name.to_string(), pack);
    }

    fn load_single(&self, name: &str) -> Result<Arc<VoicePack>, PipelineError> {
        if let Some(pack) = self.cached(name) {
            return Ok(pack);
        }
        if !name.starts_with(self.language.code()) {
            tracing::warn!(
                voice = name,
                pipeline_language = self.language.name(),
                "language mismatch: loading a voice from another language"
            );
        }
        let pack = Arc::new(self.store.load(name)?);
        self.remember(name, Arc::clone(&pack));
        Ok(pack)
    }

    /// Resolves `name`, which may be a comma-separated list of voices to average.
    pub fn load(&self, name: &str) -> Result<Arc<VoicePack>, PipelineError> {
        if let Some(pack) = self.cached(name) {
            return Ok(pack);
        }
        tracing::debug!(voice = name, "loading voice");

        let parts: Vec<&str> = name
            .split(Self::DELIMITER)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            return Err(PipelineError::invalid_input(format!("empty voice name '{name}'")));
        }

        let packs = parts
            .iter()
            .map(|part| self.load_single(part))
            .collect::<Result<Vec<_>, _>>()?;
        let pack = if packs.len() == 1 {
            Arc::clone(&packs[0])
        } else {
            Arc::new(VoicePack::mean(&packs)?)
        };
        self.remember(name, Arc::clone(&pack));
        Ok(pack)
    }

    pub fn cached_count(&self) -> usize {
        self.loaded.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

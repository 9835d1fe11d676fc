//! Speech engine trait, voice parameters and the slice-by-slice renderer.

pub mod espeak;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Characters handed to the engine per synthesis call.
pub const SLICE_CHARS: usize = 200;

/// Parameters passed to the synthesis engine.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceParameters {
    /// Words per minute
    pub rate: u32,
    /// Multiplier around 1.0
    pub pitch: f32,
    /// Installed voice to use; None selects the engine default
    pub voice: Option<String>,
}

impl Default for VoiceParameters {
    fn default() -> Self {
        Self {
            rate: crate::config::DEFAULT_RATE,
            pitch: crate::config::DEFAULT_PITCH,
            voice: None,
        }
    }
}

impl VoiceParameters {
    /// Build voice parameters, rejecting non-positive rate or pitch.
    pub fn new(rate: u32, pitch: f32, voice: Option<String>) -> Result<Self> {
        if rate == 0 {
            anyhow::bail!("Speech rate must be positive");
        }
        if !(pitch.is_finite() && pitch > 0.0) {
            anyhow::bail!("Pitch must be a positive number, got {}", pitch);
        }
        let voice = voice.filter(|v| !v.trim().is_empty());
        Ok(Self { rate, pitch, voice })
    }
}

/// An installed voice as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    /// Identifier passed back to the engine
    pub id: String,
    /// Human readable name
    pub name: String,
    /// Gender if the engine reports one
    pub gender: Option<String>,
}

/// Speech engine handle - every synthesis backend implements this.
///
/// A handle is created at the start of a conversion request and dropped at
/// its end. Calls on one handle are made sequentially.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Engine name for diagnostics.
    fn name(&self) -> &str;

    /// Voices installed for this engine.
    async fn voices(&self) -> Result<Vec<VoiceInfo>>;

    /// Synthesize one slice of text into a segment file.
    async fn synthesize(
        &self,
        text: &str,
        segment_path: &Path,
        voice: &VoiceParameters,
    ) -> Result<()>;

    /// Join rendered segments, in order, into the final audio file.
    async fn assemble(&self, segments: &[PathBuf], output_path: &Path) -> Result<()>;

    /// File extension of the segments this engine writes.
    fn segment_extension(&self) -> &str {
        "wav"
    }
}

/// Create the default speech engine.
pub fn create_engine() -> Result<Box<dyn SpeechEngine>> {
    Ok(Box::new(espeak::EspeakEngine::new()?))
}

/// Split text into slices of at most `size` characters.
///
/// Purely length based; joining the slices gives back the input.
pub fn slice_text(text: &str, size: usize) -> Vec<&str> {
    let size = size.max(1);
    let mut slices = Vec::new();
    let mut slice_start = 0;

    for (count, (offset, _)) in text.char_indices().enumerate() {
        if count > 0 && count % size == 0 {
            slices.push(&text[slice_start..offset]);
            slice_start = offset;
        }
    }
    if slice_start < text.len() {
        slices.push(&text[slice_start..]);
    }

    slices
}

/// Render `text` into `output_path`, reporting progress after every slice.
///
/// `on_slice` receives (characters processed, total characters).
pub async fn render(
    engine: &dyn SpeechEngine,
    text: &str,
    output_path: &Path,
    voice: &VoiceParameters,
    on_slice: &mut (dyn FnMut(usize, usize) + Send),
) -> Result<()> {
    let total = text.chars().count();
    let slices = slice_text(text, SLICE_CHARS);

    let work_dir = tempfile::Builder::new()
        .prefix("pdf-audio-")
        .tempdir()
        .context("Failed to create segment directory")?;

    let mut segments = Vec::with_capacity(slices.len());
    let mut processed = 0;

    for (i, slice) in slices.iter().enumerate() {
        processed += slice.chars().count();

        // Engines may produce no audio at all for pure whitespace
        if slice.trim().is_empty() {
            log::debug!("Slice {}/{} is blank, not synthesized", i + 1, slices.len());
            on_slice(processed, total);
            continue;
        }

        let segment = work_dir
            .path()
            .join(format!("segment_{:05}.{}", i, engine.segment_extension()));

        engine
            .synthesize(slice, &segment, voice)
            .await
            .with_context(|| format!("{} failed on slice {}/{}", engine.name(), i + 1, slices.len()))?;

        segments.push(segment);
        on_slice(processed, total);
    }

    if segments.is_empty() {
        anyhow::bail!("Nothing to speak: the text is blank");
    }

    engine
        .assemble(&segments, output_path)
        .await
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    Ok(())
}

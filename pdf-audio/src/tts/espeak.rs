//! espeak-ng backend, driven as a subprocess.
//!
//! Each slice is spoken into a WAV segment with `espeak-ng -w`, and the
//! segments are encoded into the final MP3 with FFmpeg.

use super::{SpeechEngine, VoiceInfo, VoiceParameters};
use crate::audio;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::OnceCell;

/// Programs tried, in order, when PDF_AUDIO_ESPEAK is not set.
const CANDIDATES: &[&str] = &["espeak-ng", "espeak"];

/// espeak pitch at a multiplier of 1.0 (espeak range is 0-99).
const BASE_PITCH: f32 = 50.0;

/// espeak-ng speech engine.
pub struct EspeakEngine {
    /// Program to execute
    program: OsString,
    /// Installed voices, listed on first use
    voices: OnceCell<Vec<VoiceInfo>>,
    /// Set once an unknown voice has been reported
    warned_voice: AtomicBool,
}

impl EspeakEngine {
    /// Locate espeak-ng and FFmpeg.
    pub fn new() -> Result<Self> {
        let program = Self::find_program()?;
        audio::check_ffmpeg()?;

        log::debug!("Using speech engine {:?}", program);
        Ok(Self {
            program,
            voices: OnceCell::new(),
            warned_voice: AtomicBool::new(false),
        })
    }

    fn find_program() -> Result<OsString> {
        if let Some(program) = std::env::var_os("PDF_AUDIO_ESPEAK") {
            return Ok(program);
        }

        for candidate in CANDIDATES {
            let probe = std::process::Command::new(candidate)
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
            if matches!(probe, Ok(status) if status.success()) {
                return Ok(OsString::from(candidate));
            }
        }

        anyhow::bail!("espeak-ng not found. Install espeak-ng or set PDF_AUDIO_ESPEAK")
    }

    async fn list_voices(&self) -> Result<Vec<VoiceInfo>> {
        let output = Command::new(&self.program)
            .arg("--voices")
            .output()
            .await
            .context("Failed to run espeak --voices")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("espeak --voices failed: {}", stderr.trim());
        }

        Ok(parse_voices(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Map the requested voice onto an installed one; unknown voices fall
    /// back to the engine default.
    async fn resolve_voice(&self, requested: Option<&str>) -> Option<String> {
        let requested = requested?;
        let voices = match self.voices().await {
            Ok(voices) => voices,
            Err(e) => {
                log::debug!("Could not list voices, passing {} through: {:#}", requested, e);
                return Some(requested.to_string());
            }
        };

        let found = voices.iter().find(|v| {
            v.id.eq_ignore_ascii_case(requested) || v.name.eq_ignore_ascii_case(requested)
        });

        match found {
            Some(voice) => Some(voice.id.clone()),
            None => {
                if !self.warned_voice.swap(true, Ordering::Relaxed) {
                    log::warn!("Voice {:?} is not installed, using the default voice", requested);
                }
                None
            }
        }
    }
}

/// Convert a pitch multiplier to espeak's 0-99 scale.
fn espeak_pitch(pitch: f32) -> u32 {
    (pitch * BASE_PITCH).round().clamp(0.0, 99.0) as u32
}

/// Parse the table printed by `espeak-ng --voices`.
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  en-us           --/M      English_(America)  gmw/en-US            (en 2)(en-r 3)
/// ```
fn parse_voices(listing: &str) -> Vec<VoiceInfo> {
    listing
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                return None;
            }

            let gender = match fields[2].rsplit('/').next() {
                Some("M") => Some("Male".to_string()),
                Some("F") => Some("Female".to_string()),
                _ => None,
            };

            Some(VoiceInfo {
                id: fields[1].to_string(),
                name: fields[3].replace('_', " "),
                gender,
            })
        })
        .collect()
}

#[async_trait]
impl SpeechEngine for EspeakEngine {
    fn name(&self) -> &str {
        "espeak-ng"
    }

    async fn voices(&self) -> Result<Vec<VoiceInfo>> {
        let voices = self
            .voices
            .get_or_try_init(|| self.list_voices())
            .await?;
        Ok(voices.clone())
    }

    async fn synthesize(
        &self,
        text: &str,
        segment_path: &Path,
        voice: &VoiceParameters,
    ) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-s")
            .arg(voice.rate.to_string())
            .arg("-p")
            .arg(espeak_pitch(voice.pitch).to_string());

        if let Some(id) = self.resolve_voice(voice.voice.as_deref()).await {
            cmd.arg("-v").arg(id);
        }

        // Text goes through stdin so a leading '-' is never read as a flag
        let mut child = cmd
            .arg("-w")
            .arg(segment_path)
            .arg("--stdin")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to start espeak")?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("espeak exited with {}: {}", output.status, stderr.trim());
        }

        Ok(())
    }

    async fn assemble(&self, segments: &[PathBuf], output_path: &Path) -> Result<()> {
        let segments = segments.to_vec();
        let output_path = output_path.to_path_buf();

        // FFmpeg runs synchronously, keep it off the async workers
        tokio::task::spawn_blocking(move || audio::encode_mp3(&segments, &output_path))
            .await
            .context("Task join error")??;

        Ok(())
    }
}

//! MP3 encoding of rendered segments using FFmpeg.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Get the FFmpeg command, honoring PDF_AUDIO_FFMPEG if set.
fn ffmpeg_command() -> Command {
    match std::env::var_os("PDF_AUDIO_FFMPEG") {
        Some(path) => Command::new(path),
        None => Command::new("ffmpeg"),
    }
}

/// Check that FFmpeg can be executed.
pub fn check_ffmpeg() -> Result<()> {
    let output = ffmpeg_command()
        .arg("-version")
        .output()
        .context("FFmpeg not found. Install ffmpeg or set PDF_AUDIO_FFMPEG")?;

    if !output.status.success() {
        anyhow::bail!("ffmpeg -version exited with {}", output.status);
    }
    Ok(())
}

/// Build the concat demuxer list for `segments`.
fn concat_list(segments: &[PathBuf]) -> String {
    let mut list = String::new();
    for path in segments {
        // Escape single quotes in path
        let path_str = path.to_string_lossy().replace('\'', "'\\''");
        list.push_str(&format!("file '{}'\n", path_str));
    }
    list
}

/// Concatenate audio segments in order and encode them as one MP3 file.
///
/// The output file is overwritten if it exists.
pub fn encode_mp3(segments: &[PathBuf], output_path: &Path) -> Result<()> {
    if segments.is_empty() {
        anyhow::bail!("No audio segments provided");
    }

    let mut cmd = ffmpeg_command();
    cmd.args(["-y", "-loglevel", "error"]);

    // Holds the concat list until ffmpeg exits
    let list_dir = TempDir::new()?;
    if segments.len() == 1 {
        cmd.arg("-i").arg(&segments[0]);
    } else {
        let list_file = list_dir.path().join("concat_list.txt");
        std::fs::write(&list_file, concat_list(segments))?;
        cmd.args(["-f", "concat", "-safe", "0", "-i"]).arg(&list_file);
    }

    let output = cmd
        .args(["-codec:a", "libmp3lame", "-q:a", "4"])
        .arg(output_path)
        .output()
        .context("Failed to run ffmpeg")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("ffmpeg encoding failed: {}", stderr.trim());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_list_escapes_quotes() {
        let segments = vec![
            PathBuf::from("/tmp/a/segment_00000.wav"),
            PathBuf::from("/tmp/it's/segment_00001.wav"),
        ];
        assert_eq!(
            concat_list(&segments),
            "file '/tmp/a/segment_00000.wav'\nfile '/tmp/it'\\''s/segment_00001.wav'\n"
        );
    }

    #[test]
    fn test_encode_requires_segments() {
        let err = encode_mp3(&[], Path::new("/tmp/out.mp3")).unwrap_err();
        assert!(err.to_string().contains("No audio segments"));
    }
}

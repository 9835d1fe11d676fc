//! Opening produced files with the host's default application.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};

/// Opens a file with whatever the host associates with its type.
pub trait FileOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<()>;
}

/// Uses `open` on macOS, `cmd /C start` on Windows and `xdg-open` elsewhere.
pub struct SystemOpener;

impl SystemOpener {
    fn command(path: &Path) -> Command {
        if cfg!(target_os = "macos") {
            let mut cmd = Command::new("open");
            cmd.arg(path);
            cmd
        } else if cfg!(target_os = "windows") {
            let mut cmd = Command::new("cmd");
            // The empty argument is the window title expected by `start`
            cmd.args(["/C", "start", ""]).arg(path);
            cmd
        } else {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(path);
            cmd
        }
    }
}

impl FileOpener for SystemOpener {
    fn open(&self, path: &Path) -> Result<()> {
        let mut cmd = Self::command(path);
        let program = cmd.get_program().to_string_lossy().into_owned();

        let status = cmd
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("Failed to run {}", program))?;

        if !status.success() {
            anyhow::bail!("{} exited with {}", program, status);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_passes_path_last() {
        let cmd = SystemOpener::command(Path::new("/tmp/book_chapter_1.mp3"));
        let last = cmd.get_args().last().unwrap();
        assert_eq!(last, "/tmp/book_chapter_1.mp3");
    }
}

//! Conversion request, per-chapter results and progress events.

use crate::chapters::ChapterRange;
use crate::config::Preferences;
use crate::error::ConvertError;
use crate::tts::VoiceParameters;
use std::path::{Path, PathBuf};

/// Output name used when none is given.
pub const DEFAULT_OUTPUT_NAME: &str = "audiobook";

/// Everything needed to convert one document.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// PDF to read
    pub document: PathBuf,
    /// First page (1-based, inclusive)
    pub start_page: usize,
    /// Last page (1-based, inclusive); None means the last page of the document
    pub end_page: Option<usize>,
    /// Pages per chapter; None renders the whole range into one file
    pub chapter_size: Option<usize>,
    /// Speech settings
    pub voice: VoiceParameters,
    /// File name stem of the produced audio
    pub output_name: String,
    /// Directory receiving the audio files
    pub output_dir: PathBuf,
    /// Open each produced file once conversion is done
    pub open_after_save: bool,
}

impl ConversionRequest {
    /// Request for the whole document with default settings.
    pub fn new(document: impl Into<PathBuf>) -> Self {
        Self {
            document: document.into(),
            start_page: 1,
            end_page: None,
            chapter_size: None,
            voice: VoiceParameters::default(),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            output_dir: PathBuf::from("."),
            open_after_save: false,
        }
    }

    /// Checks that need no knowledge of the document.
    pub fn check(&self) -> Result<(), ConvertError> {
        if self.start_page == 0 || self.end_page.is_some_and(|end| self.start_page > end) {
            return Err(ConvertError::InvalidPageRange {
                start: self.start_page,
                end: self.end_page.unwrap_or(0),
                total: None,
            });
        }
        if self.chapter_size == Some(0) {
            return Err(ConvertError::InvalidChapterSize);
        }
        Ok(())
    }

    /// Resolve the last page against the document's page count.
    pub fn resolve_end(&self, page_count: usize) -> Result<usize, ConvertError> {
        let end = self.end_page.unwrap_or(page_count);
        if self.start_page == 0 || self.start_page > end || end > page_count {
            return Err(ConvertError::InvalidPageRange {
                start: self.start_page,
                end,
                total: Some(page_count),
            });
        }
        Ok(end)
    }

    pub fn is_chaptered(&self) -> bool {
        self.chapter_size.is_some()
    }

    /// `{name}.mp3`, or `{name}_chapter_{index}.mp3` when chaptering.
    pub fn output_path(&self, chapter: &ChapterRange) -> PathBuf {
        let file_name = if self.is_chaptered() {
            format!("{}_chapter_{}.mp3", self.output_name, chapter.index)
        } else {
            format!("{}.mp3", self.output_name)
        };
        self.output_dir.join(file_name)
    }

    /// The settings worth remembering for the next run.
    pub fn preferences(&self) -> Preferences {
        Preferences {
            rate: self.voice.rate,
            pitch: self.voice.pitch,
            voice: self.voice.voice.clone(),
            pages_per_chapter: self.chapter_size,
            open_after_save: self.open_after_save,
        }
    }
}

/// Normalize a user supplied output name: trims it, drops a trailing `.mp3`
/// and falls back to the default when nothing is left.
pub fn output_base_name(name: &str) -> String {
    let name = name.trim();
    let name = name
        .strip_suffix(".mp3")
        .or_else(|| name.strip_suffix(".MP3"))
        .unwrap_or(name)
        .trim();

    if name.is_empty() {
        DEFAULT_OUTPUT_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// What happened to one chapter.
#[derive(Debug, Clone, PartialEq)]
pub enum ChapterStatus {
    /// Audio written
    Succeeded,
    /// The pages held no text; nothing written
    Skipped,
    /// Rendering failed with the given detail
    Failed(String),
}

/// Outcome of one chapter (or of the whole range when not chaptering).
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub chapter: ChapterRange,
    pub output_path: PathBuf,
    pub status: ChapterStatus,
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        self.status == ChapterStatus::Succeeded
    }
}

/// All chapter outcomes of a request, plus non-fatal warnings.
#[derive(Debug, Clone, Default)]
pub struct ConversionReport {
    pub results: Vec<ConversionResult>,
    pub warnings: Vec<String>,
}

impl ConversionReport {
    fn count(&self, pred: impl Fn(&ChapterStatus) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.status)).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|s| *s == ChapterStatus::Succeeded)
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| *s == ChapterStatus::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, ChapterStatus::Failed(_)))
    }

    /// Paths of every file that was written.
    pub fn produced_files(&self) -> Vec<&Path> {
        self.results
            .iter()
            .filter(|r| r.is_success())
            .map(|r| r.output_path.as_path())
            .collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "Succeeded: {}, Skipped: {}, Failed: {}",
            self.succeeded(),
            self.skipped(),
            self.failed()
        )
    }
}

/// Progress notifications emitted while a request runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// The chapter plan is known
    Planned { chapters: usize },
    /// Text extraction for a chapter begins
    ChapterStarted {
        index: usize,
        start_page: usize,
        end_page: usize,
    },
    /// A slice of a chapter has been synthesized
    SliceRendered {
        index: usize,
        /// Characters of this chapter done so far
        processed: usize,
        /// Characters in this chapter
        total: usize,
        /// Characters done across the whole request
        overall: usize,
    },
    /// A chapter reached its final status
    ChapterFinished { index: usize, status: ChapterStatus },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(index: usize) -> ChapterRange {
        ChapterRange {
            index,
            start: 1,
            end: 1,
        }
    }

    #[test]
    fn test_output_path() {
        let mut request = ConversionRequest::new("book.pdf");
        request.output_name = "novel".to_string();
        request.output_dir = PathBuf::from("/tmp/out");
        assert_eq!(
            request.output_path(&chapter(1)),
            PathBuf::from("/tmp/out/novel.mp3")
        );

        request.chapter_size = Some(5);
        assert_eq!(
            request.output_path(&chapter(3)),
            PathBuf::from("/tmp/out/novel_chapter_3.mp3")
        );
    }

    #[test]
    fn test_output_base_name() {
        assert_eq!(output_base_name("  story.mp3 "), "story");
        assert_eq!(output_base_name("story"), "story");
        assert_eq!(output_base_name(""), "audiobook");
        assert_eq!(output_base_name(".mp3"), "audiobook");
    }

    #[test]
    fn test_check() {
        let mut request = ConversionRequest::new("book.pdf");
        assert!(request.check().is_ok());

        request.start_page = 5;
        request.end_page = Some(3);
        assert!(matches!(
            request.check(),
            Err(ConvertError::InvalidPageRange { start: 5, end: 3, total: None })
        ));

        request.end_page = None;
        request.chapter_size = Some(0);
        assert!(matches!(request.check(), Err(ConvertError::InvalidChapterSize)));
    }

    #[test]
    fn test_resolve_end() {
        let mut request = ConversionRequest::new("book.pdf");
        assert_eq!(request.resolve_end(12).unwrap(), 12);

        request.end_page = Some(20);
        assert!(matches!(
            request.resolve_end(12),
            Err(ConvertError::InvalidPageRange { total: Some(12), .. })
        ));

        request.start_page = 4;
        request.end_page = Some(4);
        assert_eq!(request.resolve_end(12).unwrap(), 4);
    }

    #[test]
    fn test_preferences_from_request() {
        let mut request = ConversionRequest::new("book.pdf");
        request.voice = VoiceParameters::new(180, 1.3, Some("en-gb".to_string())).unwrap();
        request.chapter_size = Some(8);
        request.open_after_save = true;

        let prefs = request.preferences();
        assert_eq!(prefs.rate, 180);
        assert_eq!(prefs.pitch, 1.3);
        assert_eq!(prefs.voice.as_deref(), Some("en-gb"));
        assert_eq!(prefs.pages_per_chapter, Some(8));
        assert!(prefs.open_after_save);
    }

    #[test]
    fn test_report_counts() {
        let report = ConversionReport {
            results: vec![
                ConversionResult {
                    chapter: chapter(1),
                    output_path: PathBuf::from("a_chapter_1.mp3"),
                    status: ChapterStatus::Succeeded,
                },
                ConversionResult {
                    chapter: chapter(2),
                    output_path: PathBuf::from("a_chapter_2.mp3"),
                    status: ChapterStatus::Skipped,
                },
                ConversionResult {
                    chapter: chapter(3),
                    output_path: PathBuf::from("a_chapter_3.mp3"),
                    status: ChapterStatus::Failed("boom".to_string()),
                },
            ],
            warnings: vec![],
        };

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.produced_files(), vec![Path::new("a_chapter_1.mp3")]);
        assert_eq!(report.summary(), "Succeeded: 1, Skipped: 1, Failed: 1");
    }
}

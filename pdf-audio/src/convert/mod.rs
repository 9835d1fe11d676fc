//! Conversion orchestration: validate, plan chapters, then extract and render
//! each chapter in order.

mod types;

pub use types::{
    ChapterStatus, ConversionReport, ConversionRequest, ConversionResult, DEFAULT_OUTPUT_NAME,
    ProgressEvent, output_base_name,
};

use crate::chapters::{self, ChapterRange};
use crate::config::PreferencesStore;
use crate::error::ConvertError;
use crate::opener::{FileOpener, SystemOpener};
use crate::pdf::{PdfDocument, TextSource};
use crate::tts::{self, SpeechEngine};
use anyhow::Result;
use tokio::sync::mpsc::UnboundedSender;

type EngineFactory = Box<dyn Fn() -> Result<Box<dyn SpeechEngine>> + Send + Sync>;

/// Runs conversion requests.
///
/// A speech engine is created at the start of each request and released when
/// the request ends. Chapters are rendered one at a time; a failed chapter is
/// recorded and the remaining chapters are still attempted.
pub struct Orchestrator {
    engine_factory: EngineFactory,
    opener: Box<dyn FileOpener>,
    preferences: Option<PreferencesStore>,
    progress: Option<UnboundedSender<ProgressEvent>>,
}

impl Orchestrator {
    pub fn new(
        engine_factory: impl Fn() -> Result<Box<dyn SpeechEngine>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            engine_factory: Box::new(engine_factory),
            opener: Box::new(SystemOpener),
            preferences: None,
            progress: None,
        }
    }

    /// Persist the request's settings here before rendering starts.
    pub fn with_preferences(mut self, store: PreferencesStore) -> Self {
        self.preferences = Some(store);
        self
    }

    #[cfg(test)]
    pub fn with_opener(mut self, opener: impl FileOpener + 'static) -> Self {
        self.opener = Box::new(opener);
        self
    }

    pub fn with_progress(mut self, progress: UnboundedSender<ProgressEvent>) -> Self {
        self.progress = Some(progress);
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.progress {
            // A closed channel only means nobody is watching
            let _ = tx.send(event);
        }
    }

    /// Open the request's PDF and convert it.
    pub async fn convert_file(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionReport, ConvertError> {
        request.check()?;
        let document = PdfDocument::open(&request.document)?;
        self.convert(request, &document).await
    }

    /// Convert the requested pages of an already opened document.
    pub async fn convert(
        &self,
        request: &ConversionRequest,
        source: &dyn TextSource,
    ) -> Result<ConversionReport, ConvertError> {
        request.check()?;
        let end = request.resolve_end(source.page_count())?;
        let plan = chapters::plan(request.start_page, end, request.chapter_size)?;

        let mut report = ConversionReport::default();

        if let Some(store) = &self.preferences {
            if let Err(e) = store.save(&request.preferences()) {
                log::warn!("Failed to save preferences: {:#}", e);
                report.warnings.push(format!("Preferences not saved: {:#}", e));
            }
        }

        let engine = (self.engine_factory)().map_err(ConvertError::Engine)?;
        log::info!(
            "Converting pages {}-{} of {} in {} chapter(s) with {}",
            request.start_page,
            end,
            request.document.display(),
            plan.len(),
            engine.name()
        );
        self.emit(ProgressEvent::Planned {
            chapters: plan.len(),
        });

        let mut overall = 0;
        for chapter in &plan {
            let result = self
                .convert_chapter(request, source, engine.as_ref(), chapter, &mut overall)
                .await;
            self.emit(ProgressEvent::ChapterFinished {
                index: chapter.index,
                status: result.status.clone(),
            });
            report.results.push(result);
        }
        drop(engine);

        if request.open_after_save {
            let mut open_warnings = Vec::new();
            for path in report.produced_files() {
                if let Err(e) = self.opener.open(path) {
                    log::warn!("Could not open {}: {:#}", path.display(), e);
                    open_warnings.push(format!("Could not open {}: {:#}", path.display(), e));
                }
            }
            report.warnings.extend(open_warnings);
        }

        Ok(report)
    }

    async fn convert_chapter(
        &self,
        request: &ConversionRequest,
        source: &dyn TextSource,
        engine: &dyn SpeechEngine,
        chapter: &ChapterRange,
        overall: &mut usize,
    ) -> ConversionResult {
        self.emit(ProgressEvent::ChapterStarted {
            index: chapter.index,
            start_page: chapter.start,
            end_page: chapter.end,
        });

        let output_path = request.output_path(chapter);
        log::debug!(
            "Extracting {} page(s) for chapter {}",
            chapter.page_count(),
            chapter.index
        );
        let text = source.extract(chapter.start - 1, chapter.end);

        if text.trim().is_empty() {
            log::info!(
                "Chapter {} (pages {}-{}) has no text, skipping",
                chapter.index,
                chapter.start,
                chapter.end
            );
            return ConversionResult {
                chapter: *chapter,
                output_path,
                status: ChapterStatus::Skipped,
            };
        }

        let base = *overall;
        let mut chapter_done = 0;
        let rendered = tts::render(
            engine,
            &text,
            &output_path,
            &request.voice,
            &mut |processed, total| {
                chapter_done = processed;
                self.emit(ProgressEvent::SliceRendered {
                    index: chapter.index,
                    processed,
                    total,
                    overall: base + processed,
                });
            },
        )
        .await;
        *overall = base + chapter_done;

        let status = match rendered {
            Ok(()) => {
                log::info!("Wrote {}", output_path.display());
                ChapterStatus::Succeeded
            }
            Err(e) => {
                log::warn!("Chapter {} failed: {:#}", chapter.index, e);
                ChapterStatus::Failed(format!("{:#}", e))
            }
        };

        ConversionResult {
            chapter: *chapter,
            output_path,
            status,
        }
    }
}

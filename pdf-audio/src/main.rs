//! pdf-audio - Convert PDF documents to audiobooks using text-to-speech

mod audio;
mod chapters;
mod config;
mod convert;
mod error;
mod interactive;
mod opener;
mod pdf;
mod tts;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{Preferences, PreferencesStore};
use convert::{
    ChapterStatus, ConversionReport, ConversionRequest, ConversionResult, Orchestrator,
    ProgressEvent,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tts::{VoiceInfo, VoiceParameters};

#[derive(Parser, Debug)]
#[command(name = "pdf-audio")]
#[command(about = "Convert PDF documents to audiobooks using text-to-speech", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the PDF file (omit to be asked interactively)
    pdf_file: Option<PathBuf>,

    /// Ask for every setting interactively
    #[arg(short, long)]
    interactive: bool,

    /// First page to convert (1-based)
    #[arg(long, default_value_t = 1)]
    start: usize,

    /// Last page to convert (default: last page of the document)
    #[arg(long)]
    end: Option<usize>,

    /// Pages per chapter; each chapter becomes its own audio file
    #[arg(short, long)]
    chapter_size: Option<usize>,

    /// Render the whole range into one file even if a chapter size is saved
    #[arg(long, conflicts_with = "chapter_size")]
    no_chapters: bool,

    /// Speech rate in words per minute (default: saved preference, 200)
    #[arg(short, long)]
    rate: Option<u32>,

    /// Pitch multiplier, 1.0 is normal (default: saved preference)
    #[arg(short, long)]
    pitch: Option<f32>,

    /// Voice identifier, see `pdf-audio voices`
    #[arg(short, long)]
    voice: Option<String>,

    /// Output file name without extension (default: audiobook)
    #[arg(short, long)]
    output: Option<String>,

    /// Directory for the audio files (default: current directory)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Open the audio files when done
    #[arg(long)]
    open: bool,

    /// Do not open the audio files, even if saved preferences say so
    #[arg(long, conflicts_with = "open")]
    no_open: bool,

    /// Enable debug output
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the voices installed for the speech engine
    Voices,
    /// Saved preferences management
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
}

#[derive(Subcommand, Debug)]
enum PrefsAction {
    /// Show saved preferences
    Show,
    /// Print the preferences file location
    Path,
    /// Forget saved preferences
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let store = PreferencesStore::open_default()?;

    // Handle subcommands
    match &args.command {
        Some(Commands::Voices) => return list_voices().await,
        Some(Commands::Prefs { action }) => return handle_prefs_command(action, &store),
        None => {}
    }

    let prefs = store.load().unwrap_or_else(|e| {
        log::warn!("Ignoring unreadable preferences: {:#}", e);
        Preferences::default()
    });

    let request = match (&args.pdf_file, args.interactive) {
        (Some(_), false) => build_request(&args, &prefs)?,
        _ => {
            let voices = installed_voices().await;
            let mut request = interactive::run_wizard(args.pdf_file.clone(), &prefs, &voices)?;
            if let Some(dir) = &args.output_dir {
                request.output_dir = dir.clone();
            }
            request
        }
    };

    run_conversion(request, store).await
}

/// Log warnings by default, debug output for this crate with --debug.
/// RUST_LOG overrides both.
fn init_logging(debug: bool) {
    let default_filter = if debug { "pdf_audio=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

/// Combine command line arguments with saved preferences.
fn build_request(args: &Args, prefs: &Preferences) -> Result<ConversionRequest> {
    let document = args
        .pdf_file
        .clone()
        .ok_or_else(|| anyhow::anyhow!("PDF file path is required. Run 'pdf-audio --help' for usage."))?;

    let voice = VoiceParameters::new(
        args.rate.unwrap_or(prefs.rate),
        args.pitch.unwrap_or(prefs.pitch),
        args.voice.clone().or_else(|| prefs.voice.clone()),
    )?;

    let chapter_size = if args.no_chapters {
        None
    } else {
        args.chapter_size.or(prefs.pages_per_chapter)
    };

    let open_after_save = if args.open {
        true
    } else if args.no_open {
        false
    } else {
        prefs.open_after_save
    };

    let mut request = ConversionRequest::new(document);
    request.start_page = args.start;
    request.end_page = args.end;
    request.chapter_size = chapter_size;
    request.voice = voice;
    request.output_name = convert::output_base_name(args.output.as_deref().unwrap_or(""));
    request.open_after_save = open_after_save;
    if let Some(dir) = &args.output_dir {
        request.output_dir = dir.clone();
    }

    Ok(request)
}

/// Run a conversion request, showing progress until it completes.
async fn run_conversion(request: ConversionRequest, store: PreferencesStore) -> Result<()> {
    if !request.output_dir.exists() {
        std::fs::create_dir_all(&request.output_dir).with_context(|| {
            format!("Failed to create {}", request.output_dir.display())
        })?;
    }

    eprintln!("Converting: {}", request.document.display());

    let (tx, rx) = mpsc::unbounded_channel();
    let progress = tokio::spawn(show_progress(rx));

    let orchestrator = Orchestrator::new(tts::create_engine)
        .with_preferences(store)
        .with_progress(tx);
    let result = orchestrator.convert_file(&request).await;

    // Dropping the orchestrator closes the progress channel
    drop(orchestrator);
    progress.await.context("Progress display failed")?;

    let report = match result {
        Ok(report) => report,
        Err(e) if e.is_validation() => {
            anyhow::bail!("{}\nRun 'pdf-audio --help' for usage.", e)
        }
        Err(e) => return Err(e.into()),
    };
    print_report(&report);

    if report.failed() > 0 {
        anyhow::bail!("{} of {} chapter(s) failed", report.failed(), report.results.len());
    }
    Ok(())
}

/// Draw a progress bar per chapter from orchestrator events.
async fn show_progress(mut rx: mpsc::UnboundedReceiver<ProgressEvent>) {
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} chars ({eta}) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");

    let mut chapters = 0;
    let mut bar: Option<ProgressBar> = None;

    while let Some(event) = rx.recv().await {
        match event {
            ProgressEvent::Planned { chapters: count } => chapters = count,
            ProgressEvent::ChapterStarted {
                index,
                start_page,
                end_page,
            } => {
                let pb = ProgressBar::new(0);
                pb.set_style(style.clone());
                pb.set_message(format!(
                    "chapter {}/{} (pages {}-{})",
                    index, chapters, start_page, end_page
                ));
                bar = Some(pb);
            }
            ProgressEvent::SliceRendered {
                processed, total, ..
            } => {
                if let Some(pb) = &bar {
                    pb.set_length(total as u64);
                    pb.set_position(processed as u64);
                }
            }
            ProgressEvent::ChapterFinished { index, status } => {
                if let Some(pb) = bar.take() {
                    pb.finish_and_clear();
                }
                match status {
                    ChapterStatus::Succeeded => eprintln!("  Chapter {}: done", index),
                    ChapterStatus::Skipped => eprintln!("  Chapter {}: skipped, no text", index),
                    ChapterStatus::Failed(detail) => {
                        eprintln!("  Chapter {}: FAILED - {}", index, detail)
                    }
                }
            }
        }
    }
}

fn print_report(report: &ConversionReport) {
    for result in report.results.iter().filter(|r| r.is_success()) {
        eprintln!("{}", saved_line(result));
    }
    for warning in &report.warnings {
        eprintln!("Warning: {}", warning);
    }
    if report.succeeded() == 0 && report.failed() == 0 {
        eprintln!("No text found in the selected pages.");
    }
    eprintln!("\n{}", report.summary());
}

fn saved_line(result: &ConversionResult) -> String {
    format!(
        "Saved: {} (pages {}-{})",
        result.output_path.display(),
        result.chapter.start,
        result.chapter.end
    )
}

/// Voices for the wizard; an unavailable engine just means no voice list.
async fn installed_voices() -> Vec<VoiceInfo> {
    let voices = match tts::create_engine() {
        Ok(engine) => engine.voices().await,
        Err(e) => Err(e),
    };
    voices.unwrap_or_else(|e| {
        log::warn!("Could not list voices: {:#}", e);
        Vec::new()
    })
}

async fn list_voices() -> Result<()> {
    let engine = tts::create_engine()?;
    let voices = engine.voices().await?;

    if voices.is_empty() {
        println!("No voices installed for {}", engine.name());
        return Ok(());
    }

    println!("Available voices ({}):", engine.name());
    for (i, voice) in voices.iter().enumerate() {
        println!("  {}", interactive::voice_label(i, voice));
    }
    Ok(())
}

fn handle_prefs_command(action: &PrefsAction, store: &PreferencesStore) -> Result<()> {
    match action {
        PrefsAction::Show => {
            let prefs = store.load()?;
            println!("Preferences file: {}", store.path().display());
            println!();
            println!("rate = {}", prefs.rate);
            println!("pitch = {}", prefs.pitch);
            match &prefs.voice {
                Some(voice) => println!("voice = \"{}\"", voice),
                None => println!("voice = (engine default)"),
            }
            match prefs.pages_per_chapter {
                Some(pages) => println!("pages_per_chapter = {}", pages),
                None => println!("pages_per_chapter = (no chapters)"),
            }
            println!("open_after_save = {}", prefs.open_after_save);
        }
        PrefsAction::Path => {
            println!("{}", store.path().display());
        }
        PrefsAction::Reset => {
            store.reset()?;
            println!("Preferences reset to defaults");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_args_override_preferences() {
        let prefs = Preferences {
            rate: 120,
            pitch: 1.5,
            voice: Some("en-gb".to_string()),
            pages_per_chapter: Some(10),
            open_after_save: true,
        };
        let args = parse(&[
            "pdf-audio", "book.pdf", "--rate", "180", "--voice", "en-us", "--no-open", "-o",
            "novel.mp3",
        ]);

        let request = build_request(&args, &prefs).unwrap();
        assert_eq!(request.voice.rate, 180);
        assert_eq!(request.voice.pitch, 1.5);
        assert_eq!(request.voice.voice.as_deref(), Some("en-us"));
        assert_eq!(request.chapter_size, Some(10));
        assert!(!request.open_after_save);
        assert_eq!(request.output_name, "novel");
    }

    #[test]
    fn test_defaults_from_preferences() {
        let args = parse(&["pdf-audio", "book.pdf", "--start", "3", "--end", "7"]);
        let request = build_request(&args, &Preferences::default()).unwrap();

        assert_eq!(request.document, PathBuf::from("book.pdf"));
        assert_eq!(request.start_page, 3);
        assert_eq!(request.end_page, Some(7));
        assert_eq!(request.chapter_size, None);
        assert_eq!(request.voice, VoiceParameters::default());
        assert_eq!(request.output_name, "audiobook");
        assert!(!request.open_after_save);
    }

    #[test]
    fn test_no_chapters_flag() {
        let prefs = Preferences {
            pages_per_chapter: Some(4),
            ..Preferences::default()
        };
        let args = parse(&["pdf-audio", "book.pdf", "--no-chapters"]);
        assert_eq!(build_request(&args, &prefs).unwrap().chapter_size, None);
    }

    #[test]
    fn test_rejects_zero_rate() {
        let args = parse(&["pdf-audio", "book.pdf", "--rate", "0"]);
        assert!(build_request(&args, &Preferences::default()).is_err());
    }

    #[test]
    fn test_saved_line_names_pages() {
        let result = ConversionResult {
            chapter: chapters::ChapterRange {
                index: 2,
                start: 5,
                end: 6,
            },
            output_path: PathBuf::from("book_chapter_2.mp3"),
            status: ChapterStatus::Succeeded,
        };
        assert_eq!(saved_line(&result), "Saved: book_chapter_2.mp3 (pages 5-6)");
    }

    #[test]
    fn test_conflicting_flags() {
        assert!(Args::try_parse_from(["pdf-audio", "a.pdf", "--open", "--no-open"]).is_err());
        assert!(
            Args::try_parse_from(["pdf-audio", "a.pdf", "-c", "3", "--no-chapters"]).is_err()
        );
    }
}

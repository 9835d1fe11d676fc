use crate::config::Preferences;
use crate::convert::{ConversionRequest, output_base_name};
use crate::pdf::{PdfDocument, TextSource};
use crate::tts::{VoiceInfo, VoiceParameters};
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::PathBuf;

/// Chapter size offered when no preference exists yet.
const DEFAULT_PAGES_PER_CHAPTER: usize = 10;

/// Ask for every conversion setting, prefilled from `prefs`.
///
/// A `document` given on the command line is used as is instead of asking.
pub fn run_wizard(
    document: Option<PathBuf>,
    prefs: &Preferences,
    voices: &[VoiceInfo],
) -> Result<ConversionRequest> {
    print_header();

    // Step 1: Source document
    let document = match document {
        Some(path) => supplied_document(path)?,
        None => select_document()?,
    };
    let page_count = PdfDocument::open(&document)?.page_count();
    if page_count == 0 {
        anyhow::bail!("{} has no pages", document.display());
    }
    println!("  {} pages\n", style(page_count).bold());

    // Step 2: Page range
    let (start_page, end_page) = select_page_range(page_count)?;

    // Step 3: Chapters
    let chapter_size = select_chapter_size(prefs)?;

    // Step 4: Voice
    let voice = select_voice(prefs, voices)?;

    let rate: u32 = Input::new()
        .with_prompt("Speech rate (words per minute)")
        .default(prefs.rate)
        .validate_with(|rate: &u32| -> Result<(), String> {
            if *rate == 0 {
                Err("Rate must be positive".to_string())
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let pitch: f32 = Input::new()
        .with_prompt("Pitch (1.0 is normal)")
        .default(prefs.pitch)
        .validate_with(|pitch: &f32| -> Result<(), String> {
            if pitch.is_finite() && *pitch > 0.0 {
                Ok(())
            } else {
                Err("Pitch must be a positive number".to_string())
            }
        })
        .interact_text()?;

    // Step 5: Output
    let output_name: String = Input::new()
        .with_prompt("Output file name (without .mp3)")
        .default(crate::convert::DEFAULT_OUTPUT_NAME.to_string())
        .allow_empty(true)
        .interact_text()?;

    let open_after_save = Confirm::new()
        .with_prompt("Open the audio when done?")
        .default(prefs.open_after_save)
        .interact()?;

    let mut request = ConversionRequest::new(document);
    request.start_page = start_page;
    request.end_page = Some(end_page);
    request.chapter_size = chapter_size;
    request.voice = VoiceParameters::new(rate, pitch, voice)?;
    request.output_name = output_base_name(&output_name);
    request.open_after_save = open_after_save;

    // Step 6: Confirm
    print_summary(&request);
    if !Confirm::new()
        .with_prompt("Proceed with these settings?")
        .default(true)
        .interact()?
    {
        anyhow::bail!("Cancelled by user");
    }
    println!();

    Ok(request)
}

fn print_header() {
    println!();
    println!("{}", style("PDF to Audiobook Converter").cyan().bold());
    println!();
}

fn select_document() -> Result<PathBuf> {
    let path: String = Input::new()
        .with_prompt("Path to your PDF file")
        .validate_with(|input: &String| -> Result<(), String> {
            let path = PathBuf::from(input.trim());
            if path.is_file() {
                Ok(())
            } else {
                Err(format!("File not found: {}", path.display()))
            }
        })
        .interact_text()?;

    Ok(PathBuf::from(path.trim()))
}

fn supplied_document(path: PathBuf) -> Result<PathBuf> {
    if !path.is_file() {
        anyhow::bail!("File not found: {}", path.display());
    }
    println!("{} {}", style("Document:").bold(), path.display());
    Ok(path)
}

fn select_page_range(page_count: usize) -> Result<(usize, usize)> {
    let range: String = Input::new()
        .with_prompt(format!("Pages to convert (e.g. 3-7, 1 to {})", page_count))
        .default(format!("1-{}", page_count))
        .validate_with(move |input: &String| -> Result<(), String> {
            parse_page_range(input, page_count)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()?;

    parse_page_range(&range, page_count)
}

fn select_chapter_size(prefs: &Preferences) -> Result<Option<usize>> {
    let split = Confirm::new()
        .with_prompt("Split into chapters (one audio file per group of pages)?")
        .default(prefs.pages_per_chapter.is_some())
        .interact()?;

    if !split {
        return Ok(None);
    }

    let size: usize = Input::new()
        .with_prompt("Pages per chapter")
        .default(prefs.pages_per_chapter.unwrap_or(DEFAULT_PAGES_PER_CHAPTER))
        .validate_with(|size: &usize| -> Result<(), String> {
            if *size >= 1 {
                Ok(())
            } else {
                Err("Must be at least 1".to_string())
            }
        })
        .interact_text()?;

    Ok(Some(size))
}

fn select_voice(prefs: &Preferences, voices: &[VoiceInfo]) -> Result<Option<String>> {
    if voices.is_empty() {
        return Ok(prefs.voice.clone());
    }

    let mut items = vec!["Engine default".to_string()];
    items.extend(voices.iter().enumerate().map(|(i, v)| voice_label(i, v)));

    let default = prefs
        .voice
        .as_deref()
        .and_then(|id| voices.iter().position(|v| v.id == id))
        .map(|i| i + 1)
        .unwrap_or(0);

    let selection = Select::new()
        .with_prompt("Select a voice")
        .items(&items)
        .default(default)
        .max_length(15)
        .interact()?;

    Ok(selection.checked_sub(1).map(|i| voices[i].id.clone()))
}

/// Label shown for a voice in lists, e.g. `Voice 3 - English (America) (Female) [en-us]`.
pub fn voice_label(index: usize, voice: &VoiceInfo) -> String {
    format!(
        "Voice {} - {} ({}) [{}]",
        index + 1,
        voice.name,
        voice.gender.as_deref().unwrap_or("Unknown"),
        voice.id
    )
}

/// Parse a page range like "3-7" or "5" and check start <= end <= page_count.
///
/// An empty answer selects every page.
pub fn parse_page_range(input: &str, page_count: usize) -> Result<(usize, usize)> {
    let input = input.trim();
    let (start, end) = if input.is_empty() {
        (1, page_count)
    } else if let Some((start, end)) = input.split_once('-') {
        let start: usize = start.trim().parse().context("Invalid start page")?;
        let end: usize = end.trim().parse().context("Invalid end page")?;
        (start, end)
    } else {
        let page: usize = input.parse().context("Invalid page number")?;
        (page, page)
    };

    if start == 0 || start > end || end > page_count {
        anyhow::bail!(
            "Page range must satisfy 1 <= start <= end <= {}",
            page_count
        );
    }
    Ok((start, end))
}

fn print_summary(request: &ConversionRequest) {
    println!();
    println!("{}", style("Settings").bold());
    println!("  Document: {}", request.document.display());
    println!(
        "  Pages:    {}-{}",
        request.start_page,
        request.end_page.unwrap_or(request.start_page)
    );
    match request.chapter_size {
        Some(size) => println!("  Chapters: {} pages each", size),
        None => println!("  Chapters: single file"),
    }
    println!(
        "  Voice:    {}",
        request.voice.voice.as_deref().unwrap_or("engine default")
    );
    println!("  Rate:     {}", request.voice.rate);
    println!("  Pitch:    {}", request.voice.pitch);
    println!("  Output:   {}.mp3", request.output_name);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_range() {
        assert_eq!(parse_page_range("3-7", 10).unwrap(), (3, 7));
        assert_eq!(parse_page_range(" 2 - 2 ", 10).unwrap(), (2, 2));
        assert_eq!(parse_page_range("5", 10).unwrap(), (5, 5));
        assert_eq!(parse_page_range("", 10).unwrap(), (1, 10));
    }

    #[test]
    fn test_parse_page_range_rejects_bad_ranges() {
        assert!(parse_page_range("5-3", 10).is_err());
        assert!(parse_page_range("0-3", 10).is_err());
        assert!(parse_page_range("3-11", 10).is_err());
        assert!(parse_page_range("three", 10).is_err());
        assert!(parse_page_range("1-2-3", 10).is_err());
    }

    #[test]
    fn test_supplied_document_skips_prompt() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("book.pdf");
        std::fs::write(&path, b"%PDF-1.5").unwrap();

        assert_eq!(supplied_document(path.clone()).unwrap(), path);
        assert!(supplied_document(dir.path().join("missing.pdf")).is_err());
    }

    #[test]
    fn test_voice_label() {
        let voice = VoiceInfo {
            id: "en-us".to_string(),
            name: "English (America)".to_string(),
            gender: None,
        };
        assert_eq!(
            voice_label(2, &voice),
            "Voice 3 - English (America) (Unknown) [en-us]"
        );
    }
}

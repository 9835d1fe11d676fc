//! Chapter planning: split a page range into consecutive sub-ranges.

use crate::error::ConvertError;

/// A contiguous run of pages rendered into its own audio file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterRange {
    /// 1-based position in the plan
    pub index: usize,
    /// First page (1-based, inclusive)
    pub start: usize,
    /// Last page (1-based, inclusive)
    pub end: usize,
}

impl ChapterRange {
    pub fn page_count(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Plan the chapters covering pages `start..=end`.
///
/// With no chapter size the whole span is one chapter. Otherwise each chapter
/// holds `chapter_size` pages and the last one stops at `end`.
pub fn plan(
    start: usize,
    end: usize,
    chapter_size: Option<usize>,
) -> Result<Vec<ChapterRange>, ConvertError> {
    if start == 0 || start > end {
        return Err(ConvertError::InvalidPageRange {
            start,
            end,
            total: None,
        });
    }

    let size = match chapter_size {
        None => {
            return Ok(vec![ChapterRange {
                index: 1,
                start,
                end,
            }]);
        }
        Some(0) => return Err(ConvertError::InvalidChapterSize),
        Some(size) => size,
    };

    let mut chapters = Vec::new();
    let mut first = start;
    while first <= end {
        let last = first.saturating_add(size - 1).min(end);
        chapters.push(ChapterRange {
            index: chapters.len() + 1,
            start: first,
            end: last,
        });
        first = last + 1;
    }

    Ok(chapters)
}

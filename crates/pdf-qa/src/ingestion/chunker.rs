//! Recursive character text splitting with page and position tracking

use std::collections::VecDeque;

use unicode_segmentation::UnicodeSegmentation;

use super::parser::ParsedDocument;
use crate::types::{Chunk, ChunkSource, Document};

/// Separators tried in order: paragraphs, lines, words, characters
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Text chunker with configurable size and overlap.
///
/// Splits on the coarsest separator present in the text and recurses into
/// pieces that are still too long, then greedily merges neighbouring pieces
/// back into windows of at most `chunk_size` characters. Consecutive windows
/// share at most `overlap` characters of trailing context.
pub struct TextChunker {
    /// Target chunk size in characters
    chunk_size: usize,
    /// Overlap between chunks in characters
    overlap: usize,
    /// Separators, coarsest first; `""` means grapheme clusters
    separators: Vec<String>,
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        if overlap >= chunk_size {
            tracing::warn!(
                "Chunk overlap {} is not smaller than chunk size {}, clamping",
                overlap,
                chunk_size
            );
        }

        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Chunk a parsed document page by page
    pub fn chunk_document(&self, doc: &Document, parsed: &ParsedDocument) -> Vec<Chunk> {
        let total_pages = parsed.total_pages.unwrap_or(parsed.pages.len() as u32);
        let mut chunks = Vec::new();

        for page in &parsed.pages {
            for (content, char_start, char_end) in self.split_with_offsets(&page.content) {
                let source = ChunkSource::pdf(doc.filename.clone(), page.page_number, total_pages);
                let index = chunks.len() as u32;
                chunks.push(Chunk::new(doc.id, content, source, char_start, char_end, index));
            }
        }

        tracing::debug!(
            "Split '{}' into {} chunks ({} pages)",
            doc.filename,
            chunks.len(),
            parsed.pages.len()
        );

        chunks
    }

    /// Split text into windows
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    /// Split text and locate each window as a character range of `text`
    pub fn split_with_offsets(&self, text: &str) -> Vec<(String, usize, usize)> {
        let mut located = Vec::new();
        let mut search_from = 0usize;
        let mut last_start = 0usize;

        for chunk in self.split_text(text) {
            let char_start = match text[search_from..].find(&chunk) {
                Some(pos) => {
                    let byte_start = search_from + pos;
                    // Next window starts strictly after this one
                    search_from = text[byte_start..]
                        .chars()
                        .next()
                        .map_or(text.len(), |c| byte_start + c.len_utf8());
                    char_len(&text[..byte_start])
                }
                None => last_start,
            };
            last_start = char_start;
            let char_end = char_start + char_len(&chunk);
            located.push((chunk, char_start, char_end));
        }

        located
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];

        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge_pieces(&fitting));
                fitting.clear();
            }

            if remaining.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge_pieces(&fitting));
        }

        chunks
    }

    /// Greedily merge pieces into windows, carrying at most `overlap`
    /// characters from the end of one window into the next
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let mut windows = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !current.is_empty() {
                if total > self.chunk_size {
                    tracing::warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total,
                        self.chunk_size
                    );
                }

                if let Some(window) = join_pieces(&current) {
                    windows.push(window);
                }

                while total > self.overlap || (total + len > self.chunk_size && total > 0) {
                    match current.pop_front() {
                        Some(dropped) => total -= char_len(dropped),
                        None => break,
                    }
                }
            }

            current.push_back(piece);
            total += len;
        }

        if let Some(window) = join_pieces(&current) {
            windows.push(window);
        }

        windows
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(4000, 10)
    }
}

/// Split `text` on `separator`, attaching each separator to the start of the
/// piece that follows it. An empty separator splits into grapheme clusters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text.graphemes(true).collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn join_pieces(pieces: &VecDeque<&str>) -> Option<String> {
    let joined: String = pieces.iter().copied().collect();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::parser::PageContent;
    use crate::types::FileType;

    fn parsed(pages: &[&str]) -> ParsedDocument {
        ParsedDocument {
            file_type: FileType::Pdf,
            content: pages.join("\n\n"),
            content_hash: String::new(),
            total_pages: Some(pages.len() as u32),
            pages: pages
                .iter()
                .enumerate()
                .map(|(i, text)| PageContent {
                    page_number: i as u32 + 1,
                    content: text.to_string(),
                    char_offset: 0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunker = TextChunker::default();
        assert_eq!(chunker.split_text("  Hello world.  "), vec!["Hello world."]);
        assert!(chunker.split_text("   \n\n  ").is_empty());
    }

    #[test]
    fn test_paragraphs_are_merged_up_to_size() {
        let chunker = TextChunker::new(40, 0);
        let text = "Alpha beta gamma.\n\nDelta epsilon zeta.\n\nEta theta iota.";

        assert_eq!(
            chunker.split_text(text),
            vec!["Alpha beta gamma.\n\nDelta epsilon zeta.", "Eta theta iota."]
        );
    }

    #[test]
    fn test_word_windows_overlap() {
        let chunker = TextChunker::new(15, 5);
        let text = "one two three four five six seven eight nine ten";

        assert_eq!(
            chunker.split_text(text),
            vec!["one two three", "four five six", "six seven", "eight nine ten"]
        );
    }

    #[test]
    fn test_unbroken_text_falls_back_to_characters() {
        let chunker = TextChunker::new(4, 1);
        assert_eq!(chunker.split_text("abcdefghij"), vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn test_long_paragraph_recurses_to_words() {
        let chunker = TextChunker::new(20, 0);
        let text = "Short intro.\n\nThis paragraph is definitely longer than twenty characters.";
        let chunks = chunker.split_text(text);

        assert_eq!(chunks[0], "Short intro.");
        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
        assert_eq!(
            chunks[1..].join(" "),
            "This paragraph is definitely longer than twenty characters."
        );
    }

    #[test]
    fn test_multibyte_text_respects_character_budget() {
        let chunker = TextChunker::new(5, 0);
        let chunks = chunker.split_text("äöüßéèêëïî");
        assert_eq!(chunks, vec!["äöüßé", "èêëïî"]);
    }

    #[test]
    fn test_offsets_locate_chunks() {
        let chunker = TextChunker::new(15, 5);
        let text = "one two three four five six seven eight nine ten";

        for (chunk, start, end) in chunker.split_with_offsets(text) {
            let located: String = text.chars().skip(start).take(end - start).collect();
            assert_eq!(located, chunk);
        }
    }

    #[test]
    fn test_chunk_document_keeps_pages() {
        let chunker = TextChunker::new(15, 5);
        let doc = Document::new("a.pdf".to_string(), FileType::Pdf, "h".to_string(), 10);
        let parsed = parsed(&["one two three four five", "six seven"]);

        let chunks = chunker.chunk_document(&doc, &parsed);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].source.page_number, Some(1));
        assert_eq!(chunks[1].source.page_number, Some(1));
        assert_eq!(chunks[2].source.page_number, Some(2));
        assert_eq!(chunks[2].source.page_count, Some(2));
        assert_eq!(chunks[2].content, "six seven");
        assert!(chunks.iter().enumerate().all(|(i, c)| c.chunk_index == i as u32));
        assert!(chunks.iter().all(|c| c.document_id == doc.id));
    }

    /// Deterministic multi-paragraph text with mixed line breaks and one
    /// unbroken token longer than any window
    fn long_text(seed: u64) -> String {
        const WORDS: &[&str] = &[
            "the", "index", "stores", "vectors", "for", "each", "page", "of", "a", "report",
            "questions", "retrieve", "nearby", "chunks", "quickly",
        ];
        let mut state = seed;
        let mut next = move |bound: usize| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((state >> 33) as usize) % bound
        };

        let mut paragraphs = Vec::new();
        for p in 0..25 {
            let mut paragraph = String::new();
            for w in 0..(5 + next(60)) {
                if w > 0 {
                    paragraph.push_str(if next(12) == 0 { "\n" } else { " " });
                }
                // numbered so no window text repeats elsewhere
                paragraph.push_str(&format!("{}{:04}", WORDS[next(WORDS.len())], p * 100 + w));
            }
            if p == 12 {
                let token: String = (0..300).map(|_| (b'a' + next(26) as u8) as char).collect();
                paragraph.push(' ');
                paragraph.push_str(&token);
            }
            paragraphs.push(paragraph);
        }
        paragraphs.join("\n\n")
    }

    #[test]
    fn test_windows_cover_text_within_bounds() {
        for (seed, chunk_size, overlap) in [(1, 120, 20), (7, 200, 10), (42, 64, 16)] {
            let text = long_text(seed);
            let chars: Vec<char> = text.chars().collect();
            let chunker = TextChunker::new(chunk_size, overlap);
            let located = chunker.split_with_offsets(&text);
            assert!(located.len() > 5);

            let mut covered = vec![false; chars.len()];
            let mut previous_end: Option<usize> = None;
            for (content, start, end) in &located {
                assert!(content.chars().count() <= chunk_size, "oversized: {:?}", content);
                assert_eq!(&chars[*start..*end].iter().collect::<String>(), content);
                if let Some(prev_end) = previous_end {
                    assert!(prev_end.saturating_sub(*start) <= overlap);
                }
                covered[*start..*end].iter_mut().for_each(|c| *c = true);
                previous_end = Some(*end);
            }

            for (i, c) in chars.iter().enumerate() {
                assert!(c.is_whitespace() || covered[i], "char {} ({:?}) not covered", i, c);
            }
        }
    }

    #[test]
    fn test_overlap_is_clamped() {
        let chunker = TextChunker::new(10, 50);
        assert_eq!(chunker.overlap, 9);
    }
}

//! Sliding-window text chunker with overlap.
//!
//! Splits a [`Document`]'s text into ordered, overlapping windows measured
//! in whitespace-delimited tokens, producing the [`Chunk`]s that feed the
//! embedding pipeline. Consecutive chunks share exactly `overlap_tokens`
//! tokens so that context at a boundary is never stranded on one side.
//!
//! # Algorithm
//!
//! 1. Scan the text once, recording the byte range of every token
//!    (maximal non-whitespace run).
//! 2. Each token *owns* the separator bytes that follow it; the first token
//!    also owns any leading separator and the last runs to end of text.
//!    Token spans therefore tile the document exactly.
//! 3. Emit windows of at most `max_tokens` tokens. A window's end prefers
//!    the rightmost natural breakpoint in its tail — a sentence-final token
//!    (`.`, `!`, `?`, closing quotes/brackets allowed) or a token followed
//!    by a blank line — and falls back to a hard cut at the size limit.
//! 4. The next window starts `overlap_tokens` tokens before the previous
//!    window's end. The final window is whatever remains, unpadded.
//!
//! Because spans tile the text, dropping the first `overlap_tokens` token
//! spans from every chunk after the first and concatenating reconstructs
//! the document byte-for-byte; [`reassemble`] implements this.
//!
//! Chunking is pure and deterministic: the same `(text, max, overlap)`
//! always yields the same windows, and [`Chunker::windows`] returns a
//! `Clone` iterator that can be restarted or resumed from any point.
//!
//! # Example
//!
//! ```rust
//! use rag_harness_core::chunk::Chunker;
//!
//! let chunker = Chunker::new(4, 1).unwrap();
//! let windows: Vec<_> = chunker.windows("A B C D E F G H").collect();
//! assert_eq!(windows.len(), 3);
//! assert_eq!(windows[0].tokens, 4);
//! ```

use thiserror::Error;

use crate::models::{Chunk, Document};

/// Rejected chunker configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("invalid chunking configuration: {0}")]
    InvalidConfiguration(String),
}

/// Byte range of a token's non-whitespace run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Token {
    start: usize,
    end: usize,
}

/// A single window over the source text.
///
/// `start..end` is the byte span of the window including the separator
/// bytes owned by its tokens; `tokens` is the window's token count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
    pub tokens: usize,
}

/// Splits document text into overlapping fixed-size token windows.
///
/// Construction validates the configuration; both `split` and `windows`
/// are pure functions of the input text and the validated parameters.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    max_tokens: usize,
    overlap_tokens: usize,
}

impl Chunker {
    /// Create a chunker, rejecting invalid configurations up front.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::InvalidConfiguration`] when `max_tokens` is
    /// zero or `overlap_tokens >= max_tokens`.
    pub fn new(max_tokens: usize, overlap_tokens: usize) -> Result<Self, ChunkError> {
        if max_tokens == 0 {
            return Err(ChunkError::InvalidConfiguration(
                "max_tokens must be > 0".to_string(),
            ));
        }
        if overlap_tokens >= max_tokens {
            return Err(ChunkError::InvalidConfiguration(format!(
                "overlap_tokens ({}) must be < max_tokens ({})",
                overlap_tokens, max_tokens
            )));
        }
        Ok(Self {
            max_tokens,
            overlap_tokens,
        })
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn overlap_tokens(&self) -> usize {
        self.overlap_tokens
    }

    /// Iterate over the window spans for `text`.
    ///
    /// Text containing no tokens (empty or all whitespace) yields nothing.
    /// The iterator is `Clone`: cloning mid-iteration produces an
    /// independent cursor that continues from the same position.
    pub fn windows<'a>(&self, text: &'a str) -> Windows<'a> {
        Windows {
            text,
            tokens: tokenize(text),
            max_tokens: self.max_tokens,
            overlap_tokens: self.overlap_tokens,
            next_start: 0,
            done: false,
        }
    }

    /// Split a document into chunks.
    ///
    /// Chunks carry contiguous 0-based indices, the parent document's id
    /// and metadata, and exact byte offsets into the document text.
    pub fn split(&self, doc: &Document) -> Vec<Chunk> {
        self.windows(&doc.text)
            .enumerate()
            .map(|(index, w)| {
                Chunk::new(
                    &doc.id,
                    index,
                    &doc.text[w.start..w.end],
                    w.start,
                    w.end,
                    doc.metadata.clone(),
                )
            })
            .collect()
    }
}

/// Window iterator returned by [`Chunker::windows`].
#[derive(Debug, Clone)]
pub struct Windows<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    max_tokens: usize,
    overlap_tokens: usize,
    next_start: usize,
    done: bool,
}

impl<'a> Windows<'a> {
    /// Byte offset where token `k`'s span begins.
    fn span_start(&self, k: usize) -> usize {
        if k == 0 {
            0
        } else {
            self.tokens[k].start
        }
    }

    /// Byte offset one past token `k`'s span (start of token `k + 1`,
    /// or end of text for the last token).
    fn span_end(&self, k: usize) -> usize {
        match self.tokens.get(k + 1) {
            Some(next) => next.start,
            None => self.text.len(),
        }
    }

    /// Whether a window may end after token `k`: the token closes a
    /// sentence, or a blank line follows it.
    fn is_breakpoint(&self, k: usize) -> bool {
        let tok = &self.text[self.tokens[k].start..self.tokens[k].end];
        let closers: &[char] = &['"', '\'', ')', ']', '\u{201d}', '\u{2019}'];
        let trimmed = tok.trim_end_matches(closers);
        if trimmed.ends_with(&['.', '!', '?'][..]) {
            return true;
        }
        let sep = &self.text[self.tokens[k].end..self.span_end(k)];
        sep.contains("\n\n")
    }

    /// Pick the end (exclusive token index) of a window starting at `s`.
    ///
    /// Searches the window's tail, rightmost first, down to half the
    /// window (never at or below the overlap, so every window advances);
    /// a hard cut at the size limit is the fallback.
    fn window_end(&self, s: usize) -> usize {
        let hard_end = (s + self.max_tokens).min(self.tokens.len());
        if hard_end == self.tokens.len() {
            return hard_end;
        }
        let floor = s + (self.max_tokens / 2).max(self.overlap_tokens + 1);
        for end in (floor..=hard_end).rev() {
            if self.is_breakpoint(end - 1) {
                return end;
            }
        }
        hard_end
    }
}

impl<'a> Iterator for Windows<'a> {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        if self.done || self.tokens.is_empty() {
            return None;
        }
        let s = self.next_start;
        let e = self.window_end(s);
        if e == self.tokens.len() {
            self.done = true;
        } else {
            self.next_start = e - self.overlap_tokens;
        }
        Some(Window {
            start: self.span_start(s),
            end: self.span_end(e - 1),
            tokens: e - s,
        })
    }
}

/// Reconstruct the original document text from its chunks.
///
/// Takes the chunks of one document in index order and concatenates them
/// with each chunk's leading overlap dropped. Because chunk spans tile the
/// source text, the result is byte-identical to the input that produced
/// them.
pub fn reassemble(chunks: &[Chunk]) -> String {
    let mut out = String::new();
    let mut prev_end = 0usize;
    for (i, c) in chunks.iter().enumerate() {
        if i == 0 {
            out.push_str(&c.text);
        } else {
            let skip = prev_end - c.start;
            out.push_str(&c.text[skip..]);
        }
        prev_end = c.end;
    }
    out
}

/// Record the byte range of every maximal non-whitespace run.
fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    for (i, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                tokens.push(Token { start: s, end: i });
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(Token {
            start: s,
            end: text.len(),
        });
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metadata;

    fn doc(text: &str) -> Document {
        Document::with_id("doc1", text, Metadata::new())
    }

    fn token_count(text: &str) -> usize {
        text.split_whitespace().count()
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        assert!(matches!(
            Chunker::new(0, 0),
            Err(ChunkError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Chunker::new(4, 4),
            Err(ChunkError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Chunker::new(4, 7),
            Err(ChunkError::InvalidConfiguration(_))
        ));
        assert!(Chunker::new(1, 0).is_ok());
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let chunker = Chunker::new(4, 1).unwrap();
        assert!(chunker.split(&doc("")).is_empty());
        assert!(chunker.split(&doc("   \n\t ")).is_empty());
    }

    #[test]
    fn test_short_text_single_chunk_equals_input() {
        let chunker = Chunker::new(10, 2).unwrap();
        let text = "  hello   world \n";
        let chunks = chunker.split(&doc(text));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].index, 0);
        assert_eq!((chunks[0].start, chunks[0].end), (0, text.len()));
    }

    #[test]
    fn test_eight_tokens_window_four_overlap_one() {
        let chunker = Chunker::new(4, 1).unwrap();
        let chunks = chunker.split(&doc("A B C D E F G H"));
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.trim_end()).collect();
        assert_eq!(texts, vec!["A B C D", "D E F G", "G H"]);
        for c in &chunks {
            assert!(token_count(&c.text) <= 4);
        }
        // Pairwise overlaps are exactly one token.
        assert!(chunks[0].text.trim_end().ends_with('D'));
        assert!(chunks[1].text.starts_with('D'));
        assert!(chunks[1].text.trim_end().ends_with('G'));
        assert!(chunks[2].text.starts_with('G'));
    }

    #[test]
    fn test_consecutive_chunks_share_overlap_bytes() {
        let chunker = Chunker::new(5, 2).unwrap();
        let text = "one two three four five six seven eight nine ten eleven";
        let chunks = chunker.split(&doc(text));
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            // The trailing span of `a` and leading span of `b` are the
            // same bytes of the source text.
            assert!(b.start < a.end);
            let shared = &text[b.start..a.end];
            assert!(a.text.ends_with(shared));
            assert!(b.text.starts_with(shared));
            assert_eq!(token_count(shared), 2);
        }
    }

    #[test]
    fn test_roundtrip_exact_across_configs() {
        let texts = [
            "plain words separated by single spaces",
            "double  spaces\tand\ttabs\nand newlines mixed   in",
            "Unicode: caffè déjà-vu über señor — plus emoji 🚀 tokens",
            "Sentences end here. Another begins! A third? Yes.\n\nNew paragraph follows with more words.",
            "one",
            "  leading and trailing whitespace  ",
        ];
        let configs = [(1, 0), (2, 1), (4, 0), (4, 1), (4, 3), (8, 2), (64, 16)];
        for text in &texts {
            for &(max, overlap) in &configs {
                let chunker = Chunker::new(max, overlap).unwrap();
                let chunks = chunker.split(&doc(text));
                assert_eq!(
                    reassemble(&chunks),
                    *text,
                    "roundtrip failed for max={} overlap={}",
                    max,
                    overlap
                );
                for c in &chunks {
                    assert!(token_count(&c.text) <= max);
                }
                for (i, c) in chunks.iter().enumerate() {
                    assert_eq!(c.index, i);
                }
            }
        }
    }

    #[test]
    fn test_window_prefers_sentence_boundary() {
        let chunker = Chunker::new(5, 0).unwrap();
        let windows: Vec<_> = chunker.windows("aaa bbb. ccc ddd eee fff ggg").collect();
        // The first window stops after "bbb." instead of the hard cut at
        // five tokens.
        assert_eq!(windows[0].tokens, 2);
        let text = "aaa bbb. ccc ddd eee fff ggg";
        assert_eq!(&text[windows[0].start..windows[0].end], "aaa bbb. ");
    }

    #[test]
    fn test_window_prefers_paragraph_boundary() {
        let text = "one two\n\nthree four five six seven";
        let chunker = Chunker::new(4, 0).unwrap();
        let windows: Vec<_> = chunker.windows(text).collect();
        assert_eq!(windows[0].tokens, 2);
        assert_eq!(&text[windows[0].start..windows[0].end], "one two\n\n");
    }

    #[test]
    fn test_hard_cut_when_no_breakpoint() {
        let chunker = Chunker::new(3, 1).unwrap();
        let windows: Vec<_> = chunker.windows("a b c d e f g").collect();
        assert_eq!(windows[0].tokens, 3);
        for w in &windows {
            assert!(w.tokens <= 3);
        }
    }

    #[test]
    fn test_breakpoint_never_stalls_progress() {
        // Every token ends a "sentence"; the floor keeps windows longer
        // than the overlap.
        let chunker = Chunker::new(4, 3).unwrap();
        let text = "a. b. c. d. e. f. g. h. i. j.";
        let chunks = chunker.split(&doc(text));
        assert_eq!(reassemble(&chunks), text);
        for w in chunker.windows(text) {
            assert!(w.tokens > 3);
        }
    }

    #[test]
    fn test_windows_restartable_and_cloneable() {
        let chunker = Chunker::new(4, 1).unwrap();
        let text = "alpha bravo charlie delta echo foxtrot golf hotel india";
        let first: Vec<_> = chunker.windows(text).collect();
        let second: Vec<_> = chunker.windows(text).collect();
        assert_eq!(first, second);

        let mut iter = chunker.windows(text);
        iter.next();
        let resumed: Vec<_> = iter.clone().collect();
        let continued: Vec<_> = iter.collect();
        assert_eq!(resumed, continued);
        assert_eq!(continued, first[1..].to_vec());
    }

    #[test]
    fn test_chunks_inherit_document_metadata() {
        let mut meta = Metadata::new();
        meta.insert("path".to_string(), "a.md".to_string());
        let document = Document::with_id("d9", "w1 w2 w3 w4 w5 w6", meta.clone());
        let chunker = Chunker::new(3, 1).unwrap();
        let chunks = chunker.split(&document);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert_eq!(c.document_id, "d9");
            assert_eq!(c.metadata, meta);
        }
    }
}

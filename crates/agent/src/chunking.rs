//! Log chunking.
//!
//! A log file that fits the budget is analysed whole. A larger one is either
//! split on line boundaries into ordered chunks (`split`, the default) or
//! condensed into one sampled document of its beginning, its error lines,
//! and its end (`sample`).
//!
//! Split invariants: chunks are ordered and non-overlapping, their
//! concatenation is the decoded text byte for byte, and no chunk exceeds the
//! maximum unless it is a single line longer than the maximum on its own.
//! Such a line becomes its own `oversized` chunk; it is never truncated.

use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::Path;

/// Lines containing any of these (case-insensitive) are kept by `sample`.
const ERROR_KEYWORDS: &[&str] = &["error", "warn", "fail", "exception", "404", "500", "timeout"];

/// How to fit an over-budget file into the model's context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    /// Line-aligned chunks analysed one after another
    #[default]
    Split,
    /// A single sampled document (beginning, errors, end)
    Sample,
}

impl std::str::FromStr for ChunkStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "split" => Ok(Self::Split),
            "sample" => Ok(Self::Sample),
            other => Err(format!("unknown chunk strategy '{other}' (expected split or sample)")),
        }
    }
}

/// One ordered slice of the input handed to one agent loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChunk {
    /// Zero-based position
    pub index: usize,
    /// Byte range in the decoded text
    pub byte_range: Range<usize>,
    /// First line, 1-based
    pub first_line: usize,
    /// Last line, 1-based and inclusive
    pub last_line: usize,
    pub content: String,
    /// A single line longer than the maximum
    pub oversized: bool,
    /// Content is a sample of the range, not the range itself
    pub sampled: bool,
}

impl LogChunk {
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Rough token estimate: 1 token ≈ 4 characters, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Read a local log file, replacing invalid UTF-8 sequences.
pub fn read_log_file(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Split `text` into line-aligned chunks of at most `max_chunk_size` bytes.
pub fn chunk_text(text: &str, max_chunk_size: usize) -> Vec<LogChunk> {
    let max = max_chunk_size.max(1);
    let total_lines = text.split_inclusive('\n').count().max(1);

    if text.len() <= max {
        return vec![LogChunk {
            index: 0,
            byte_range: 0..text.len(),
            first_line: 1,
            last_line: total_lines,
            content: text.to_string(),
            oversized: false,
            sampled: false,
        }];
    }

    let mut chunks: Vec<LogChunk> = Vec::new();
    let mut push = |range: Range<usize>, first_line: usize, last_line: usize, oversized: bool| {
        chunks.push(LogChunk {
            index: chunks.len(),
            content: text[range.clone()].to_string(),
            byte_range: range,
            first_line,
            last_line,
            oversized,
            sampled: false,
        });
    };

    let mut chunk_start = 0;
    let mut chunk_first_line = 1;
    let mut offset = 0;

    for (i, line) in text.split_inclusive('\n').enumerate() {
        let line_no = i + 1;
        let pending = offset - chunk_start;

        if line.len() > max {
            if pending > 0 {
                push(chunk_start..offset, chunk_first_line, line_no - 1, false);
            }
            push(offset..offset + line.len(), line_no, line_no, true);
            chunk_start = offset + line.len();
            chunk_first_line = line_no + 1;
        } else if pending + line.len() > max {
            push(chunk_start..offset, chunk_first_line, line_no - 1, false);
            chunk_start = offset;
            chunk_first_line = line_no;
        }

        offset += line.len();
    }

    if chunk_start < text.len() {
        push(chunk_start..text.len(), chunk_first_line, total_lines, false);
    }

    chunks
}

/// Condense an over-budget log into one document of roughly `budget` bytes.
///
/// Keeps the first and last fifth of the budget verbatim (taken from the
/// first and last third of the file) and fills the rest with lines that
/// look like errors or warnings, in file order. Returns the text unchanged
/// when it already fits.
pub fn sample_log(text: &str, budget: usize) -> String {
    if text.len() <= budget {
        return text.to_string();
    }

    let lines: Vec<&str> = text.lines().collect();
    let total = lines.len();
    let edge_budget = budget / 5;

    let mut beginning = Vec::new();
    let mut beginning_bytes = 0;
    for line in &lines[..total / 3] {
        if beginning_bytes + line.len() > edge_budget {
            break;
        }
        beginning.push(*line);
        beginning_bytes += line.len();
    }

    let mut end = Vec::new();
    let mut end_bytes = 0;
    for line in lines[total - total.div_ceil(3)..].iter().rev() {
        if end_bytes + line.len() > edge_budget {
            break;
        }
        end.push(*line);
        end_bytes += line.len();
    }
    end.reverse();

    let error_budget = budget.saturating_sub(beginning_bytes + end_bytes);
    let mut errors = Vec::new();
    let mut error_bytes = 0;
    for line in &lines {
        let lower = line.to_ascii_lowercase();
        if ERROR_KEYWORDS.iter().any(|k| lower.contains(k)) {
            if error_bytes + line.len() > error_budget {
                break;
            }
            errors.push(*line);
            error_bytes += line.len();
        }
    }

    let sampled_lines = beginning.len() + errors.len() + end.len();
    let sampled_tokens = (beginning_bytes + error_bytes + end_bytes).div_ceil(4);

    format!(
        "=== BEGINNING OF LOG ({} lines) ===\n{}\n\n\
         === ERRORS AND WARNINGS ({} lines) ===\n{}\n\n\
         === END OF LOG ({} lines) ===\n{}\n\n\
         === SAMPLING INFO ===\n\
         Original file: {total} lines\n\
         Sampled: {sampled_lines} lines\n\
         Estimated original tokens: {}\n\
         Estimated sample tokens: {sampled_tokens}\n",
        beginning.len(),
        beginning.join("\n"),
        errors.len(),
        errors.join("\n"),
        end.len(),
        end.join("\n"),
        estimate_tokens(text),
    )
}

/// Turn the decoded file into the chunks to analyse.
pub fn prepare_chunks(text: &str, strategy: ChunkStrategy, max_chunk_size: usize) -> Vec<LogChunk> {
    match strategy {
        ChunkStrategy::Split => chunk_text(text, max_chunk_size),
        ChunkStrategy::Sample if text.len() <= max_chunk_size => chunk_text(text, max_chunk_size),
        ChunkStrategy::Sample => vec![LogChunk {
            index: 0,
            byte_range: 0..text.len(),
            first_line: 1,
            last_line: text.split_inclusive('\n').count().max(1),
            content: sample_log(text, max_chunk_size),
            oversized: false,
            sampled: true,
        }],
    }
}

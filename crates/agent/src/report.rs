//! Findings and the final analysis report.
//!
//! Findings are concatenated in chunk order under a single header. There is
//! no cross-chunk synthesis: each chunk's text is reported as the model
//! wrote it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix for output cut off by the iteration cap.
pub const INCOMPLETE_MARKER: &str = "[incomplete: iteration cap reached]";

const BANNER_WIDTH: usize = 80;

/// How a chunk's analysis ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingStatus {
    Complete,
    /// Iteration cap reached; the text is whatever the model said so far
    Partial,
    Failed(String),
}

impl FindingStatus {
    /// Short name used in events and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::Failed(_) => "failed",
        }
    }
}

/// One chunk's analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkFinding {
    pub index: usize,
    pub first_line: usize,
    pub last_line: usize,
    pub status: FindingStatus,
    pub text: String,
    pub iterations: usize,
}

/// The ordered findings for one log file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// File name of the analysed log
    pub source: String,
    pub total_chunks: usize,
    /// The input was condensed by the sample strategy
    pub sampled: bool,
    pub findings: Vec<ChunkFinding>,
}

impl AnalysisReport {
    pub fn new(source: impl Into<String>, total_chunks: usize) -> Self {
        Self {
            source: source.into(),
            total_chunks,
            sampled: false,
            findings: Vec::new(),
        }
    }

    /// Add a finding, keeping chunk order.
    pub fn push(&mut self, finding: ChunkFinding) {
        let at = self
            .findings
            .partition_point(|existing| existing.index < finding.index);
        self.findings.insert(at, finding);
    }

    pub fn count(&self, label: &str) -> usize {
        self.findings
            .iter()
            .filter(|f| f.status.label() == label)
            .count()
    }

    /// Every chunk failed.
    pub fn is_total_failure(&self) -> bool {
        !self.findings.is_empty() && self.count("failed") == self.findings.len()
    }

    pub fn render(&self) -> String {
        let banner = "=".repeat(BANNER_WIDTH);
        let mut out = String::new();

        out.push_str(&banner);
        out.push('\n');
        out.push_str(&format!("LOG DETECTIVE ANALYSIS: {}\n", self.source));
        out.push_str(&banner);
        out.push('\n');
        if self.sampled {
            out.push_str("(analysis of a sampled excerpt: beginning, errors and end of the log)\n");
        }

        let chunked = self.total_chunks > 1;
        for finding in &self.findings {
            out.push('\n');
            if chunked {
                out.push_str(&format!(
                    "--- Chunk {}/{} (lines {}-{}) ---\n",
                    finding.index + 1,
                    self.total_chunks,
                    finding.first_line,
                    finding.last_line
                ));
            }
            match &finding.status {
                FindingStatus::Failed(reason) => {
                    out.push_str(&format!("[failed: {reason}]\n"));
                }
                FindingStatus::Partial => {
                    out.push_str(INCOMPLETE_MARKER);
                    out.push('\n');
                    push_text(&mut out, &finding.text);
                }
                FindingStatus::Complete => push_text(&mut out, &finding.text),
            }
        }

        if chunked {
            out.push_str(&format!(
                "\n{} chunks: {} complete, {} partial, {} failed\n",
                self.total_chunks,
                self.count("complete"),
                self.count("partial"),
                self.count("failed")
            ));
        }
        out.push('\n');
        out.push_str(&banner);
        out.push('\n');
        out
    }
}

fn push_text(out: &mut String, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        out.push_str("(no findings reported)\n");
    } else {
        out.push_str(text);
        out.push('\n');
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

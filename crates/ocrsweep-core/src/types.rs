// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the ocrsweep extraction engine.

use serde::{Deserialize, Serialize};

/// Identifies the visual line a recognised word belongs to.
///
/// Ordering is lexicographic over (block, paragraph, line), which is the
/// reading order the recognition engine assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct GroupKey {
    /// Engine layout block.
    pub block: u32,
    /// Paragraph within the block.
    pub paragraph: u32,
    /// Line within the paragraph.
    pub line: u32,
}

impl GroupKey {
    /// Key for `line` of `paragraph` in `block`.
    pub fn new(block: u32, paragraph: u32, line: u32) -> Self {
        Self {
            block,
            paragraph,
            line,
        }
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.block, self.paragraph, self.line)
    }
}

/// One word from word-level (structured) recognition output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordToken {
    /// Recognised text, possibly blank.
    pub text: String,
    /// Engine confidence in `0..=100`; `None` when the engine reports none.
    pub confidence: Option<u8>,
    /// Left edge in pixels; orders words within a line.
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
    /// Line the engine assigned the word to.
    pub group: GroupKey,
}

impl WordToken {
    /// Convenience constructor for a word with no geometry beyond `left`.
    pub fn new(text: impl Into<String>, confidence: Option<u8>, left: u32, group: GroupKey) -> Self {
        Self {
            text: text.into(),
            confidence,
            left,
            top: 0,
            width: 0,
            height: 0,
            group,
        }
    }

    /// Whether the token carries any non-whitespace text.
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Which recognition output format produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateMode {
    /// Flat text straight from the engine.
    PlainString,
    /// Word-level output rebuilt into lines.
    Structured,
}

impl CandidateMode {
    /// Short tag used in diagnostics keys.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::PlainString => "string",
            Self::Structured => "data",
        }
    }
}

impl std::fmt::Display for CandidateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Output of one sweep attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub text: String,
    pub score: f64,
    pub mode: CandidateMode,
    pub segmentation_id: u8,
}

impl Candidate {
    /// Diagnostics key for this attempt, e.g. `psm6_string`.
    pub fn diagnostics_key(&self) -> String {
        diagnostics_key(self.segmentation_id, self.mode)
    }
}

/// Diagnostics key for a (segmentation id, mode) pair.
pub fn diagnostics_key(segmentation_id: u8, mode: CandidateMode) -> String {
    format!("psm{}_{}", segmentation_id, mode.tag())
}

/// A detected rectangular page region in pixel coordinates.
///
/// Serializes as `{"x", "y", "w", "h"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    #[serde(rename = "w", alias = "width")]
    pub width: u32,
    #[serde(rename = "h", alias = "height")]
    pub height: u32,
}

impl Block {
    /// Region of `width x height` pixels whose top-left corner is `(x, y)`.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Pixel count, widened so huge regions cannot overflow.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Reading-order key: top first, then left.
    pub fn reading_order_key(&self) -> (u32, u32) {
        (self.y, self.x)
    }
}

#![forbid(unsafe_code)]

//! Font measurement seam.
//!
//! The overlay never rasterizes text; it only needs widths to size
//! notifications and a line height for popup geometry. Owners plug their
//! font backend in through [`TextMetrics`]. [`MonospaceMetrics`] is a
//! cell-grid implementation based on Unicode display width, suitable for
//! terminal frontends and tests.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Text measurement provided by the owner's font backend.
pub trait TextMetrics: Send + Sync {
    /// Rendered width of `text` in pixels.
    fn text_width(&self, text: &str) -> f32;

    /// Height of one line of text in pixels.
    fn line_height(&self) -> f32;
}

/// Fixed-advance metrics: every display column is `cell_width` pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceMetrics {
    cell_width: f32,
    line_height: f32,
}

impl MonospaceMetrics {
    /// Create metrics for a grid of `cell_width` × `line_height` cells.
    #[must_use]
    pub const fn new(cell_width: f32, line_height: f32) -> Self {
        Self {
            cell_width,
            line_height,
        }
    }
}

impl Default for MonospaceMetrics {
    fn default() -> Self {
        Self::new(8.0, 16.0)
    }
}

impl TextMetrics for MonospaceMetrics {
    fn text_width(&self, text: &str) -> f32 {
        text.width() as f32 * self.cell_width
    }

    fn line_height(&self) -> f32 {
        self.line_height
    }
}

/// Break `text` into at most two lines of roughly `column` graphemes.
///
/// Breaks at the last whitespace boundary before the column when one exists,
/// otherwise mid-word. Overflow past the second line stays on the second
/// line; the renderer clips it.
#[must_use]
pub fn wrap_two_lines(text: &str, column: usize) -> String {
    let column = column.max(1);
    let graphemes: Vec<(usize, &str)> = text.grapheme_indices(true).collect();
    if graphemes.len() <= column {
        return text.to_owned();
    }

    let limit = graphemes[column].0;
    let head = &text[..limit];
    let split = head
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, _)| i)
        .filter(|&i| i > 0);

    let (first, rest) = match split {
        Some(i) => (&text[..i], text[i..].trim_start()),
        None => (head, &text[limit..]),
    };
    let mut out = String::with_capacity(text.len() + 1);
    out.push_str(first.trim_end());
    out.push('\n');
    out.push_str(rest);
    out
}

//! Calibration from frames with known content.
//!
//! The caller presents a frame in which every digit is known and names the
//! expected glyphs; each segment's sample then refines that segment's "on"
//! or "off" luminance range. Updates widen only, so repeated calibration
//! converges instead of oscillating.

use image::GrayImage;

use crate::decoder::PanelDecoder;
use crate::geometry::{rotate_about_center, sample_line};
use crate::glyph;
use crate::template::DP_SLOT;

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors raised by [`PanelDecoder::calibrate`].
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Expected string names a different number of digits than the layout.
    LengthMismatch {
        /// Digits configured in the layout.
        expected: usize,
        /// Glyphs found in the presented string.
        got: usize,
    },
    /// A presented character is outside the calibratable glyph set.
    ///
    /// The remaining digits were still updated before this was returned.
    UnknownChar {
        /// Index of the implicated digit.
        digit: usize,
        /// The rejected character.
        ch: char,
    },
}

impl std::fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LengthMismatch { expected, got } => {
                write!(f, "expected string has {} glyphs, layout has {} digits", got, expected)
            }
            Self::UnknownChar { digit, ch } => {
                write!(f, "digit {}: {:?} is not a calibratable glyph", digit, ch)
            }
        }
    }
}

impl std::error::Error for CalibrationError {}

// ── Expected-string parsing ────────────────────────────────────────────────

/// One expected cell: a glyph plus whether its decimal point is lit.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ExpectedCell {
    ch: char,
    dp: bool,
}

/// Split an expected string into per-digit cells. A `'.'` binds to the
/// preceding glyph ("88.8" is three cells, the middle one with a lit
/// decimal point).
fn parse_expected(s: &str) -> Vec<ExpectedCell> {
    let mut cells: Vec<ExpectedCell> = Vec::new();
    for c in s.chars() {
        if c == '.' {
            if let Some(last) = cells.last_mut() {
                last.dp = true;
            }
        } else {
            cells.push(ExpectedCell { ch: c, dp: false });
        }
    }
    cells
}

impl PanelDecoder {
    /// Learn per-segment luminance ranges from a frame of known content.
    ///
    /// `expected` holds one glyph per digit in template order, optionally
    /// followed by `'.'` where that digit's decimal point is lit. Digits
    /// whose expected character is unknown are skipped (and reported via
    /// [`CalibrationError::UnknownChar`]); every other digit still updates.
    /// Out-of-bounds templates are skipped silently: there is nothing to
    /// observe.
    pub fn calibrate(
        &mut self,
        frame: &GrayImage,
        expected: &str,
    ) -> Result<(), CalibrationError> {
        let cells = parse_expected(expected);
        if cells.len() != self.templates.len() {
            return Err(CalibrationError::LengthMismatch {
                expected: self.templates.len(),
                got: cells.len(),
            });
        }

        let work;
        let img = if self.rotation_deg != 0.0 {
            work = rotate_about_center(frame, self.rotation_deg);
            &work
        } else {
            frame
        };
        let (w, h) = img.dimensions();

        let mut first_bad: Option<(usize, char)> = None;
        for (idx, (tpl, cell)) in self.templates.iter_mut().zip(&cells).enumerate() {
            let Some(mask) = glyph::glyph_to_mask(cell.ch) else {
                first_bad.get_or_insert((idx, cell.ch));
                continue;
            };
            if !tpl.in_bounds(w, h) {
                continue;
            }
            let segments = tpl.segments;
            for (slot, seg) in segments.iter().enumerate() {
                let v = sample_line(img, seg);
                tpl.observe(slot, v, mask & (1 << slot) != 0);
            }
            if let Some(dp_line) = tpl.dp {
                let v = sample_line(img, &dp_line);
                tpl.observe(DP_SLOT, v, cell.dp);
            }
        }

        match first_bad {
            Some((digit, ch)) => Err(CalibrationError::UnknownChar { digit, ch }),
            None => Ok(()),
        }
    }
}

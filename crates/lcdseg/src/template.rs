//! Per-digit sample geometry and calibration state.
//!
//! A [`DigitTemplate`] is the decoder's precomputed geometry for one LCD
//! cell: where its seven segments (and optional decimal point) lie, plus the
//! learned luminance range for each sample slot.

use crate::geometry::{Point, SegmentLine};
use crate::glyph;

/// Sample-slot index of the decimal point (slots 0..6 are the segments).
pub const DP_SLOT: usize = 7;

/// Guard margin enforced between `min` and `max` after calibration.
pub(crate) const RANGE_EPS: u8 = 1;

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors raised while building a decoder from configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Bounding box has zero or negative extent.
    EmptyBbox {
        /// Index of the offending digit in the layout.
        digit: usize,
    },
    /// A proportional shape knob is outside its valid range.
    BadShapeParams {
        /// Index of the offending digit in the layout.
        digit: usize,
        /// Human-readable description of the violated constraint.
        reason: &'static str,
    },
    /// The derived segment geometry is degenerate (bbox too small for the
    /// configured stroke / row fractions).
    ImpossibleGeometry {
        /// Index of the offending digit in the layout.
        digit: usize,
    },
    /// A `fixed` character is not one of the ten decimal digits.
    UnknownFixedChar {
        /// Index of the offending digit in the layout.
        digit: usize,
        /// The rejected character.
        ch: char,
    },
    /// Layout-level problem (schema, threshold, empty digit list, I/O).
    Layout(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyBbox { digit } => write!(f, "digit {}: empty bounding box", digit),
            Self::BadShapeParams { digit, reason } => {
                write!(f, "digit {}: bad shape params: {}", digit, reason)
            }
            Self::ImpossibleGeometry { digit } => {
                write!(f, "digit {}: bbox too small for segment geometry", digit)
            }
            Self::UnknownFixedChar { digit, ch } => {
                write!(f, "digit {}: fixed char {:?} is not a decimal digit", digit, ch)
            }
            Self::Layout(msg) => write!(f, "panel layout: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// ── Shape parameters ───────────────────────────────────────────────────────

/// Proportional knobs locating the seven segments inside a bounding box.
///
/// All values are fractions of the bbox extent. Defaults match typical
/// utility-meter LCD cells.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ShapeParams {
    /// Stroke width of one segment bar.
    pub stroke: f32,
    /// Height at which the top-half vertical segments end.
    pub top_height: f32,
    /// Vertical position of the middle horizontal segment.
    pub middle: f32,
}

impl Default for ShapeParams {
    fn default() -> Self {
        Self {
            stroke: 0.1,
            top_height: 0.45,
            middle: 0.5,
        }
    }
}

impl ShapeParams {
    fn validate(&self, digit: usize) -> Result<(), ConfigError> {
        let check = |ok: bool, reason: &'static str| {
            if ok {
                Ok(())
            } else {
                Err(ConfigError::BadShapeParams { digit, reason })
            }
        };
        check(
            self.stroke > 0.0 && self.stroke < 0.5,
            "stroke must be in (0, 0.5)",
        )?;
        check(
            self.top_height > 0.0 && self.top_height < 1.0,
            "top_height must be in (0, 1)",
        )?;
        check(
            self.middle > 0.0 && self.middle < 1.0,
            "middle must be in (0, 1)",
        )?;
        check(
            self.top_height <= self.middle,
            "top_height must not exceed middle",
        )
    }
}

// ── Digit template ─────────────────────────────────────────────────────────

/// Geometry and calibration state of one digit on the panel.
///
/// Segment order is the canonical TL, TM, TR, BR, BM, BL, MM; slot 7 is the
/// decimal point. `min`/`max` start at the neutral `(0, 255)` range so an
/// uncalibrated decoder fails visibly rather than silently.
#[derive(Debug, Clone)]
pub struct DigitTemplate {
    /// Diagonal of the digit's bounding region.
    pub bbox: (Point, Point),
    /// Sample lines in canonical segment order.
    pub segments: [SegmentLine; 7],
    /// Decimal-point sample line below the bottom-right corner.
    pub dp: Option<SegmentLine>,
    /// A priori known character; the digit always decodes to it.
    pub fixed: Option<char>,
    pub(crate) min: [u8; 8],
    pub(crate) max: [u8; 8],
    pub(crate) seen_on: [bool; 8],
    pub(crate) seen_off: [bool; 8],
    pub(crate) unreliable: [bool; 8],
}

impl DigitTemplate {
    /// Derive the seven sample lines (and optional decimal point) from a
    /// bounding box and shape parameters.
    ///
    /// `digit` is only used to label errors.
    pub fn new(
        digit: usize,
        bbox: (Point, Point),
        params: ShapeParams,
        fixed: Option<char>,
        decimal_point: bool,
    ) -> Result<Self, ConfigError> {
        let (p0, p1) = bbox;
        if p1.x <= p0.x || p1.y <= p0.y {
            return Err(ConfigError::EmptyBbox { digit });
        }
        params.validate(digit)?;
        if let Some(c) = fixed {
            if glyph::digit_to_mask(c).is_none() {
                return Err(ConfigError::UnknownFixedChar { digit, ch: c });
            }
        }

        let w = (p1.x - p0.x) as f32;
        let h = (p1.y - p0.y) as f32;
        let sx = params.stroke * w;
        let sy = params.stroke * h;
        let y_top = p0.y as f32 + params.top_height * h;
        let y_mid = p0.y as f32 + params.middle * h;

        let px = |v: f32| v.round() as i32;
        let line = |x0: f32, y0: f32, x1: f32, y1: f32| {
            SegmentLine::new(Point::new(px(x0), px(y0)), Point::new(px(x1), px(y1)))
        };

        let (x0, y0) = (p0.x as f32, p0.y as f32);
        let (x1, y1) = (p1.x as f32, p1.y as f32);

        // Horizontal bars sample through the bar centre; vertical bars are
        // inset by half a stroke from the bbox edge.
        let tl = line(x0 + sx / 2.0, y0 + sy, x0 + sx / 2.0, y_top);
        let tm = line(x0 + sx, y0 + sy / 2.0, x1 - sx, y0 + sy / 2.0);
        let tr = line(x1 - sx / 2.0, y0 + sy, x1 - sx / 2.0, y_top);
        let br = line(x1 - sx / 2.0, y_mid + sy, x1 - sx / 2.0, y1 - sy);
        let bm = line(x0 + sx, y1 - sy / 2.0, x1 - sx, y1 - sy / 2.0);
        let bl = line(x0 + sx / 2.0, y_mid + sy, x0 + sx / 2.0, y1 - sy);
        let mm = line(x0 + sx, y_mid, x1 - sx, y_mid);

        let vertical_ok = tl.p1.y > tl.p0.y && bl.p1.y > bl.p0.y;
        let horizontal_ok = tm.p1.x > tm.p0.x;
        if !vertical_ok || !horizontal_ok {
            return Err(ConfigError::ImpossibleGeometry { digit });
        }

        let dp = decimal_point.then(|| line(x1, y1 + sy, x1 + sx, y1 + sy));

        Ok(Self {
            bbox,
            segments: [tl, tm, tr, br, bm, bl, mm],
            dp,
            fixed,
            min: [0; 8],
            max: [255; 8],
            seen_on: [false; 8],
            seen_off: [false; 8],
            unreliable: [false; 8],
        })
    }

    /// All sample lines (including the decimal point) inside a `w`×`h` image.
    pub fn in_bounds(&self, w: u32, h: u32) -> bool {
        self.segments.iter().all(|s| s.in_bounds(w, h))
            && self.dp.map_or(true, |s| s.in_bounds(w, h))
    }

    /// Learned luminance range of one sample slot.
    pub fn range(&self, slot: usize) -> (u8, u8) {
        (self.min[slot], self.max[slot])
    }

    /// Whether a slot's calibration has been flagged unreliable.
    pub fn is_unreliable(&self, slot: usize) -> bool {
        self.unreliable[slot]
    }

    /// Classification threshold of one slot for a global fraction `t`.
    pub(crate) fn threshold(&self, slot: usize, t: f32) -> f32 {
        let min = self.min[slot] as f32;
        let max = self.max[slot] as f32;
        min + t * (max - min)
    }

    /// Fold a fresh luminance observation into the slot's range.
    ///
    /// The first observation of each kind replaces the neutral default;
    /// later observations only widen the range. A crossed range (min above
    /// max − ε) keeps the last observation but marks the slot unreliable.
    pub(crate) fn observe(&mut self, slot: usize, v: u8, on: bool) {
        if on {
            self.max[slot] = if self.seen_on[slot] {
                self.max[slot].max(v)
            } else {
                v
            };
            self.seen_on[slot] = true;
        } else {
            self.min[slot] = if self.seen_off[slot] {
                self.min[slot].min(v)
            } else {
                v
            };
            self.seen_off[slot] = true;
        }
        self.unreliable[slot] = self.min[slot] > self.max[slot].saturating_sub(RANGE_EPS);
    }

    /// Overwrite a slot's range wholesale (persistence restore path).
    pub(crate) fn restore(&mut self, slot: usize, min: u8, max: u8) {
        self.min[slot] = min;
        self.max[slot] = max;
        self.seen_on[slot] = true;
        self.seen_off[slot] = true;
        self.unreliable[slot] = min > max.saturating_sub(RANGE_EPS);
    }

    /// Reset a slot to the neutral uncalibrated range.
    pub(crate) fn reset(&mut self, slot: usize) {
        self.min[slot] = 0;
        self.max[slot] = 255;
        self.seen_on[slot] = false;
        self.seen_off[slot] = false;
        self.unreliable[slot] = false;
    }
}

//! Diagnostic sample overlays.
//!
//! [`PanelDecoder::sample_marks`] returns the overlay as vector geometry so
//! tests and viewers can inspect classifications without parsing pixels;
//! [`draw_marks`] is the convenience that rasterises them onto an RGB copy
//! of the frame.

use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::decoder::{segment_on, PanelDecoder};
use crate::geometry::{sample_line, SegmentLine};
use crate::template::DP_SLOT;

/// Classification of one sample site for overlay colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkClass {
    /// Sample exceeded its threshold.
    On,
    /// Sample at or below its threshold.
    Off,
    /// Slot calibration was flagged unreliable.
    Unreliable,
}

/// One overlay element: where a sample was taken and how it classified.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SampleMark {
    /// Digit index in template order.
    pub digit: usize,
    /// Sample slot: 0..6 segments, 7 decimal point.
    pub slot: usize,
    /// The sampling line in working-frame coordinates.
    pub line: SegmentLine,
    pub class: MarkClass,
}

const COLOR_ON: Rgb<u8> = Rgb([0, 200, 0]);
const COLOR_OFF: Rgb<u8> = Rgb([220, 0, 0]);
const COLOR_UNRELIABLE: Rgb<u8> = Rgb([230, 200, 0]);

impl MarkClass {
    fn color(self) -> Rgb<u8> {
        match self {
            Self::On => COLOR_ON,
            Self::Off => COLOR_OFF,
            Self::Unreliable => COLOR_UNRELIABLE,
        }
    }
}

impl PanelDecoder {
    /// Classify every sample site against a frame and return the overlay
    /// geometry. Coordinates refer to [`PanelDecoder::working_frame`] of the
    /// input (identical to the input when no rotation is configured).
    pub fn sample_marks(&self, frame: &GrayImage) -> Vec<SampleMark> {
        let img = self.working_frame(frame);
        let mut marks = Vec::with_capacity(self.templates.len() * 8);
        for (digit, tpl) in self.templates.iter().enumerate() {
            let sites = tpl
                .segments
                .iter()
                .copied()
                .enumerate()
                .chain(tpl.dp.map(|l| (DP_SLOT, l)));
            for (slot, line) in sites {
                let class = if tpl.is_unreliable(slot) {
                    MarkClass::Unreliable
                } else if segment_on(sample_line(&img, &line), tpl.threshold(slot, self.threshold))
                {
                    MarkClass::On
                } else {
                    MarkClass::Off
                };
                marks.push(SampleMark {
                    digit,
                    slot,
                    line,
                    class,
                });
            }
        }
        marks
    }
}

/// Rasterise overlay marks onto a canvas.
///
/// With `fill = false` each mark is drawn as its sampling line; with
/// `fill = true` as a small filled rectangle centred on the line. Green for
/// "on", red for "off", yellow for unreliable calibration.
pub fn draw_marks(canvas: &mut RgbImage, marks: &[SampleMark], fill: bool) {
    for mark in marks {
        let color = mark.class.color();
        if fill {
            let m = mark.line.midpoint();
            let rect = Rect::at(m.x - 2, m.y - 2).of_size(5, 5);
            draw_filled_rect_mut(canvas, rect, color);
        } else {
            draw_line_segment_mut(
                canvas,
                (mark.line.p0.x as f32, mark.line.p0.y as f32),
                (mark.line.p1.x as f32, mark.line.p1.y as f32),
                color,
            );
        }
    }
}

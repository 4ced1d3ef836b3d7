//! lcdseg — seven-segment LCD panel decoder for camera-read utility meters.
//!
//! Given a grayscale frame and a panel layout (where each digit cell sits
//! and how its segments are proportioned), the decoder produces one decoded
//! glyph per digit plus per-digit validity. The stages are:
//!
//! 1. **Geometry** – optional frame rotation, line-mean luminance sampling.
//! 2. **Template** – seven sample lines (and optional decimal point) derived
//!    from each digit's bounding box.
//! 3. **Calibration** – per-segment adaptive "off"/"on" luminance ranges,
//!    learned from frames with known content and persisted as a text cache.
//! 4. **Classification** – per-segment thresholding into a seven-bit mask,
//!    mapped to a glyph through the segment table.
//!
//! # Public API
//! - [`PanelLayout`] / [`PanelLayoutBuilder`] and [`PanelDecoder`] as the
//!   primary entry points
//! - [`PanelReading`] / [`DigitReading`] as the per-frame result
//! - [`sample_marks`](PanelDecoder::sample_marks) / [`draw_marks`] for
//!   diagnostic overlays
//!
//! The core is synchronous and deterministic, never logs, and holds no
//! per-frame state: calibration lives on the templates and is mutated only
//! by [`PanelDecoder::calibrate`] and
//! [`PanelDecoder::load_calibration`].

mod calib;
mod decoder;
pub mod geometry;
pub mod glyph;
mod overlay;
mod panel;
mod persist;
mod template;
#[cfg(test)]
mod test_utils;

pub use calib::CalibrationError;
pub use decoder::{DigitReading, PanelDecoder, PanelReading};
pub use overlay::{draw_marks, MarkClass, SampleMark};
pub use panel::{DigitConfig, PanelLayout, PanelLayoutBuilder};
pub use persist::PersistenceError;
pub use template::{ConfigError, DigitTemplate, ShapeParams, DP_SLOT};

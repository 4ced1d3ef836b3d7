//! Per-frame decode orchestration.
//!
//! [`PanelDecoder`] is the primary entry point: construct once from a
//! [`PanelLayout`], optionally restore or learn calibration, then decode an
//! arbitrary number of frames. All operations are synchronous and
//! deterministic; nothing here logs — diagnostics travel in the result.

use image::GrayImage;

use crate::geometry::{rotate_about_center, sample_line};
use crate::glyph;
use crate::panel::PanelLayout;
use crate::template::{ConfigError, DigitTemplate, DP_SLOT};

/// Decoded state of one digit cell in one frame.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DigitReading {
    /// Decoded glyph, with a `.` suffix when the decimal point is lit.
    /// `"?"` for an unrecognised mask or an out-of-bounds template.
    pub text: String,
    /// Whether the sampled mask maps to a recognised glyph.
    pub valid: bool,
    /// Raw seven-bit segment mask, reported verbatim for diagnostics.
    pub mask: u8,
    /// Mean luminance sampled on each of the seven segments.
    pub samples: [u8; 7],
    /// Whether the decimal-point sample exceeded its threshold.
    pub dp: bool,
}

impl DigitReading {
    fn out_of_bounds() -> Self {
        Self {
            text: glyph::PLACEHOLDER.to_string(),
            valid: false,
            mask: 0,
            samples: [0; 7],
            dp: false,
        }
    }
}

/// Full decode result for a single frame.
///
/// `digits` follows the template sequence of the layout; its length always
/// equals the configured digit count.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PanelReading {
    pub digits: Vec<DigitReading>,
    /// Dimensions `[width, height]` of the sampled (possibly rotated) frame.
    pub image_size: [u32; 2],
}

impl PanelReading {
    /// Concatenated digit texts, e.g. `"0123.4"`.
    ///
    /// Turning this into a number (and applying sign) is the caller's job.
    pub fn text(&self) -> String {
        self.digits.iter().map(|d| d.text.as_str()).collect()
    }

    /// True when every digit decoded to a recognised glyph.
    pub fn all_valid(&self) -> bool {
        self.digits.iter().all(|d| d.valid)
    }
}

/// Seven-segment panel decoder.
///
/// Holds the digit templates (geometry plus calibration state) and the
/// global threshold fraction. Not internally synchronised; wrap it in a
/// mutex if frames and calibration arrive from different threads.
#[derive(Debug, Clone)]
pub struct PanelDecoder {
    pub(crate) templates: Vec<DigitTemplate>,
    pub(crate) threshold: f32,
    pub(crate) rotation_deg: f64,
}

impl PanelDecoder {
    /// Build a decoder from a validated layout.
    pub fn from_layout(layout: &PanelLayout) -> Result<Self, ConfigError> {
        Ok(Self {
            templates: layout.build_templates()?,
            threshold: layout.threshold,
            rotation_deg: layout.rotation_deg,
        })
    }

    /// Number of digit cells.
    pub fn digit_count(&self) -> usize {
        self.templates.len()
    }

    /// Digit templates in display order.
    pub fn templates(&self) -> &[DigitTemplate] {
        &self.templates
    }

    /// Global threshold fraction `t`.
    pub fn threshold_fraction(&self) -> f32 {
        self.threshold
    }

    /// The frame the sample geometry applies to: the input itself, or its
    /// rotated copy when the layout configures a rotation.
    pub fn working_frame(&self, frame: &GrayImage) -> GrayImage {
        if self.rotation_deg != 0.0 {
            rotate_about_center(frame, self.rotation_deg)
        } else {
            frame.clone()
        }
    }

    /// Decode every digit in a frame.
    ///
    /// Calibration state is read-only here; a template whose sample lines
    /// fall outside the frame yields an invalid reading for that digit
    /// without affecting the others.
    pub fn decode(&self, frame: &GrayImage) -> PanelReading {
        let work;
        let img = if self.rotation_deg != 0.0 {
            work = rotate_about_center(frame, self.rotation_deg);
            &work
        } else {
            frame
        };
        let (w, h) = img.dimensions();
        let digits = self
            .templates
            .iter()
            .map(|tpl| self.decode_digit(tpl, img, w, h))
            .collect();
        PanelReading {
            digits,
            image_size: [w, h],
        }
    }

    fn decode_digit(&self, tpl: &DigitTemplate, img: &GrayImage, w: u32, h: u32) -> DigitReading {
        if !tpl.in_bounds(w, h) {
            return DigitReading::out_of_bounds();
        }

        let mut samples = [0u8; 7];
        let mut mask = 0u8;
        for (i, seg) in tpl.segments.iter().enumerate() {
            let v = sample_line(img, seg);
            samples[i] = v;
            if segment_on(v, tpl.threshold(i, self.threshold)) {
                mask |= 1 << i;
            }
        }

        let dp = tpl
            .dp
            .map(|line| {
                let v = sample_line(img, &line);
                segment_on(v, tpl.threshold(DP_SLOT, self.threshold))
            })
            .unwrap_or(false);

        let mut reading = match tpl.fixed {
            Some(c) => DigitReading {
                text: c.to_string(),
                valid: true,
                mask: glyph::digit_to_mask(c).unwrap_or(0),
                samples,
                dp,
            },
            None => match glyph::mask_to_char(mask) {
                Some(c) => DigitReading {
                    text: c.to_string(),
                    valid: true,
                    mask,
                    samples,
                    dp,
                },
                None => DigitReading {
                    text: glyph::PLACEHOLDER.to_string(),
                    valid: false,
                    mask,
                    samples,
                    dp,
                },
            },
        };
        if dp {
            reading.text.push('.');
        }
        reading
    }
}

/// Strict-greater threshold comparison shared by decode and overlays.
pub(crate) fn segment_on(sample: u8, threshold: f32) -> bool {
    sample as f32 > threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::PanelLayoutBuilder;
    use crate::test_utils::{paint_bar, render_panel};
    use crate::PanelLayout;

    fn one_digit_layout() -> PanelLayout {
        PanelLayoutBuilder::new("s1")
            .digit([0, 0, 100, 60])
            .build()
            .unwrap()
    }

    #[test]
    fn threshold_is_strict_greater() {
        // min=0, max=100, t=0.5: a sample of 50 is off, 51 is on.
        assert!(!segment_on(50, 0.0 + 0.5 * 100.0));
        assert!(segment_on(51, 0.0 + 0.5 * 100.0));
    }

    #[test]
    fn decodes_full_eight() {
        // S1: white-on-black "8", every segment lit.
        let decoder = PanelDecoder::from_layout(&one_digit_layout()).unwrap();
        let img = render_panel(decoder.templates(), "8", 255, 0, 100, 60);
        let reading = decoder.decode(&img);
        assert_eq!(reading.digits.len(), 1);
        let d = &reading.digits[0];
        assert_eq!(d.text, "8");
        assert!(d.valid);
        assert_eq!(d.mask, 0x7F);
    }

    #[test]
    fn masked_top_right_becomes_six() {
        // S2: same frame with TR painted out.
        let decoder = PanelDecoder::from_layout(&one_digit_layout()).unwrap();
        let mut img = render_panel(decoder.templates(), "8", 255, 0, 100, 60);
        paint_bar(&mut img, &decoder.templates()[0].segments[2], 0, 4);
        let d = &decoder.decode(&img).digits[0];
        assert_eq!(d.text, "6");
        assert!(d.valid);
        assert_eq!(d.mask, 0x7B);
    }

    fn six_digit_layout() -> PanelLayout {
        let mut b = PanelLayoutBuilder::new("s3");
        for i in 0..6i32 {
            b = b.digit([i * 40 + 4, 2, i * 40 + 34, 58]);
        }
        b.build().unwrap()
    }

    #[test]
    fn decodes_six_digit_sequence() {
        // S3: "012345" across six cells.
        let decoder = PanelDecoder::from_layout(&six_digit_layout()).unwrap();
        let img = render_panel(decoder.templates(), "012345", 255, 0, 250, 60);
        let reading = decoder.decode(&img);
        let texts: Vec<&str> = reading.digits.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, ["0", "1", "2", "3", "4", "5"]);
        assert!(reading.all_valid());
        let masks: Vec<u8> = reading.digits.iter().map(|d| d.mask).collect();
        assert_eq!(masks, [0x3F, 0x0C, 0x76, 0x5E, 0x4D, 0x5B]);
        assert_eq!(reading.text(), "012345");
    }

    #[test]
    fn calibrated_decode_with_dim_panel() {
        // S4: learn "on" levels from an all-eights frame at reduced
        // contrast, then read a different value at the same contrast.
        let mut decoder = PanelDecoder::from_layout(&six_digit_layout()).unwrap();
        let teach = render_panel(decoder.templates(), "888888", 200, 30, 250, 60);
        decoder.calibrate(&teach, "888888").unwrap();
        let img = render_panel(decoder.templates(), "012345", 200, 30, 250, 60);
        let reading = decoder.decode(&img);
        assert!(reading.all_valid(), "readings: {:?}", reading.digits);
        assert_eq!(reading.text(), "012345");
    }

    #[test]
    fn nonsense_mask_reports_placeholder() {
        // S6: TL, BR and MM lit simultaneously (0x49) matches no glyph.
        let decoder = PanelDecoder::from_layout(&one_digit_layout()).unwrap();
        let mut img = GrayImage::new(100, 60);
        let tpl = &decoder.templates()[0];
        for slot in [0usize, 3, 6] {
            paint_bar(&mut img, &tpl.segments[slot], 255, 4);
        }
        let d = &decoder.decode(&img).digits[0];
        assert!(!d.valid);
        assert_eq!(d.text, "?");
        assert_eq!(d.mask, 0x49);
    }

    #[test]
    fn fixed_digit_always_emits_its_char() {
        let layout = PanelLayoutBuilder::new("fixed")
            .fixed_digit([0, 0, 100, 60], '1')
            .build()
            .unwrap();
        let decoder = PanelDecoder::from_layout(&layout).unwrap();
        // Dark frame and an all-lit frame both read "1".
        let dark = GrayImage::new(100, 60);
        let lit = render_panel(decoder.templates(), "8", 255, 0, 100, 60);
        for img in [&dark, &lit] {
            let d = &decoder.decode(img).digits[0];
            assert_eq!(d.text, "1");
            assert!(d.valid);
            assert_eq!(d.mask, 0x0C);
        }
    }

    #[test]
    fn out_of_bounds_digit_is_isolated() {
        // Second cell extends past the frame; the first still classifies.
        let layout = PanelLayoutBuilder::new("oob")
            .digit([0, 0, 100, 60])
            .digit([110, 0, 210, 60])
            .build()
            .unwrap();
        let decoder = PanelDecoder::from_layout(&layout).unwrap();
        let img = render_panel(&decoder.templates()[..1], "8", 255, 0, 140, 60);
        let reading = decoder.decode(&img);
        assert_eq!(reading.digits[0].text, "8");
        assert!(reading.digits[0].valid);
        assert!(!reading.digits[1].valid);
        assert_eq!(reading.digits[1].text, "?");
    }

    #[test]
    fn decimal_point_appends_suffix() {
        let layout = PanelLayoutBuilder::new("dp")
            .digit_with([0, 0, 100, 60], Default::default(), true)
            .build()
            .unwrap();
        let decoder = PanelDecoder::from_layout(&layout).unwrap();
        // Frame must cover the dp sample site right of the bbox.
        let mut img = render_panel(decoder.templates(), "5", 255, 0, 130, 80);
        let d = &decoder.decode(&img).digits[0];
        assert_eq!(d.text, "5");
        assert!(!d.dp);

        let dp_line = decoder.templates()[0].dp.unwrap();
        paint_bar(&mut img, &dp_line, 255, 3);
        let d = &decoder.decode(&img).digits[0];
        assert_eq!(d.text, "5.");
        assert!(d.dp);
        assert_eq!(d.mask, 0x5B, "decimal point does not disturb the mask");
    }

    #[test]
    fn rotated_layout_samples_rotated_frame() {
        // Render a flat panel, tilt it by +5° (fake camera roll), and decode
        // with a layout that compensates via rotation_deg = -5. After the
        // compensating rotation the panel sits unrotated and centred on the
        // grown canvas, so the bbox just needs the centring offset.
        let flat_layout = PanelLayoutBuilder::new("rot-flat")
            .digit([40, 40, 140, 100])
            .build()
            .unwrap();
        let flat_decoder = PanelDecoder::from_layout(&flat_layout).unwrap();
        let flat = render_panel(flat_decoder.templates(), "8", 255, 0, 180, 140);
        let tilted = crate::geometry::rotate_about_center(&flat, 5.0);

        let s1 = tilted.width();
        let s2 = ((2 * s1 * s1) as f64).sqrt().ceil() as i32 + 1;
        let ox = (s2 - 180) / 2;
        let oy = (s2 - 140) / 2;
        let layout = PanelLayoutBuilder::new("rot")
            .digit([40 + ox, 40 + oy, 140 + ox, 100 + oy])
            .rotation_deg(-5.0)
            .build()
            .unwrap();
        let decoder = PanelDecoder::from_layout(&layout).unwrap();
        let reading = decoder.decode(&tilted);
        assert_eq!(
            reading.digits[0].text,
            "8",
            "mask=0x{:02X}",
            reading.digits[0].mask
        );
    }
}

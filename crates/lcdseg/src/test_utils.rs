//! Shared test utilities for synthetic panel frames.
//!
//! The renderer derives bar rectangles from the same template geometry the
//! decoder samples, so a painted segment always covers its sampling line.

use image::{GrayImage, Luma};

use crate::geometry::{line_pixels, SegmentLine};
use crate::glyph;
use crate::template::DigitTemplate;

/// Paint a bar: every pixel within Chebyshev distance `r` of the line.
pub(crate) fn paint_bar(img: &mut GrayImage, line: &SegmentLine, value: u8, r: i32) {
    let (w, h) = img.dimensions();
    for p in line_pixels(line.p0, line.p1) {
        for dy in -r..=r {
            for dx in -r..=r {
                let (x, y) = (p.x + dx, p.y + dy);
                if x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h {
                    img.put_pixel(x as u32, y as u32, Luma([value]));
                }
            }
        }
    }
}

/// Render a synthetic panel frame showing `text`.
///
/// `text` holds one glyph per template, each optionally followed by `'.'`
/// to light that digit's decimal point. Lit bars are painted `on`, the
/// background is `off`. Panics on glyphs without a mask; tests feed only
/// recognised glyphs.
pub(crate) fn render_panel(
    templates: &[DigitTemplate],
    text: &str,
    on: u8,
    off: u8,
    w: u32,
    h: u32,
) -> GrayImage {
    let mut img = GrayImage::from_pixel(w, h, Luma([off]));
    let mut chars = text.chars().peekable();
    for tpl in templates {
        let c = chars.next().expect("one glyph per template");
        let dp = chars.peek() == Some(&'.');
        if dp {
            chars.next();
        }
        let mask = glyph::glyph_to_mask(c).expect("renderable glyph");
        for (slot, seg) in tpl.segments.iter().enumerate() {
            if mask & (1 << slot) != 0 {
                paint_bar(&mut img, seg, on, 3);
            }
        }
        if dp {
            let line = tpl.dp.expect("dp in text requires dp in template");
            paint_bar(&mut img, &line, on, 3);
        }
    }
    img
}

/// Gaussian-blur a grayscale frame (float precision, then re-quantised).
pub(crate) fn blur_gray(img: &GrayImage, sigma: f32) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut f = image::ImageBuffer::<Luma<f32>, Vec<f32>>::new(w, h);
    for y in 0..h {
        for x in 0..w {
            f.put_pixel(x, y, Luma([img.get_pixel(x, y)[0] as f32 / 255.0]));
        }
    }
    let blurred = imageproc::filter::gaussian_blur_f32(&f, sigma);
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let v = blurred.get_pixel(x, y)[0].clamp(0.0, 1.0);
            out.put_pixel(x, y, Luma([(v * 255.0).round() as u8]));
        }
    }
    out
}

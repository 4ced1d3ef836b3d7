//! Pixel-space geometry primitives.
//!
//! Everything the decoder knows about an image goes through this module:
//! luminance derivation, frame rotation, and the line-mean sampler that
//! turns a [`SegmentLine`] into a scalar.

use image::{GrayImage, RgbImage};

/// Integer pixel coordinate in image space.
///
/// Coordinates may be negative or exceed the image dimensions; samplers
/// treat out-of-bounds pixels as luminance 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A straight sampling line between two pixels, endpoints inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SegmentLine {
    pub p0: Point,
    pub p1: Point,
}

impl SegmentLine {
    pub fn new(p0: Point, p1: Point) -> Self {
        Self { p0, p1 }
    }

    /// Both endpoints inside a `w`×`h` raster.
    pub fn in_bounds(&self, w: u32, h: u32) -> bool {
        let inside = |p: Point| p.x >= 0 && p.y >= 0 && (p.x as u32) < w && (p.y as u32) < h;
        inside(self.p0) && inside(self.p1)
    }

    /// Integer midpoint, used for overlay rectangle placement.
    pub fn midpoint(&self) -> Point {
        Point::new((self.p0.x + self.p1.x) / 2, (self.p0.y + self.p1.y) / 2)
    }
}

/// Integer BT.601 luminance: `Y = (77·R + 150·G + 29·B) >> 8`.
///
/// This is the single luminance model of the crate; every sampled value and
/// every test expectation is computed against it.
pub fn luma_bt601(r: u8, g: u8, b: u8) -> u8 {
    ((77 * r as u32 + 150 * g as u32 + 29 * b as u32) >> 8) as u8
}

/// Convert an RGB frame to grayscale with [`luma_bt601`].
pub fn rgb_to_gray(img: &RgbImage) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut out = GrayImage::new(w, h);
    for (x, y, p) in img.enumerate_pixels() {
        out.put_pixel(x, y, image::Luma([luma_bt601(p[0], p[1], p[2])]));
    }
    out
}

/// All pixels on the Bresenham line from `p0` to `p1`, endpoints inclusive.
/// Each touched pixel appears exactly once.
pub(crate) fn line_pixels(p0: Point, p1: Point) -> Vec<Point> {
    let mut out = Vec::new();
    let (mut x, mut y) = (p0.x, p0.y);
    let dx = (p1.x - p0.x).abs();
    let dy = -(p1.y - p0.y).abs();
    let sx = if p0.x < p1.x { 1 } else { -1 };
    let sy = if p0.y < p1.y { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        out.push(Point::new(x, y));
        if x == p1.x && y == p1.y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    out
}

/// Arithmetic mean of the luminance along a line, rounded to the nearest
/// integer. Out-of-bounds pixels contribute 0.
pub fn sample_line(img: &GrayImage, line: &SegmentLine) -> u8 {
    let (w, h) = img.dimensions();
    let pixels = line_pixels(line.p0, line.p1);
    let mut sum: u32 = 0;
    for p in &pixels {
        if p.x >= 0 && p.y >= 0 && (p.x as u32) < w && (p.y as u32) < h {
            sum += img.get_pixel(p.x as u32, p.y as u32)[0] as u32;
        }
    }
    let n = pixels.len() as u32;
    ((sum + n / 2) / n) as u8
}

/// Rotate an image clockwise about its centre by `angle_deg`.
///
/// The output canvas is the smallest axis-aligned square that contains the
/// source rotated through any angle: side `ceil(sqrt(w² + h²)) + 1`. The
/// source is centred on the canvas before rotation. Resampling is bilinear;
/// pixels that fall outside the rotated source are 0.
pub fn rotate_about_center(img: &GrayImage, angle_deg: f64) -> GrayImage {
    let (w, h) = img.dimensions();
    let side = (w as f64).hypot(h as f64).ceil() as u32 + 1;
    let mut out = GrayImage::new(side, side);

    let c = (side as f64 - 1.0) / 2.0;
    let ox = (side as f64 - w as f64) / 2.0;
    let oy = (side as f64 - h as f64) / 2.0;
    // Clockwise rotation of content means the inverse map rotates the
    // destination coordinate counter-clockwise (y grows downward).
    let (sin, cos) = angle_deg.to_radians().sin_cos();

    for y in 0..side {
        for x in 0..side {
            let dx = x as f64 - c;
            let dy = y as f64 - c;
            let sx = cos * dx + sin * dy + c - ox;
            let sy = -sin * dx + cos * dy + c - oy;
            let v = bilinear(img, sx, sy);
            out.put_pixel(x, y, image::Luma([v]));
        }
    }
    out
}

/// Bilinear sample at a fractional coordinate; out-of-bounds neighbours are 0.
fn bilinear(img: &GrayImage, x: f64, y: f64) -> u8 {
    let (w, h) = img.dimensions();
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let at = |xi: i64, yi: i64| -> f64 {
        if xi >= 0 && yi >= 0 && (xi as u32) < w && (yi as u32) < h {
            img.get_pixel(xi as u32, yi as u32)[0] as f64
        } else {
            0.0
        }
    };

    let x0 = x0 as i64;
    let y0 = y0 as i64;
    let v = at(x0, y0) * (1.0 - fx) * (1.0 - fy)
        + at(x0 + 1, y0) * fx * (1.0 - fy)
        + at(x0, y0 + 1) * (1.0 - fx) * fy
        + at(x0 + 1, y0 + 1) * fx * fy;
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn line_pixels_endpoints_inclusive() {
        let px = line_pixels(Point::new(2, 3), Point::new(7, 3));
        assert_eq!(px.len(), 6);
        assert_eq!(px.first(), Some(&Point::new(2, 3)));
        assert_eq!(px.last(), Some(&Point::new(7, 3)));
    }

    #[test]
    fn line_pixels_single_point() {
        let px = line_pixels(Point::new(4, 4), Point::new(4, 4));
        assert_eq!(px, vec![Point::new(4, 4)]);
    }

    #[test]
    fn line_pixels_diagonal_no_duplicates() {
        let px = line_pixels(Point::new(0, 0), Point::new(9, 4));
        let mut seen = std::collections::HashSet::new();
        for p in &px {
            assert!(seen.insert((p.x, p.y)), "pixel visited twice: {:?}", p);
        }
        assert!(px.len() >= 10);
    }

    #[test]
    fn sample_line_mean_and_oob_zero() {
        let mut img = GrayImage::new(10, 10);
        for x in 0..10 {
            img.put_pixel(x, 5, Luma([100]));
        }
        let full = SegmentLine::new(Point::new(0, 5), Point::new(9, 5));
        assert_eq!(sample_line(&img, &full), 100);

        // Half the line hangs off the left edge; those pixels count as 0.
        let half = SegmentLine::new(Point::new(-5, 5), Point::new(4, 5));
        assert_eq!(sample_line(&img, &half), 50);
    }

    #[test]
    fn luma_matches_integer_formula() {
        assert_eq!(luma_bt601(0, 0, 0), 0);
        assert_eq!(luma_bt601(255, 255, 255), 255);
        assert_eq!(luma_bt601(255, 0, 0), 76);
        assert_eq!(luma_bt601(0, 255, 0), 149);
        assert_eq!(luma_bt601(0, 0, 255), 28);
    }

    #[test]
    fn rotation_canvas_size() {
        let img = GrayImage::new(100, 60);
        let out = rotate_about_center(&img, 17.0);
        let side = ((100u32 * 100 + 60 * 60) as f64).sqrt().ceil() as u32 + 1;
        assert_eq!(out.dimensions(), (side, side));
    }

    #[test]
    fn rotation_preserves_uniform_disc() {
        // A uniform disc is rotation-invariant away from its rim, so a
        // rotate/unrotate pair must reproduce it within one grey level.
        let mut img = GrayImage::new(61, 61);
        for y in 0..61i32 {
            for x in 0..61i32 {
                let d2 = (x - 30).pow(2) + (y - 30).pow(2);
                if d2 <= 25 * 25 {
                    img.put_pixel(x as u32, y as u32, Luma([180]));
                }
            }
        }
        let once = rotate_about_center(&img, 9.0);
        let back = rotate_about_center(&once, -9.0);

        let c = (back.width() as i32 - 1) / 2;
        for y in -20..=20i32 {
            for x in -20..=20i32 {
                if x * x + y * y <= 20 * 20 {
                    let v = back.get_pixel((c + x) as u32, (c + y) as u32)[0];
                    assert!(
                        (v as i32 - 180).abs() <= 1,
                        "disc interior drifted at ({x},{y}): {v}"
                    );
                }
            }
        }
    }

    #[test]
    fn small_rotation_keeps_bar_classification() {
        // A bright bar rotated by less than a degree must still average
        // bright along its original sample line.
        let mut img = GrayImage::new(80, 80);
        for y in 38..=42 {
            for x in 10..70 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        let rot = rotate_about_center(&img, 0.5);
        let off_x = (rot.width() - 80) / 2;
        let off_y = (rot.height() - 80) / 2;
        let line = SegmentLine::new(
            Point::new(off_x as i32 + 15, off_y as i32 + 40),
            Point::new(off_x as i32 + 65, off_y as i32 + 40),
        );
        assert!(sample_line(&rot, &line) > 200);
    }
}

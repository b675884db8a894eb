// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Skew estimation and correction.
//
// The text region is isolated with a global Otsu threshold (after deciding
// whether ink is darker or lighter than the page), enclosed in its
// minimum-area rectangle, and the rectangle's orientation becomes the
// rotation that levels the text lines.
//
// Angles are in degrees, positive = clockwise on screen. Text that has been
// turned θ clockwise yields a correction of about −θ.

use image::{DynamicImage, GrayImage};
use imageproc::contrast::otsu_level;
use imageproc::geometry::min_area_rect;
use imageproc::point::Point;
use imageproc::stats::histogram;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::image::raster::{rotate_about_center, to_grayscale};

/// Median brightness below this marks a dark page.
pub const POLARITY_MIDPOINT: f32 = 127.0;

/// Whether the page is lighter or darker than its ink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    /// Dark ink on a light page: dark pixels are foreground.
    LightBackground,
    /// Light ink on a dark page: bright pixels are foreground.
    DarkBackground,
}

/// Outcome of [`estimate_skew`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkewEstimate {
    /// Rotation to apply, in degrees. Zero when correction was skipped.
    pub angle: f32,
    pub polarity: Polarity,
    pub foreground_pixels: usize,
    /// Orientation of the enclosing rectangle in `[-90, 0)`, if one was fitted.
    pub raw_angle: Option<f32>,
    /// The estimate exceeded the allowed magnitude and was reset to zero.
    pub dampened: bool,
}

/// Median of the plane's intensities. For an even count this is the mean
/// of the two middle values.
pub fn median_intensity(gray: &GrayImage) -> f32 {
    let total = gray.pixels().len();
    if total == 0 {
        return 0.0;
    }
    let hist = histogram(gray).channels[0];

    let nth = |rank: usize| -> f32 {
        let mut seen = 0;
        for (value, count) in hist.iter().enumerate() {
            seen += *count as usize;
            if seen > rank {
                return value as f32;
            }
        }
        255.0
    };

    if total % 2 == 1 {
        nth(total / 2)
    } else {
        (nth(total / 2 - 1) + nth(total / 2)) / 2.0
    }
}

/// Decide the page polarity from its median brightness.
pub fn classify_polarity(gray: &GrayImage) -> Polarity {
    if median_intensity(gray) < POLARITY_MIDPOINT {
        Polarity::DarkBackground
    } else {
        Polarity::LightBackground
    }
}

/// Otsu foreground mask (255 = ink) for the given polarity. A plane with a
/// single intensity has no foreground.
pub fn foreground_mask(gray: &GrayImage, polarity: Polarity) -> GrayImage {
    let (lo, hi) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
    if lo >= hi {
        return GrayImage::new(gray.width(), gray.height());
    }

    let level = otsu_level(gray);
    debug!(level, ?polarity, "Otsu level computed");
    let mut mask = gray.clone();
    for px in mask.pixels_mut() {
        let is_ink = match polarity {
            Polarity::DarkBackground => px.0[0] > level,
            Polarity::LightBackground => px.0[0] <= level,
        };
        px.0[0] = if is_ink { 255 } else { 0 };
    }
    mask
}

/// Foreground pixel count plus the outline points of the foreground: the
/// leftmost and rightmost foreground pixel of every row. Those span the same
/// convex hull as the full point set.
pub fn foreground_points(mask: &GrayImage) -> (usize, Vec<Point<i32>>) {
    let mut count = 0;
    let mut points = Vec::new();
    for (y, row) in mask.rows().enumerate() {
        let mut first = None;
        let mut last = None;
        for (x, px) in row.enumerate() {
            if px.0[0] > 0 {
                count += 1;
                first.get_or_insert(x);
                last = Some(x);
            }
        }
        if let (Some(first), Some(last)) = (first, last) {
            points.push(Point::new(first as i32, y as i32));
            if last != first {
                points.push(Point::new(last as i32, y as i32));
            }
        }
    }
    (count, points)
}

/// Orientation of a rectangle in `[-90, 0)`, measured along its longer side.
pub fn rect_angle(corners: &[Point<i32>; 4]) -> f32 {
    let edge = |a: Point<i32>, b: Point<i32>| ((b.x - a.x) as f32, (b.y - a.y) as f32);
    let first = edge(corners[0], corners[1]);
    let second = edge(corners[1], corners[2]);
    let len = |(dx, dy): (f32, f32)| dx.hypot(dy);
    let (dx, dy) = if len(first) >= len(second) { first } else { second };
    if dx == 0.0 && dy == 0.0 {
        return -90.0;
    }
    dy.atan2(dx).to_degrees().rem_euclid(90.0) - 90.0
}

/// Turn a rectangle orientation in `[-90, 0)` into the signed rotation
/// that levels it.
pub fn normalize_rect_angle(raw: f32) -> f32 {
    if raw < -45.0 { -(90.0 + raw) } else { -raw }
}

/// Reset an estimate whose magnitude exceeds `limit` to zero. Such angles
/// come from the rectangle locking onto a page border rather than text.
pub fn dampen_angle(angle: f32, limit: f32) -> f32 {
    if angle.abs() > limit { 0.0 } else { angle }
}

/// Estimate the correcting rotation for a grayscale page.
///
/// Fewer than `min_foreground` ink pixels (blank or near-blank pages) and
/// estimates beyond `max_skew` degrees both yield an angle of zero.
#[instrument(skip(gray), fields(width = gray.width(), height = gray.height()))]
pub fn estimate_skew(gray: &GrayImage, min_foreground: usize, max_skew: f32) -> SkewEstimate {
    let polarity = classify_polarity(gray);
    let mask = foreground_mask(gray, polarity);
    let (foreground_pixels, points) = foreground_points(&mask);

    let mut estimate = SkewEstimate {
        angle: 0.0,
        polarity,
        foreground_pixels,
        raw_angle: None,
        dampened: false,
    };

    if foreground_pixels < min_foreground.max(1) || points.len() < 2 {
        warn!(
            foreground_pixels,
            min_foreground, "Too little foreground to estimate skew; leaving page unrotated"
        );
        return estimate;
    }

    let raw = rect_angle(&min_area_rect(&points));
    let normalized = normalize_rect_angle(raw);
    let angle = dampen_angle(normalized, max_skew);
    debug!(raw, normalized, "Rectangle orientation");
    if angle != normalized {
        warn!(normalized, max_skew, "Skew estimate exceeds limit; not rotating");
        estimate.dampened = true;
    }

    estimate.raw_angle = Some(raw);
    // Avoid a signed zero leaking into reports.
    estimate.angle = if angle == 0.0 { 0.0 } else { angle };
    estimate
}

/// Estimate the skew of `image` and rotate it level.
///
/// The rotation is applied to `image` itself, not to its binarized form, and
/// keeps the original dimensions. Returns the rotated image and the applied
/// angle.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn deskew(image: &DynamicImage, min_foreground: usize, max_skew: f32) -> (DynamicImage, f32) {
    let estimate = estimate_skew(&to_grayscale(image), min_foreground, max_skew);
    if estimate.angle == 0.0 {
        return (image.clone(), 0.0);
    }
    info!(angle = estimate.angle, polarity = ?estimate.polarity, "Correcting skew");
    (rotate_about_center(image, estimate.angle), estimate.angle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::geometric_transformations::{Interpolation, rotate_about_center as turn};
    use imageproc::rect::Rect;

    /// Five dark text-like bars on a light page, turned `degrees` clockwise.
    fn ruled_page(degrees: f32) -> GrayImage {
        let mut page = GrayImage::from_pixel(200, 200, Luma([255]));
        for i in 0..5 {
            draw_filled_rect_mut(&mut page, Rect::at(30, 37 + 30 * i).of_size(140, 6), Luma([0]));
        }
        if degrees == 0.0 {
            return page;
        }
        turn(&page, degrees.to_radians(), Interpolation::Nearest, Luma([255]))
    }

    fn invert(gray: &GrayImage) -> GrayImage {
        let mut out = gray.clone();
        for px in out.pixels_mut() {
            px.0[0] = 255 - px.0[0];
        }
        out
    }

    #[test]
    fn median_of_even_count_averages_middle_values() {
        let gray = GrayImage::from_raw(2, 2, vec![10, 20, 100, 200]).unwrap();
        assert_eq!(median_intensity(&gray), 60.0);
    }

    #[test]
    fn polarity_follows_median() {
        assert_eq!(classify_polarity(&ruled_page(0.0)), Polarity::LightBackground);
        assert_eq!(classify_polarity(&invert(&ruled_page(0.0))), Polarity::DarkBackground);
        let exactly_mid = GrayImage::from_pixel(3, 3, Luma([127]));
        assert_eq!(classify_polarity(&exactly_mid), Polarity::LightBackground);
    }

    #[test]
    fn mask_marks_ink_for_both_polarities() {
        let page = ruled_page(0.0);
        let mask = foreground_mask(&page, Polarity::LightBackground);
        assert_eq!(mask.get_pixel(50, 39).0[0], 255);
        assert_eq!(mask.get_pixel(5, 5).0[0], 0);

        let dark = invert(&page);
        let mask = foreground_mask(&dark, Polarity::DarkBackground);
        assert_eq!(mask.get_pixel(50, 39).0[0], 255);
        assert_eq!(mask.get_pixel(5, 5).0[0], 0);
    }

    #[test]
    fn outline_keeps_row_extremes_only() {
        let mut mask = GrayImage::new(10, 3);
        for x in 2..8 {
            mask.put_pixel(x, 1, Luma([255]));
        }
        let (count, points) = foreground_points(&mask);
        assert_eq!(count, 6);
        assert_eq!(points, vec![Point::new(2, 1), Point::new(7, 1)]);
    }

    #[test]
    fn normalization_branches() {
        assert_eq!(normalize_rect_angle(-80.0), -10.0);
        assert_eq!(normalize_rect_angle(-10.0), 10.0);
        assert_eq!(normalize_rect_angle(-90.0), 0.0);
        assert_eq!(normalize_rect_angle(-45.0), 45.0);
    }

    #[test]
    fn large_estimates_are_dampened_to_zero() {
        assert_eq!(dampen_angle(46.0, 45.0), 0.0);
        assert_eq!(dampen_angle(-89.5, 45.0), 0.0);
        assert_eq!(dampen_angle(45.0, 45.0), 45.0);
        assert_eq!(dampen_angle(-12.0, 45.0), -12.0);
        assert_eq!(dampen_angle(20.0, 15.0), 0.0);
    }

    #[test]
    fn rect_angle_of_axis_aligned_rectangle() {
        let rect = [
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 4),
            Point::new(0, 4),
        ];
        assert_eq!(rect_angle(&rect), -90.0);
        assert_eq!(normalize_rect_angle(rect_angle(&rect)), 0.0);
    }

    #[test]
    fn recovers_known_rotation() {
        for theta in [-30.0f32, -15.0, -5.0, 5.0, 10.0, 25.0] {
            let estimate = estimate_skew(&ruled_page(theta), 10, 45.0);
            assert!(
                (estimate.angle + theta).abs() <= 2.0,
                "turned {theta}: estimated {}",
                estimate.angle
            );
            assert!(!estimate.dampened);
        }
    }

    #[test]
    fn dark_background_page_is_measured_too() {
        let estimate = estimate_skew(&invert(&ruled_page(12.0)), 10, 45.0);
        assert_eq!(estimate.polarity, Polarity::DarkBackground);
        assert!((estimate.angle + 12.0).abs() <= 2.0, "estimated {}", estimate.angle);
    }

    #[test]
    fn corrected_page_has_level_lines() {
        let skewed = DynamicImage::ImageLuma8(ruled_page(10.0));
        let (levelled, applied) = deskew(&skewed, 10, 45.0);
        assert!((applied + 10.0).abs() <= 2.0);
        assert_eq!((levelled.width(), levelled.height()), (200, 200));

        let residual = estimate_skew(&levelled.to_luma8(), 10, 45.0);
        assert!(residual.angle.abs() <= 2.0, "residual skew {}", residual.angle);
    }

    #[test]
    fn blank_page_is_left_alone() {
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(50, 40, Luma([230])));
        let (out, angle) = deskew(&blank, 10, 45.0);
        assert_eq!(angle, 0.0);
        assert_eq!(out, blank);
    }

    #[test]
    fn nearly_blank_page_is_left_alone() {
        let mut gray = GrayImage::from_pixel(50, 40, Luma([230]));
        for x in 0..9 {
            gray.put_pixel(10 + x, 10 + x, Luma([0]));
        }
        let estimate = estimate_skew(&gray, 10, 45.0);
        assert_eq!(estimate.foreground_pixels, 9);
        assert_eq!(estimate.angle, 0.0);
        assert_eq!(estimate.raw_angle, None);
    }

    #[test]
    fn tight_limit_dampens_real_skew() {
        let estimate = estimate_skew(&ruled_page(20.0), 10, 15.0);
        assert!(estimate.dampened);
        assert_eq!(estimate.angle, 0.0);
    }
}

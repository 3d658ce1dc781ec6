//! Hough-gradient circle detection.
//!
//! Every edge pixel casts votes along its gradient direction (both signs) at
//! each radius in `[min_radius, max_radius]`. Circle centers collect votes
//! from the whole rim and show up as accumulator peaks; a peak is reported
//! when the votes gathered in its 3x3 neighborhood exceed the sensitivity.
//! The radius of an accepted center is read from the histogram of edge
//! distances around it.
//!
//! Two passes run with identical parameters: first over the blurred
//! grayscale, then over the cleaned threshold mask. Their outputs are
//! concatenated in that order; cross-pass duplicates are left to
//! [`merge`](crate::merge::merge).

use image::GrayImage;

use crate::config::HoughConfig;
use crate::params::DetectionParameters;
use crate::preprocess::PreprocessedImage;

/// A detected circle in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Circle {
    /// Center x (px).
    pub center_x: f32,
    /// Center y (px).
    pub center_y: f32,
    /// Radius (px).
    pub radius: f32,
}

impl Circle {
    /// Construct from center and radius.
    pub fn new(center_x: f32, center_y: f32, radius: f32) -> Self {
        Self {
            center_x,
            center_y,
            radius,
        }
    }

    /// Euclidean distance between the two centers.
    pub fn center_distance(&self, other: &Circle) -> f32 {
        let dx = self.center_x - other.center_x;
        let dy = self.center_y - other.center_y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, Copy)]
struct CenterPeak {
    x: u32,
    y: u32,
    score: f32,
}

/// Deposit a weighted vote into the accumulator using bilinear interpolation.
#[inline]
fn bilinear_add_in_bounds(accum: &mut [f32], stride: usize, x: f32, y: f32, weight: f32) {
    let x0 = x as usize;
    let y0 = y as usize;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let base = y0 * stride + x0;
    accum[base] += weight * (1.0 - fx) * (1.0 - fy);
    accum[base + 1] += weight * fx * (1.0 - fy);
    accum[base + stride] += weight * (1.0 - fx) * fy;
    accum[base + stride + 1] += weight * fx * fy;
}

/// Integer radii in `[min_radius, max_radius]`, capped at `limit`.
fn search_radii(params: &DetectionParameters, limit: f32) -> Vec<f32> {
    let lo = params.min_radius().ceil();
    let hi = params.max_radius().min(limit).floor();
    if lo > hi {
        return Vec::new();
    }
    (lo as u32..=hi as u32).map(|r| r as f32).collect()
}

/// Sum of each cell's 3x3 neighborhood (zero outside the image).
fn box3_sum(accum: &[f32], w: usize, h: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; accum.len()];
    for y in 0..h {
        let y_lo = y.saturating_sub(1);
        let y_hi = (y + 1).min(h - 1);
        for x in 0..w {
            let x_lo = x.saturating_sub(1);
            let x_hi = (x + 1).min(w - 1);
            let mut s = 0.0f32;
            for yy in y_lo..=y_hi {
                let row = yy * w;
                for xx in x_lo..=x_hi {
                    s += accum[row + xx];
                }
            }
            out[y * w + x] = s;
        }
    }
    out
}

/// Local maxima above `threshold`, strongest first.
///
/// Plateaus resolve to the first cell in scan order.
fn find_peaks(score: &[f32], w: usize, h: usize, threshold: f32) -> Vec<CenterPeak> {
    let mut peaks = Vec::new();
    if w < 3 || h < 3 {
        return peaks;
    }
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let idx = y * w + x;
            let val = score[idx];
            if val <= threshold {
                continue;
            }
            let mut is_max = true;
            'nbhd: for dy in [-1isize, 0, 1] {
                for dx in [-1isize, 0, 1] {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nidx = idx.wrapping_add_signed(dy * w as isize + dx);
                    if score[nidx] > val || (score[nidx] == val && nidx < idx) {
                        is_max = false;
                        break 'nbhd;
                    }
                }
            }
            if is_max {
                peaks.push(CenterPeak {
                    x: x as u32,
                    y: y as u32,
                    score: val,
                });
            }
        }
    }
    // Stable sort keeps scan order among equal scores.
    peaks.sort_by(|a, b| b.score.total_cmp(&a.score));
    peaks
}

/// Angular sectors used to check that rim support surrounds a center.
pub(crate) const ARC_SECTORS: u32 = 8;

fn sector_of(dx: f32, dy: f32) -> u8 {
    let t = (dy.atan2(dx) + std::f32::consts::PI) / std::f32::consts::TAU;
    ((t * ARC_SECTORS as f32) as u32).min(ARC_SECTORS - 1) as u8
}

/// Pick the best-supported radius around `center` from edge distances.
///
/// Support of radius `r` is the set of edge pixels within 1 px of the
/// circle. A radius qualifies when its support covers at least
/// `min_arc_coverage` of the circumference and falls into at least
/// `min_arc_sectors` of the [`ARC_SECTORS`] angular sectors around the
/// center.
/// Among qualifying radii the one with the most support wins (ties go to
/// the smaller radius).
fn estimate_radius(
    center: [f32; 2],
    edge_points: &[[f32; 2]],
    radii: &[f32],
    config: &HoughConfig,
) -> Option<(f32, f32)> {
    let r_lo = radii.first()? - 1.0;
    let r_hi = radii.last()? + 1.0;
    let mut samples: Vec<(f32, u8)> = edge_points
        .iter()
        .filter_map(|p| {
            let dx = p[0] - center[0];
            let dy = p[1] - center[1];
            let d = (dx * dx + dy * dy).sqrt();
            (d >= r_lo && d <= r_hi).then(|| (d, sector_of(dx, dy)))
        })
        .collect();
    if samples.is_empty() {
        return None;
    }
    samples.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut best: Option<(f32, usize, f32)> = None;
    for &r in radii {
        let lo = samples.partition_point(|s| s.0 < r - 1.0);
        let hi = samples.partition_point(|s| s.0 <= r + 1.0);
        let support = hi - lo;
        let coverage = support as f32 / (2.0 * std::f32::consts::PI * r);
        if support == 0 || coverage < config.min_arc_coverage {
            continue;
        }
        if best.is_some_and(|(_, s, _)| support <= s) {
            continue;
        }
        let band = &samples[lo..hi];
        let sectors = band.iter().fold(0u8, |m, s| m | (1 << s.1));
        if sectors.count_ones() < config.min_arc_sectors {
            continue;
        }
        let mean = band.iter().map(|s| s.0).sum::<f32>() / support as f32;
        best = Some((mean, support, coverage));
    }
    best.map(|(radius, _, coverage)| (radius, coverage))
}

/// Run one accumulator pass over a single image variant.
///
/// Returns circles in descending accumulator order. Centers closer than
/// `params.min_distance()` to a stronger center of the same pass are
/// suppressed.
pub fn detect_pass(
    image: &GrayImage,
    params: &DetectionParameters,
    config: &HoughConfig,
) -> Vec<Circle> {
    let (w, h) = image.dimensions();
    if w < 4 || h < 4 {
        return Vec::new();
    }
    // No circle centered inside the image has a rim beyond the diagonal.
    let diagonal = ((w as f32).powi(2) + (h as f32).powi(2)).sqrt();
    let radii = search_radii(params, diagonal);
    if radii.is_empty() {
        return Vec::new();
    }

    let edges = imageproc::edges::canny(image, 0.5 * config.canny_high, config.canny_high);
    let smoothed = if config.gradient_sigma > 0.0 {
        imageproc::filter::gaussian_blur_f32(image, config.gradient_sigma)
    } else {
        image.clone()
    };
    let gx = imageproc::gradients::horizontal_sobel(&smoothed);
    let gy = imageproc::gradients::vertical_sobel(&smoothed);
    let gx_raw = gx.as_raw();
    let gy_raw = gy.as_raw();

    let stride = w as usize;
    let h_usize = h as usize;
    let mut accum = vec![0.0f32; stride * h_usize];
    let mut edge_points = Vec::new();
    let x_limit = (w - 1) as f32;
    let y_limit = (h - 1) as f32;

    for (idx, &e) in edges.as_raw().iter().enumerate() {
        if e == 0 {
            continue;
        }
        let xf = (idx % stride) as f32;
        let yf = (idx / stride) as f32;
        edge_points.push([xf, yf]);

        let gxv = gx_raw[idx] as f32;
        let gyv = gy_raw[idx] as f32;
        let mag = (gxv * gxv + gyv * gyv).sqrt();
        if mag < 1e-6 {
            continue;
        }
        let dx = gxv / mag;
        let dy = gyv / mag;

        // Vote along +gradient and -gradient directions
        for &r in &radii {
            let vx_pos = xf + dx * r;
            let vy_pos = yf + dy * r;
            if vx_pos >= 0.0 && vx_pos < x_limit && vy_pos >= 0.0 && vy_pos < y_limit {
                bilinear_add_in_bounds(&mut accum, stride, vx_pos, vy_pos, 1.0);
            }

            let vx_neg = xf - dx * r;
            let vy_neg = yf - dy * r;
            if vx_neg >= 0.0 && vx_neg < x_limit && vy_neg >= 0.0 && vy_neg < y_limit {
                bilinear_add_in_bounds(&mut accum, stride, vx_neg, vy_neg, 1.0);
            }
        }
    }
    if edge_points.is_empty() {
        return Vec::new();
    }

    let score = box3_sum(&accum, stride, h_usize);
    let peaks = find_peaks(&score, stride, h_usize, params.sensitivity());

    let min_dist_sq = params.min_distance() * params.min_distance();
    let mut circles: Vec<Circle> = Vec::new();
    for peak in &peaks {
        let cx = peak.x as f32;
        let cy = peak.y as f32;
        let crowded = circles.iter().any(|c| {
            let ddx = c.center_x - cx;
            let ddy = c.center_y - cy;
            ddx * ddx + ddy * ddy < min_dist_sq
        });
        if crowded {
            continue;
        }
        if let Some((radius, coverage)) =
            estimate_radius([cx, cy], &edge_points, &radii, config)
        {
            tracing::trace!(cx, cy, radius, coverage, score = peak.score, "circle accepted");
            circles.push(Circle::new(cx, cy, radius));
            if config.max_circles.is_some_and(|cap| circles.len() >= cap) {
                break;
            }
        }
    }

    tracing::debug!(
        edge_points = edge_points.len(),
        peaks = peaks.len(),
        circles = circles.len(),
        "accumulator pass complete"
    );
    circles
}

/// Run both passes and concatenate their outputs (blurred pass first).
pub fn detect(
    pre: &PreprocessedImage,
    params: &DetectionParameters,
    config: &HoughConfig,
) -> Vec<Circle> {
    let mut circles = detect_pass(&pre.blurred, params, config);
    let n_blurred = circles.len();
    circles.extend(detect_pass(&pre.mask, params, config));
    tracing::debug!(
        blurred_pass = n_blurred,
        mask_pass = circles.len() - n_blurred,
        "two-pass detection complete"
    );
    circles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PreprocessConfig;
    use crate::preprocess::preprocess;
    use crate::test_utils::{
        draw_disks, marker_sheet, nearest_dist, nearest_marker_dist, walled_markers, walled_sheet,
        MARKER_SHEET,
    };
    use image::Luma;

    fn sheet_params() -> DetectionParameters {
        DetectionParameters::new(27.0, 7.0, 20.0, 15.0).expect("valid params")
    }

    #[test]
    fn blurred_pass_finds_every_marker() {
        let pre = preprocess(&marker_sheet(), &PreprocessConfig::default());
        let circles = detect_pass(&pre.blurred, &sheet_params(), &HoughConfig::default());
        assert_eq!(circles.len(), MARKER_SHEET.len(), "{:?}", circles);
        for c in &circles {
            assert!(nearest_marker_dist(c.center_x, c.center_y) < 3.0, "{:?}", c);
            assert!((c.radius - 14.0).abs() < 2.5, "{:?}", c);
        }
    }

    #[test]
    fn mask_pass_only_reports_markers() {
        let pre = preprocess(&marker_sheet(), &PreprocessConfig::default());
        let circles = detect_pass(&pre.mask, &sheet_params(), &HoughConfig::default());
        assert!(!circles.is_empty());
        for c in &circles {
            assert!(nearest_marker_dist(c.center_x, c.center_y) < 3.0, "{:?}", c);
        }
    }

    #[test]
    fn passes_are_concatenated_in_order() {
        let pre = preprocess(&marker_sheet(), &PreprocessConfig::default());
        let cfg = HoughConfig::default();
        let params = sheet_params();
        let first = detect_pass(&pre.blurred, &params, &cfg);
        let second = detect_pass(&pre.mask, &params, &cfg);
        let both = detect(&pre, &params, &cfg);
        assert_eq!(both.len(), first.len() + second.len());
        assert_eq!(&both[..first.len()], first.as_slice());
        assert_eq!(&both[first.len()..], second.as_slice());
    }

    #[test]
    fn blank_image_yields_nothing() {
        let img = GrayImage::from_pixel(64, 64, Luma([200]));
        let pre = preprocess(&img, &PreprocessConfig::default());
        assert!(detect(&pre, &sheet_params(), &HoughConfig::default()).is_empty());
    }

    #[test]
    fn tiny_image_yields_nothing() {
        let img = GrayImage::from_pixel(3, 3, Luma([0]));
        assert!(detect_pass(&img, &sheet_params(), &HoughConfig::default()).is_empty());
    }

    #[test]
    fn stronger_center_suppresses_close_neighbor_within_pass() {
        let img = draw_disks(160, 100, &[[60.0, 50.0, 12.0], [88.0, 50.0, 12.0]], 30, 220);
        let pre = preprocess(&img, &PreprocessConfig::default());
        let params = DetectionParameters::new(40.0, 6.0, 18.0, 15.0).expect("valid params");
        let circles = detect_pass(&pre.blurred, &params, &HoughConfig::default());
        assert_eq!(circles.len(), 1, "{:?}", circles);
    }

    #[test]
    fn max_circles_caps_output() {
        let pre = preprocess(&marker_sheet(), &PreprocessConfig::default());
        let cfg = HoughConfig {
            max_circles: Some(2),
            ..HoughConfig::default()
        };
        let circles = detect_pass(&pre.blurred, &sheet_params(), &cfg);
        assert_eq!(circles.len(), 2);
    }

    #[test]
    fn strict_sensitivity_rejects_everything() {
        let pre = preprocess(&marker_sheet(), &PreprocessConfig::default());
        let params = DetectionParameters::new(27.0, 7.0, 20.0, 1.0e6).expect("valid params");
        assert!(detect_pass(&pre.blurred, &params, &HoughConfig::default()).is_empty());
    }

    #[test]
    fn search_radii_step_over_integers() {
        let params = DetectionParameters::new(20.0, 6.5, 9.2, 15.0).expect("valid params");
        assert_eq!(search_radii(&params, 1000.0), vec![7.0, 8.0, 9.0]);
        assert_eq!(search_radii(&params, 7.5), vec![7.0]);
        assert!(search_radii(&params, 5.0).is_empty());
    }

    #[test]
    fn radii_beyond_float_precision_terminate() {
        let params =
            DetectionParameters::new(20.0, 16_777_216.0, 16_777_220.0, 15.0).expect("valid");
        assert!(search_radii(&params, f32::MAX).len() <= 5);
        let pre = preprocess(&marker_sheet(), &PreprocessConfig::default());
        assert!(detect(&pre, &params, &HoughConfig::default()).is_empty());
    }

    #[test]
    fn huge_max_radius_is_capped_at_the_diagonal() {
        let pre = preprocess(&marker_sheet(), &PreprocessConfig::default());
        let params = DetectionParameters::new(27.0, 7.0, 1.0e6, 15.0).expect("valid");
        let circles = detect_pass(&pre.blurred, &params, &HoughConfig::default());
        assert!(circles.iter().all(|c| c.radius < 300.0));
    }

    #[test]
    fn one_sided_support_is_not_a_circle() {
        let cfg = HoughConfig::default();
        let radii: Vec<f32> = (8..=16).map(|r| r as f32).collect();
        // A wall 14 px below the center plus a short arc above it.
        let mut pts: Vec<[f32; 2]> = (-30..=30).map(|x| [50.0 + x as f32, 64.0]).collect();
        for k in 0..12 {
            let a = -std::f32::consts::FRAC_PI_2 + (k as f32 - 6.0) * 0.05;
            pts.push([50.0 + 14.0 * a.cos(), 50.0 + 14.0 * a.sin()]);
        }
        assert!(estimate_radius([50.0, 50.0], &pts, &radii, &cfg).is_none());

        let ring: Vec<[f32; 2]> = (0..88)
            .map(|k| {
                let a = k as f32 * std::f32::consts::TAU / 88.0;
                [50.0 + 14.0 * a.cos(), 50.0 + 14.0 * a.sin()]
            })
            .collect();
        let (radius, _) = estimate_radius([50.0, 50.0], &ring, &radii, &cfg).expect("ring");
        assert!((radius - 14.0).abs() < 0.5);
    }

    #[test]
    fn wall_lines_beside_markers_add_no_circles() {
        let pre = preprocess(&walled_sheet(), &PreprocessConfig::default());
        let params = DetectionParameters::new(19.0, 5.0, 14.0, 15.0).expect("valid params");
        let markers = walled_markers();
        for image in [&pre.blurred, &pre.mask] {
            let circles = detect_pass(image, &params, &HoughConfig::default());
            for c in &circles {
                assert!(nearest_dist(&markers, c.center_x, c.center_y) < 3.0, "{:?}", c);
            }
        }
    }

    #[test]
    fn peaks_prefer_first_cell_on_plateau() {
        let mut score = vec![0.0f32; 5 * 5];
        score[2 * 5 + 1] = 10.0;
        score[2 * 5 + 2] = 10.0;
        let peaks = find_peaks(&score, 5, 5, 1.0);
        assert_eq!(peaks.len(), 1);
        assert_eq!((peaks[0].x, peaks[0].y), (1, 2));
    }

    #[test]
    fn center_distance_is_euclidean() {
        let a = Circle::new(0.0, 0.0, 1.0);
        let b = Circle::new(3.0, 4.0, 2.0);
        approx::assert_relative_eq!(a.center_distance(&b), 5.0);
    }
}

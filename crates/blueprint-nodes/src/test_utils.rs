//! Shared synthetic images for unit tests.

use image::{GrayImage, Luma};

/// Render filled disks `[cx, cy, radius]` on a uniform background.
///
/// A pixel belongs to a disk when its distance to the center is `<= radius`.
pub(crate) fn draw_disks(
    w: u32,
    h: u32,
    disks: &[[f32; 3]],
    disk_pix: u8,
    bg_pix: u8,
) -> GrayImage {
    let mut img = GrayImage::from_pixel(w, h, Luma([bg_pix]));
    for y in 0..h {
        for x in 0..w {
            let inside = disks.iter().any(|&[cx, cy, r]| {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                dx * dx + dy * dy <= r * r
            });
            if inside {
                img.put_pixel(x, y, Luma([disk_pix]));
            }
        }
    }
    img
}

/// Render a thin horizontal line of `thickness` rows starting at `y0`.
pub(crate) fn draw_hline(img: &mut GrayImage, y0: u32, thickness: u32, pix: u8) {
    let (w, h) = img.dimensions();
    for y in y0..(y0 + thickness).min(h) {
        for x in 0..w {
            img.put_pixel(x, y, Luma([pix]));
        }
    }
}

/// Three well-separated markers used across stage tests.
pub(crate) const MARKER_SHEET: [[f32; 3]; 3] = [
    [50.0, 50.0, 14.0],
    [150.0, 60.0, 14.0],
    [100.0, 140.0, 14.0],
];

/// 200x200 light sheet carrying [`MARKER_SHEET`] as dark disks.
pub(crate) fn marker_sheet() -> GrayImage {
    draw_disks(200, 200, &MARKER_SHEET, 30, 220)
}

/// Distance from `(x, y)` to the nearest marker center.
pub(crate) fn nearest_marker_dist(x: f32, y: f32) -> f32 {
    nearest_dist(&MARKER_SHEET, x, y)
}

/// Marker rows on a 400x300 plan, each row with a wall line running
/// 34 px below it.
pub(crate) fn walled_markers() -> Vec<[f32; 3]> {
    let mut disks = Vec::new();
    for &cy in &[60.0f32, 170.0] {
        for k in 0..6 {
            disks.push([50.0 + 60.0 * k as f32, cy, 10.0]);
        }
    }
    disks
}

/// [`walled_markers`] drawn as dark disks plus 3 px dark wall lines.
pub(crate) fn walled_sheet() -> GrayImage {
    let mut img = draw_disks(400, 300, &walled_markers(), 30, 220);
    draw_hline(&mut img, 94, 3, 30);
    draw_hline(&mut img, 204, 3, 30);
    draw_hline(&mut img, 270, 3, 30);
    img
}

/// Distance from `(x, y)` to the nearest center in `disks`.
pub(crate) fn nearest_dist(disks: &[[f32; 3]], x: f32, y: f32) -> f32 {
    disks
        .iter()
        .map(|&[cx, cy, _]| ((x - cx).powi(2) + (y - cy).powi(2)).sqrt())
        .fold(f32::INFINITY, f32::min)
}

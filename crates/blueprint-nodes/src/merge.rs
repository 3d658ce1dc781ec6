//! Cross-pass deduplication of detected circles.

use crate::detect::Circle;

/// Keep-mask of greedy proximity suppression: a circle is kept unless an
/// earlier kept circle lies closer than `min_distance`.
fn keep_mask(circles: &[Circle], min_distance: f32) -> Vec<bool> {
    let mut keep = vec![true; circles.len()];
    let r2 = min_distance * min_distance;

    for i in 0..circles.len() {
        if !keep[i] {
            continue;
        }

        for j in (i + 1)..circles.len() {
            if !keep[j] {
                continue;
            }
            let dx = circles[i].center_x - circles[j].center_x;
            let dy = circles[i].center_y - circles[j].center_y;
            if dx * dx + dy * dy < r2 {
                keep[j] = false;
            }
        }
    }
    keep
}

/// Remove duplicate detections, preserving input order.
///
/// Candidates are visited in order; one is dropped when any already accepted
/// circle has its center strictly closer than `min_distance`. Earlier
/// candidates (first pass, stronger accumulator peaks) therefore win.
/// Every pair in the output is at least `min_distance` apart.
pub fn merge(circles: &[Circle], min_distance: f32) -> Vec<Circle> {
    let keep = keep_mask(circles, min_distance);
    let merged: Vec<Circle> = circles
        .iter()
        .zip(keep)
        .filter_map(|(c, k)| k.then_some(*c))
        .collect();
    tracing::debug!(
        candidates = circles.len(),
        merged = merged.len(),
        min_distance,
        "merged detections"
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_pair_keeps_first_encountered() {
        let a = Circle::new(100.0, 100.0, 8.0);
        let b = Circle::new(104.0, 101.0, 9.0);
        assert_eq!(merge(&[a, b], 20.0), vec![a]);
        assert_eq!(merge(&[b, a], 20.0), vec![b]);
    }

    #[test]
    fn empty_input_merges_to_empty() {
        assert!(merge(&[], 20.0).is_empty());
    }

    #[test]
    fn exact_threshold_distance_is_kept() {
        let a = Circle::new(0.0, 0.0, 5.0);
        let b = Circle::new(20.0, 0.0, 5.0);
        assert_eq!(merge(&[a, b], 20.0).len(), 2);
    }

    #[test]
    fn suppressed_candidates_do_not_suppress_others() {
        // b is a duplicate of a; c is close to b but far enough from a.
        let a = Circle::new(0.0, 0.0, 5.0);
        let b = Circle::new(15.0, 0.0, 5.0);
        let c = Circle::new(28.0, 0.0, 5.0);
        assert_eq!(merge(&[a, b, c], 20.0), vec![a, c]);
    }

    #[test]
    fn output_pairs_respect_min_distance() {
        let mut circles = Vec::new();
        for i in 0..12 {
            for j in 0..9 {
                let x = (i * 7 + j * 3) as f32;
                let y = (j * 11 + (i % 3) * 4) as f32;
                circles.push(Circle::new(x, y, 6.0));
            }
        }
        let min_distance = 18.0;
        let merged = merge(&circles, min_distance);
        assert!(!merged.is_empty());
        for (i, a) in merged.iter().enumerate() {
            for b in &merged[i + 1..] {
                assert!(a.center_distance(b) >= min_distance);
            }
        }
    }
}

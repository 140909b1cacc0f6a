//! Greedy duplicate suppression across tiles.
//!
//! The 10% tile overlap guarantees a damage near a tile boundary is
//! detected twice, once per overlapping tile, so suppression runs over the
//! combined candidate list in global coordinates (local-tile IoU cannot see
//! cross-tile duplicates). The algorithm is the classic greedy one: keep
//! the highest-confidence candidate, drop everything overlapping it beyond
//! the IoU threshold, repeat. Class labels are ignored on purpose: the two
//! copies of one physical damage may gate through as different classes.

use crate::processors::geometry::BoundingBox;

/// Greedy score-sorted IoU suppression.
///
/// Returns the indices of surviving boxes in ascending (insertion) order,
/// not confidence order, so downstream grouping stays deterministic.
/// Candidates scoring below `score_floor` are dropped even when unique.
/// The sort is stable, so among equal scores the earlier candidate wins.
pub fn greedy_nms(
    boxes: &[BoundingBox],
    scores: &[f32],
    iou_threshold: f32,
    score_floor: f32,
) -> Vec<usize> {
    debug_assert_eq!(boxes.len(), scores.len());

    let mut suppressed: Vec<bool> = scores.iter().map(|&s| s < score_floor).collect();

    let mut order: Vec<usize> = (0..boxes.len()).filter(|&i| !suppressed[i]).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    for &i in &order {
        if suppressed[i] {
            continue;
        }
        keep.push(i);
        for &j in &order {
            if j != i && !suppressed[j] && boxes[i].iou(&boxes[j]) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep.sort_unstable();
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x1: f32, y1: f32, x2: f32, y2: f32) -> BoundingBox {
        BoundingBox::new(x1, y1, x2, y2)
    }

    #[test]
    fn heavy_overlap_keeps_higher_confidence_only() {
        let boxes = vec![bbox(0.0, 0.0, 100.0, 100.0), bbox(5.0, 5.0, 105.0, 105.0)];
        let scores = vec![0.6, 0.9];
        let keep = greedy_nms(&boxes, &scores, 0.3, 0.15);
        assert_eq!(keep, vec![1]);
    }

    #[test]
    fn low_overlap_keeps_both() {
        // IoU = 25*100 / (2*100*100 - 25*100) ≈ 0.143 ≤ 0.3.
        let boxes = vec![bbox(0.0, 0.0, 100.0, 100.0), bbox(75.0, 0.0, 175.0, 100.0)];
        let scores = vec![0.6, 0.9];
        let keep = greedy_nms(&boxes, &scores, 0.3, 0.15);
        assert_eq!(keep, vec![0, 1]);
    }

    #[test]
    fn iou_exactly_at_threshold_keeps_both() {
        // Suppression triggers strictly above the threshold.
        let boxes = vec![bbox(0.0, 0.0, 100.0, 100.0), bbox(0.0, 0.0, 100.0, 100.0)];
        let scores = vec![0.9, 0.6];
        let keep = greedy_nms(&boxes, &scores, 1.0, 0.15);
        assert_eq!(keep, vec![0, 1]);
    }

    #[test]
    fn score_floor_drops_unique_candidates() {
        let boxes = vec![bbox(0.0, 0.0, 10.0, 10.0), bbox(200.0, 200.0, 210.0, 210.0)];
        let scores = vec![0.5, 0.1];
        let keep = greedy_nms(&boxes, &scores, 0.3, 0.15);
        assert_eq!(keep, vec![0]);
    }

    #[test]
    fn survivors_returned_in_insertion_order() {
        let boxes = vec![
            bbox(0.0, 0.0, 10.0, 10.0),
            bbox(100.0, 0.0, 110.0, 10.0),
            bbox(200.0, 0.0, 210.0, 10.0),
        ];
        let scores = vec![0.3, 0.9, 0.5];
        let keep = greedy_nms(&boxes, &scores, 0.3, 0.15);
        assert_eq!(keep, vec![0, 1, 2]);
    }

    #[test]
    fn equal_scores_first_candidate_wins() {
        let boxes = vec![bbox(0.0, 0.0, 100.0, 100.0), bbox(0.0, 0.0, 100.0, 100.0)];
        let scores = vec![0.5, 0.5];
        let keep = greedy_nms(&boxes, &scores, 0.3, 0.15);
        assert_eq!(keep, vec![0]);
    }

    #[test]
    fn chain_suppression_is_greedy_not_transitive() {
        // B overlaps A heavily, C overlaps B but not A. Greedy keeps A,
        // suppresses B, then keeps C.
        let boxes = vec![
            bbox(0.0, 0.0, 100.0, 100.0),
            bbox(40.0, 0.0, 140.0, 100.0),
            bbox(110.0, 0.0, 210.0, 100.0),
        ];
        let scores = vec![0.9, 0.8, 0.7];
        let keep = greedy_nms(&boxes, &scores, 0.3, 0.15);
        assert_eq!(keep, vec![0, 2]);
    }

    #[test]
    fn empty_input() {
        let keep = greedy_nms(&[], &[], 0.3, 0.15);
        assert!(keep.is_empty());
    }
}

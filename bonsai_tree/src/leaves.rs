// Leaf cluster placement.
//
// Leaves hang only off terminal segments (no children) at or beyond
// `LeafLayout::min_depth`, so the trunk and main limbs stay bare. Each
// qualifying terminal gets `clusters_per_terminal` clusters; a cluster is a
// tuft of 2–4 overlapping ellipses placed just past the segment tip, inside
// a fan of `±spread_deg` around the segment direction.
//
// The global `max_total_clusters` cap thins clusters evenly along the
// terminal list rather than cutting off the last terminals. Terminal `i` of
// `n` gets `floor((i+1)·cap/n) − floor(i·cap/n)` clusters, an integer
// accumulator that sums to exactly `cap` and never gives two neighbours a
// difference of more than one.
//
// Geometry is relative to segment length, so the same code dresses a
// grammar tree (segments tens of units long) and a colonization tree
// (segments a few hundredths long). Only the floor on ellipse width comes
// from the caller's `ScaleProfile`.
//
// **Critical constraint: determinism.** Terminals are visited in segment
// order and every random draw comes from the caller's `GrowthRng`.

use crate::config::LeafLayout;
use crate::mapper::LeafParams;
use crate::tree::has_children;
use crate::types::{Color, Leaf, Point, Segment};
use bonsai_prng::GrowthRng;

/// Shortest segment length used for leaf geometry.
const MIN_SEGMENT_LEN: f64 = 1e-3;
/// Random offset direction of an ellipse from its cluster center, radians.
const OFFSET_ANGLE: f64 = 0.8;
/// Ellipse orientation jitter around the segment direction, degrees.
const ROTATION_JITTER_DEG: f64 = 25.0;
const LEAF_ALPHA: f64 = 0.85;

/// Leaves placed on one tree.
#[derive(Clone, Debug, Default)]
pub struct LeafCover {
    pub leaves: Vec<Leaf>,
    /// Terminals that qualified for leaves.
    pub terminals: usize,
    /// Clusters placed after the global cap.
    pub clusters: usize,
}

/// Indices of segments that carry leaves: childless and deep enough.
pub fn leaf_terminals(segments: &[Segment], min_depth: u32) -> Vec<usize> {
    has_children(segments)
        .into_iter()
        .enumerate()
        .filter(|&(i, has_child)| !has_child && segments[i].depth >= min_depth)
        .map(|(i, _)| i)
        .collect()
}

/// Clusters for terminal `i` of `n`, given `per_terminal` before the cap.
fn clusters_for(i: usize, n: usize, per_terminal: u32, cap: u32) -> u32 {
    let naive = n as u64 * per_terminal as u64;
    if naive <= cap as u64 {
        return per_terminal;
    }
    let cap = cap as u64;
    let n = n as u64;
    let i = i as u64;
    ((i + 1) * cap / n - i * cap / n) as u32
}

/// Place leaf clusters on `segments`.
pub fn place(
    segments: &[Segment],
    params: &LeafParams,
    layout: &LeafLayout,
    min_leaf_width: f64,
    rng: &mut GrowthRng,
) -> LeafCover {
    let terminals = leaf_terminals(segments, layout.min_depth);
    if terminals.is_empty() {
        tracing::debug!("no leaf terminals");
        return LeafCover::default();
    }

    let spread = params.spread_deg.to_radians();
    let (lo, hi) = layout.ellipses_per_cluster;
    let (lo, hi) = (lo.min(hi), lo.max(hi));
    let color = leaf_color(params);

    let mut leaves = Vec::new();
    let mut clusters = 0;

    for (k, &index) in terminals.iter().enumerate() {
        let seg = &segments[index];
        let count = clusters_for(
            k,
            terminals.len(),
            params.clusters_per_terminal,
            layout.max_total_clusters,
        );
        let base_theta = (seg.end.y - seg.start.y).atan2(seg.end.x - seg.start.x);
        let seg_len = seg.length().max(MIN_SEGMENT_LEN);

        for _ in 0..count {
            clusters += 1;
            let theta = base_theta + rng.range_f64(-spread, spread);
            let r = rng.range_f64(0.3 * seg_len, 0.9 * seg_len);
            let center = Point::new(seg.end.x + theta.cos() * r, seg.end.y + theta.sin() * r);

            for _ in 0..rng.range_u32_inclusive(lo, hi) {
                let off_r = rng.range_f64(0.0, 0.3 * seg_len);
                let off_theta = theta + rng.range_f64(-OFFSET_ANGLE, OFFSET_ANGLE);

                let base_width = (0.25 * seg_len).max(min_leaf_width);
                let width = base_width * rng.range_f64(0.8, 1.4) * params.size_scale;
                let height = base_width * 0.6 * rng.range_f64(0.8, 1.4) * params.size_scale;
                let rotation_deg = base_theta.to_degrees()
                    + rng.range_f64(-ROTATION_JITTER_DEG, ROTATION_JITTER_DEG);

                leaves.push(Leaf {
                    center: Point::new(
                        center.x + off_theta.cos() * off_r,
                        center.y + off_theta.sin() * off_r,
                    ),
                    width,
                    height,
                    rotation_deg,
                    color,
                });
            }
        }
    }

    tracing::debug!(
        terminals = terminals.len(),
        clusters,
        ellipses = leaves.len(),
        "placed leaves"
    );

    LeafCover {
        leaves,
        terminals: terminals.len(),
        clusters,
    }
}

fn leaf_color(params: &LeafParams) -> Color {
    Color {
        r: (0.16 - params.darken * 0.3).max(0.0),
        g: params.green,
        b: (0.20 - params.darken * 0.2).max(0.0),
        a: LEAF_ALPHA,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::map;
    use crate::types::MetricVector;

    fn segment(start: Point, end: Point, depth: u32, parent: Option<usize>) -> Segment {
        Segment {
            start,
            end,
            depth,
            parent,
            width: 1.0,
            color: Color::from_rgb255([0.0, 0.0, 0.0]),
        }
    }

    /// A trunk of `depth` segments with `fan` childless twigs on top.
    fn broom(depth: u32, fan: usize) -> Vec<Segment> {
        let mut segs = Vec::new();
        for d in 0..depth {
            let parent = d.checked_sub(1).map(|p| p as usize);
            segs.push(segment(
                Point::new(0.0, d as f64 * 10.0),
                Point::new(0.0, (d + 1) as f64 * 10.0),
                d,
                parent,
            ));
        }
        let tip = Point::new(0.0, depth as f64 * 10.0);
        for k in 0..fan {
            let x = k as f64 - fan as f64 / 2.0;
            segs.push(segment(
                tip,
                Point::new(tip.x + x, tip.y + 10.0),
                depth,
                Some(depth as usize - 1),
            ));
        }
        segs
    }

    #[test]
    fn only_deep_childless_segments_qualify() {
        let segs = broom(3, 4);
        assert_eq!(leaf_terminals(&segs, 3), vec![3, 4, 5, 6]);
        assert!(leaf_terminals(&segs, 4).is_empty());
        // A shallow childless stub does not qualify.
        let shallow = broom(1, 2);
        assert!(leaf_terminals(&shallow, 3).is_empty());
    }

    #[test]
    fn uncapped_clusters_match_metric_count() {
        let params = map(&MetricVector::default()).leaves;
        let layout = LeafLayout::default();
        let cover = place(&broom(3, 5), &params, &layout, 0.15, &mut GrowthRng::new(0));
        assert_eq!(cover.terminals, 5);
        assert_eq!(cover.clusters, 5 * params.clusters_per_terminal as usize);
        assert!(cover.leaves.len() >= cover.clusters * 2);
        assert!(cover.leaves.len() <= cover.clusters * 4);
    }

    #[test]
    fn cap_thins_evenly_and_never_exceeds() {
        let n = 100;
        let per = 4;
        let cap = 160;
        let counts: Vec<u32> = (0..n).map(|i| clusters_for(i, n, per, cap)).collect();
        assert_eq!(counts.iter().sum::<u32>(), cap);
        let min = *counts.iter().min().unwrap();
        let max = *counts.iter().max().unwrap();
        assert!(max - min <= 1, "uneven thinning: {min}..{max}");

        // More terminals than the cap: some get none, but the spread is even.
        let counts: Vec<u32> = (0..500).map(|i| clusters_for(i, 500, 1, 160)).collect();
        assert_eq!(counts.iter().sum::<u32>(), 160);
        assert!(counts[..250].iter().sum::<u32>() == 80);
    }

    #[test]
    fn placement_respects_cap() {
        let params = map(&MetricVector::default()).leaves;
        let layout = LeafLayout {
            max_total_clusters: 10,
            ..LeafLayout::default()
        };
        let cover = place(&broom(3, 40), &params, &layout, 0.15, &mut GrowthRng::new(0));
        assert_eq!(cover.clusters, 10);
    }

    #[test]
    fn leaves_sit_inside_the_spread_fan() {
        let params = LeafParams {
            spread_deg: 20.0,
            ..map(&MetricVector::default()).leaves
        };
        let segs = broom(3, 1);
        let tip = segs[3].end;
        let len = segs[3].length();
        let cover = place(&segs, &params, &LeafLayout::default(), 0.15, &mut GrowthRng::new(3));
        for leaf in &cover.leaves {
            // Cluster center at most 0.9 lengths out, ellipse offset at most 0.3.
            assert!(leaf.center.distance(tip) <= 1.2 * len + 1e-9);
            assert!(leaf.width > 0.0 && leaf.height > 0.0);
            assert_eq!(leaf.color.a, LEAF_ALPHA);
        }
    }

    #[test]
    fn difficulty_shrinks_and_darkens_leaves() {
        let easy = map(&MetricVector::new(0.7, 0.5, 0.7, 0.5, 0.0, 0.2)).leaves;
        let hard = map(&MetricVector::new(0.7, 0.5, 0.7, 0.5, 1.0, 0.2)).leaves;
        assert!(hard.size_scale < easy.size_scale);
        assert!(leaf_color(&hard).r < leaf_color(&easy).r);
    }

    #[test]
    fn no_segments_no_leaves() {
        let params = map(&MetricVector::default()).leaves;
        let cover = place(&[], &params, &LeafLayout::default(), 0.15, &mut GrowthRng::new(0));
        assert!(cover.leaves.is_empty());
        assert_eq!(cover.clusters, 0);
    }

    #[test]
    fn inverted_ellipse_range_is_tolerated() {
        let params = map(&MetricVector::default()).leaves;
        let layout = LeafLayout {
            ellipses_per_cluster: (4, 2),
            ..LeafLayout::default()
        };
        let cover = place(&broom(3, 3), &params, &layout, 0.15, &mut GrowthRng::new(0));
        assert!(!cover.leaves.is_empty());
    }
}

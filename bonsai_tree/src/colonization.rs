// Space-colonization tree growth (Runions et al., 2007), in the plane.
//
// Three phases, all driven by `ColonizationParams`:
//
// 1. Attractor generation. `num_attractors` points are sampled inside a
//    crown-shaped region: height uniform over
//    `[trunk_height, trunk_height + crown_height]`, half-width following an
//    envelope that peaks at mid-crown and narrows at top and bottom, and a
//    horizontal lean that grows with height.
// 2. Trunk seeding. From the origin, the trunk grows straight up one
//    `branch_step` at a time until its tip is within 1.2x the influence
//    radius of some attractor or passes the top of the crown (with a hard
//    ceiling of `MAX_TRUNK_STEPS`). Then 3–4 scaffold limbs fan out
//    symmetrically from the tip so the crown always starts multi-way.
// 3. Colonization rounds. Every active attractor either is consumed (some
//    branch inside `kill_radius`) or pulls on its nearest branch inside
//    `influence_radius`. Each pulled branch grows one child one step along
//    the mean pull direction, with a small random rotation. Growth stops at
//    `max_iterations`, when no attractor is active, or when a round assigns
//    nothing.
//
// Branches live in an append-only `BranchTree`: a node can only be added
// under a parent that is already present, so the collection is a tree at
// every step. Attractors are never added after phase 1; `active` flips to
// false exactly once, and `reached_by` records the branch that consumed it.
//
// Degenerate parameters never fail: zero attractors or an unreachable
// crown leave just the trunk and scaffold.
//
// See also: `spatial.rs` for the nearest-branch query, `mapper.rs` for the
// parameters, `pipeline.rs` which converts branches into segments.
//
// **Critical constraint: determinism.** Attractor sampling and direction
// jitter draw from the caller's `GrowthRng`. Pulled branches are visited in
// index order (`BTreeMap`), so jitter draws line up across runs.

use crate::error::TreeError;
use crate::mapper::ColonizationParams;
use crate::spatial::{BranchGrid, Proximity, nearest_linear};
use crate::tree::TreeNode;
use crate::turtle::BARK_RGB;
use crate::types::{Color, Point, Segment, lerp, lerp_rgb};
use bonsai_prng::GrowthRng;
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// Hard ceiling on trunk seeding steps.
pub const MAX_TRUNK_STEPS: usize = 200;
/// Trunk seeding stops once an attractor is this many influence radii away.
const TRUNK_REACH_FACTOR: f64 = 1.2;
/// Tip color of colonization-grown twigs, 0–255 channels.
const TWIG_RGB: [f64; 3] = [40.0, 120.0, 50.0];
/// Stroke width at the deepest twig.
const TWIG_WIDTH: f64 = 0.5;

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

/// A point in the crown that pulls growth toward it until reached.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Attractor {
    pub position: Point,
    pub active: bool,
    /// The branch that was inside the kill radius when this attractor was
    /// deactivated.
    pub reached_by: Option<usize>,
}

/// A node of the grown tree. The drawn piece of wood runs from the parent's
/// position to this one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Branch {
    pub position: Point,
    pub parent: Option<usize>,
    /// Unit growth direction.
    pub direction: [f64; 2],
    pub depth: u32,
}

impl TreeNode for Branch {
    fn parent(&self) -> Option<usize> {
        self.parent
    }

    fn depth(&self) -> u32 {
        self.depth
    }
}

/// Append-only branch collection rooted at the origin.
#[derive(Clone, Debug)]
pub struct BranchTree {
    branches: Vec<Branch>,
}

impl BranchTree {
    /// A tree holding only the root, at the origin, facing up.
    pub fn new() -> Self {
        Self {
            branches: vec![Branch {
                position: Point::ORIGIN,
                parent: None,
                direction: [0.0, 1.0],
                depth: 0,
            }],
        }
    }

    /// Append a child of `parent`, one level deeper. Fails if `parent` is
    /// not already in the tree.
    pub fn grow(
        &mut self,
        parent: usize,
        position: Point,
        direction: [f64; 2],
    ) -> Result<usize, TreeError> {
        let index = self.branches.len();
        let Some(p) = self.branches.get(parent) else {
            return Err(TreeError::OrphanBranch { index, parent });
        };
        let depth = p.depth + 1;
        self.branches.push(Branch {
            position,
            parent: Some(parent),
            direction,
            depth,
        });
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    fn positions(&self) -> Vec<Point> {
        self.branches.iter().map(|b| b.position).collect()
    }
}

impl Default for BranchTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Output of one colonization run.
#[derive(Clone, Debug)]
pub struct ColonizationResult {
    pub branches: Vec<Branch>,
    pub attractors: Vec<Attractor>,
    /// Number of branches after trunk seeding (root included).
    pub trunk_len: usize,
    /// Number of branches after the scaffold was added.
    pub scaffold_len: usize,
    /// Colonization rounds started.
    pub rounds: u32,
}

// ---------------------------------------------------------------------------
// Growth
// ---------------------------------------------------------------------------

/// Run all three phases.
pub fn grow(
    params: &ColonizationParams,
    use_spatial_index: bool,
    rng: &mut GrowthRng,
) -> Result<ColonizationResult, TreeError> {
    let mut attractors = generate_attractors(params, rng);
    let mut tree = BranchTree::new();

    seed_trunk(&mut tree, &attractors, params)?;
    let trunk_len = tree.len();
    add_scaffold(&mut tree, params)?;
    let scaffold_len = tree.len();

    let rounds = colonize(&mut tree, &mut attractors, params, use_spatial_index, rng)?;

    tracing::debug!(
        attractors = attractors.len(),
        consumed = attractors.iter().filter(|a| !a.active).count(),
        trunk_len,
        branches = tree.len(),
        rounds,
        "space colonization finished"
    );

    Ok(ColonizationResult {
        branches: tree.branches,
        attractors,
        trunk_len,
        scaffold_len,
        rounds,
    })
}

/// Sample the attractor cloud.
pub fn generate_attractors(params: &ColonizationParams, rng: &mut GrowthRng) -> Vec<Attractor> {
    let bottom = params.trunk_height;
    let top = params.trunk_height + params.crown_height;

    (0..params.num_attractors)
        .map(|_| {
            let y = rng.range_f64(bottom, top);
            let t = if params.crown_height > 0.0 {
                (y - bottom) / params.crown_height
            } else {
                0.0
            };
            // Umbrella silhouette: widest at mid-crown.
            let half_width = params.crown_radius * (0.5 + 0.7 * (1.0 - (2.0 * t - 1.0).abs()));
            let x_center = params.lean_factor * (t - 0.3);
            let x = rng.range_f64(-half_width, half_width) + x_center;
            Attractor {
                position: Point::new(x, y),
                active: true,
                reached_by: None,
            }
        })
        .collect()
}

/// Grow the trunk straight up until the crown is within reach. Always takes
/// at least one step, so the trunk has nonzero length.
fn seed_trunk(
    tree: &mut BranchTree,
    attractors: &[Attractor],
    params: &ColonizationParams,
) -> Result<(), TreeError> {
    let reach = params.influence_radius * TRUNK_REACH_FACTOR;
    let crown_top = params.trunk_height + params.crown_height;

    for _ in 0..MAX_TRUNK_STEPS {
        let tip_index = tree.len() - 1;
        let tip = tree.branches[tip_index].position;

        if tree.len() > 1 {
            let nearest = attractors
                .iter()
                .map(|a| a.position.distance(tip))
                .fold(f64::INFINITY, f64::min);
            if nearest < reach || tip.y > crown_top {
                break;
            }
        }

        let next = Point::new(tip.x, tip.y + params.branch_step);
        tree.grow(tip_index, next, [0.0, 1.0])?;
    }
    Ok(())
}

/// Fan `scaffold_count` limbs out of the trunk tip at evenly spaced angles
/// within `±scaffold_spread_deg` of vertical. Each limb is a chain of steps
/// totalling `scaffold_length`.
fn add_scaffold(tree: &mut BranchTree, params: &ColonizationParams) -> Result<(), TreeError> {
    let count = params.scaffold_count;
    if count == 0 || params.scaffold_length <= 0.0 {
        return Ok(());
    }
    let tip_index = tree.len() - 1;
    let tip = tree.branches[tip_index].position;

    let step = if params.branch_step > 0.0 {
        params.branch_step
    } else {
        params.scaffold_length
    };
    let steps = (params.scaffold_length / step).ceil().max(1.0) as usize;
    let step_len = params.scaffold_length / steps as f64;

    for k in 0..count {
        let offset = if count == 1 {
            0.0
        } else {
            -params.scaffold_spread_deg
                + 2.0 * params.scaffold_spread_deg * k as f64 / (count - 1) as f64
        };
        let heading = (90.0 - offset).to_radians();
        let direction = [heading.cos(), heading.sin()];

        let mut parent = tip_index;
        let mut position = tip;
        for _ in 0..steps {
            position = Point::new(
                position.x + direction[0] * step_len,
                position.y + direction[1] * step_len,
            );
            parent = tree.grow(parent, position, direction)?;
        }
    }
    Ok(())
}

/// Run colonization rounds. Returns the number of rounds started.
fn colonize(
    tree: &mut BranchTree,
    attractors: &mut [Attractor],
    params: &ColonizationParams,
    use_spatial_index: bool,
    rng: &mut GrowthRng,
) -> Result<u32, TreeError> {
    let mut positions = tree.positions();
    let mut grid = if use_spatial_index {
        BranchGrid::new(params.kill_radius, params.influence_radius)
    } else {
        None
    };
    if let Some(grid) = grid.as_mut() {
        for (i, &p) in positions.iter().enumerate() {
            grid.insert(i, p);
        }
    }

    let mut rounds = 0;
    let mut still_pulling = false;

    while rounds < params.max_iterations && attractors.iter().any(|a| a.active) {
        rounds += 1;

        // Sum of unit pull vectors and attractor count, per branch.
        let mut pull: BTreeMap<usize, ([f64; 2], u32)> = BTreeMap::new();

        for attractor in attractors.iter_mut().filter(|a| a.active) {
            let proximity = match &grid {
                Some(g) => g.nearest(
                    attractor.position,
                    &positions,
                    params.kill_radius,
                    params.influence_radius,
                ),
                None => nearest_linear(
                    attractor.position,
                    &positions,
                    params.kill_radius,
                    params.influence_radius,
                ),
            };
            match proximity {
                Proximity::Reached(branch) => {
                    attractor.active = false;
                    attractor.reached_by = Some(branch);
                }
                Proximity::Influenced(branch) => {
                    let from = positions[branch];
                    let dir = normalize([
                        attractor.position.x - from.x,
                        attractor.position.y - from.y,
                    ]);
                    let entry = pull.entry(branch).or_insert(([0.0, 0.0], 0));
                    entry.0[0] += dir[0];
                    entry.0[1] += dir[1];
                    entry.1 += 1;
                }
                Proximity::Distant => {}
            }
        }

        let active = attractors.iter().filter(|a| a.active).count();
        tracing::trace!(round = rounds, assigned = pull.len(), active, "colonization round");

        if pull.is_empty() {
            still_pulling = false;
            break;
        }
        still_pulling = true;

        for (branch, (sum, count)) in pull {
            let parent = tree.branches[branch];
            let mean = [sum[0] / count as f64, sum[1] / count as f64];
            // Opposing pulls can cancel exactly; keep the parent's heading then.
            let mut base = normalize(mean);
            if base == [0.0, 0.0] {
                base = parent.direction;
            }

            let jitter = rng.centered(params.direction_jitter) * PI;
            let (sin, cos) = jitter.sin_cos();
            let direction = normalize([
                base[0] * cos - base[1] * sin,
                base[0] * sin + base[1] * cos,
            ]);

            let position = Point::new(
                parent.position.x + direction[0] * params.branch_step,
                parent.position.y + direction[1] * params.branch_step,
            );
            let index = tree.grow(branch, position, direction)?;
            positions.push(position);
            if let Some(grid) = grid.as_mut() {
                grid.insert(index, position);
            }
        }
    }

    if still_pulling && rounds >= params.max_iterations {
        tracing::warn!(
            rounds,
            active = attractors.iter().filter(|a| a.active).count(),
            "colonization stopped at the round cap with attractors still in reach"
        );
    }

    Ok(rounds)
}

fn normalize(v: [f64; 2]) -> [f64; 2] {
    let len = v[0].hypot(v[1]);
    if len == 0.0 {
        [0.0, 0.0]
    } else {
        [v[0] / len, v[1] / len]
    }
}

// ---------------------------------------------------------------------------
// Segments
// ---------------------------------------------------------------------------

/// Convert grown branches into drawable segments: one per non-root branch,
/// running from its parent to it. Width tapers from `base_width` at the
/// trunk base to a hairline at the deepest twig; color ramps from bark to
/// leaf green. Segment `i` comes from branch `i + 1`, and parent links are
/// re-indexed to match.
pub fn to_segments(branches: &[Branch], base_width: f64) -> Vec<Segment> {
    let max_depth = branches.iter().map(|b| b.depth).max().unwrap_or(0).max(1);

    branches
        .iter()
        .skip(1)
        .filter_map(|b| {
            let parent = b.parent?;
            let t = b.depth as f64 / max_depth as f64;
            Some(Segment {
                start: branches[parent].position,
                end: b.position,
                depth: b.depth - 1,
                parent: parent.checked_sub(1),
                width: lerp(base_width, TWIG_WIDTH, t),
                color: Color::from_rgb255(lerp_rgb(BARK_RGB, TWIG_RGB, t)),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::map;
    use crate::tree::validate;
    use crate::types::MetricVector;

    fn params() -> ColonizationParams {
        map(&MetricVector::default()).colonization
    }

    #[test]
    fn attractor_count_is_exact_and_inside_crown() {
        let p = params();
        let attractors = generate_attractors(&p, &mut GrowthRng::new(0));
        assert_eq!(attractors.len(), p.num_attractors);
        for a in &attractors {
            assert!(a.active);
            assert!(a.position.y >= p.trunk_height);
            assert!(a.position.y <= p.trunk_height + p.crown_height);
            // Widest envelope is 1.2 crown radii, plus at most 0.7 lean.
            assert!(a.position.x.abs() <= p.crown_radius * 1.2 + p.lean_factor);
        }
    }

    #[test]
    fn lean_shifts_the_upper_crown() {
        let p = ColonizationParams {
            lean_factor: 0.5,
            num_attractors: 2000,
            ..params()
        };
        let attractors = generate_attractors(&p, &mut GrowthRng::new(1));
        let top_third: Vec<_> = attractors
            .iter()
            .filter(|a| a.position.y > p.trunk_height + p.crown_height * 0.67)
            .collect();
        let mean_x =
            top_third.iter().map(|a| a.position.x).sum::<f64>() / top_third.len() as f64;
        assert!(mean_x > 0.1, "upper crown should lean right, mean x = {mean_x}");
    }

    #[test]
    fn branch_tree_rejects_missing_parent() {
        let mut tree = BranchTree::new();
        assert_eq!(
            tree.grow(5, Point::ORIGIN, [0.0, 1.0]),
            Err(TreeError::OrphanBranch { index: 1, parent: 5 })
        );
        assert_eq!(tree.grow(0, Point::new(0.0, 1.0), [0.0, 1.0]), Ok(1));
        assert_eq!(tree.branches()[1].depth, 1);
    }

    #[test]
    fn grown_tree_is_valid() {
        let result = grow(&params(), true, &mut GrowthRng::new(0)).unwrap();
        assert_eq!(validate(&result.branches), Ok(()));
        assert!(result.branches.len() > result.scaffold_len, "crown should grow");
        for b in &result.branches[1..] {
            let parent = result.branches[b.parent.unwrap()];
            assert_eq!(b.depth, parent.depth + 1);
        }
    }

    #[test]
    fn trunk_is_vertical_and_scaffold_fans_out() {
        let p = params();
        let result = grow(&p, true, &mut GrowthRng::new(0)).unwrap();
        assert!(result.trunk_len >= 2);
        for b in &result.branches[..result.trunk_len] {
            assert_eq!(b.position.x, 0.0);
        }
        let tip = result.branches[result.trunk_len - 1].position;
        assert!(tip.y > 0.0);

        let limbs = p.scaffold_count as usize;
        let scaffold = &result.branches[result.trunk_len..result.scaffold_len];
        assert_eq!(scaffold.len() % limbs, 0);
        let roots: Vec<_> = scaffold
            .iter()
            .filter(|b| b.parent == Some(result.trunk_len - 1))
            .collect();
        assert_eq!(roots.len(), limbs);
        // Symmetric fan: the x components cancel.
        let sum_x: f64 = roots.iter().map(|b| b.direction[0]).sum();
        assert!(sum_x.abs() < 1e-9);
    }

    #[test]
    fn attractors_are_only_consumed_within_kill_radius() {
        let p = params();
        let result = grow(&p, false, &mut GrowthRng::new(0)).unwrap();
        let mut consumed = 0;
        for a in &result.attractors {
            match (a.active, a.reached_by) {
                (true, None) => {}
                (false, Some(branch)) => {
                    consumed += 1;
                    let d = a.position.distance(result.branches[branch].position);
                    assert!(d < p.kill_radius, "consumed at distance {d}");
                }
                other => panic!("inconsistent attractor state {other:?}"),
            }
        }
        assert!(consumed > 0);
    }

    #[test]
    fn spatial_index_does_not_change_growth() {
        let p = params();
        let with = grow(&p, true, &mut GrowthRng::new(5)).unwrap();
        let without = grow(&p, false, &mut GrowthRng::new(5)).unwrap();
        assert_eq!(with.branches, without.branches);
        assert_eq!(with.attractors, without.attractors);
        assert_eq!(with.rounds, without.rounds);
    }

    #[test]
    fn zero_attractors_leave_trunk_and_scaffold() {
        let p = ColonizationParams {
            num_attractors: 0,
            ..params()
        };
        let result = grow(&p, true, &mut GrowthRng::new(0)).unwrap();
        assert!(result.attractors.is_empty());
        assert_eq!(result.rounds, 0);
        assert_eq!(result.branches.len(), result.scaffold_len);
        // With nothing to reach, the trunk climbs past the crown top.
        let tip = result.branches[result.trunk_len - 1].position;
        assert!(tip.y > p.trunk_height + p.crown_height);
        assert_eq!(validate(&result.branches), Ok(()));
    }

    #[test]
    fn unreachable_crown_stops_after_one_round() {
        let p = ColonizationParams {
            influence_radius: 1e-6,
            kill_radius: 1e-7,
            ..params()
        };
        let result = grow(&p, true, &mut GrowthRng::new(0)).unwrap();
        assert_eq!(result.rounds, 1);
        assert_eq!(result.branches.len(), result.scaffold_len);
        assert!(result.attractors.iter().all(|a| a.active));
    }

    #[test]
    fn trunk_respects_hard_ceiling() {
        let p = ColonizationParams {
            num_attractors: 0,
            crown_height: 1e6,
            ..params()
        };
        let result = grow(&p, true, &mut GrowthRng::new(0)).unwrap();
        assert_eq!(result.trunk_len, MAX_TRUNK_STEPS + 1);
    }

    #[test]
    fn segments_taper_and_keep_tree_shape() {
        let p = params();
        let result = grow(&p, true, &mut GrowthRng::new(0)).unwrap();
        let segments = to_segments(&result.branches, 8.0);
        assert_eq!(segments.len(), result.branches.len() - 1);
        assert_eq!(validate(&segments), Ok(()));
        assert_eq!(segments[0].start, Point::ORIGIN);
        assert_eq!(segments[0].parent, None);
        assert!(segments[0].width < 8.0 && segments[0].width > 7.0);
        let thinnest = segments.iter().map(|s| s.width).fold(f64::INFINITY, f64::min);
        assert!((thinnest - TWIG_WIDTH).abs() < 1e-12);
    }

    #[test]
    fn growth_is_deterministic() {
        let p = params();
        let a = grow(&p, true, &mut GrowthRng::new(9)).unwrap();
        let b = grow(&p, true, &mut GrowthRng::new(9)).unwrap();
        assert_eq!(a.branches, b.branches);
        assert_eq!(a.attractors, b.attractors);
    }
}

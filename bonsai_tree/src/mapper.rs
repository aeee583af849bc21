// Metric-to-parameter mapping.
//
// `map()` turns a clamped `MetricVector` into the immutable
// `GrowthParameters` that drive both growth paths and the leaf pass. Every
// field is an affine function of one or two metrics, clamped into a
// documented range. The coefficients are a heuristic table; what callers may
// rely on is the range of each field (the `*_RANGE` constants) and that each
// field moves monotonically with the metric it primarily reads.
//
// Parameters are grouped the way they are consumed:
// - `StrokeParams`: per-branch drawing state the turtle snapshots on push
//   and scales on the decay marker.
// - `AngleParams`: turn and length jitter for the turtle.
// - `LeafParams`: cluster density, spread and size for `leaves.rs`.
// - `ColonizationParams`: crown shape and growth radii for `colonization.rs`.
//
// All groups are `Copy`, so a turtle stack frame holds its own snapshot and
// a pop can never observe a later mutation.
//
// **Critical constraint: determinism.** `map()` is pure. No randomness, no
// I/O, no configuration lookups.

use crate::grammar::MAX_ITERATIONS;
use crate::types::{MetricVector, lerp};
use serde::Serialize;
use std::ops::RangeInclusive;

// ---------------------------------------------------------------------------
// Documented output ranges
// ---------------------------------------------------------------------------

pub const ITERATIONS_RANGE: RangeInclusive<u32> = 6..=MAX_ITERATIONS;
pub const LENGTH_RANGE: RangeInclusive<f64> = 60.0..=140.0;
pub const WIDTH_RANGE: RangeInclusive<f64> = 4.0..=12.0;
pub const LENGTH_DECAY_RANGE: RangeInclusive<f64> = 0.68..=0.82;
pub const WIDTH_DECAY_RANGE: RangeInclusive<f64> = 0.82..=0.93;
pub const ANGLE_MIN_RANGE: RangeInclusive<f64> = 10.0..=15.0;
pub const ANGLE_MAX_RANGE: RangeInclusive<f64> = 20.0..=35.0;
pub const LENGTH_JITTER_RANGE: RangeInclusive<f64> = 0.05..=0.20;
pub const ANGLE_ASYMMETRY_RANGE: RangeInclusive<f64> = 0.05..=0.25;
pub const CLUSTERS_RANGE: RangeInclusive<u32> = 1..=4;
/// Leaf cluster spread in degrees. The minimum is reached at cohesion 1.
pub const LEAF_SPREAD_RANGE: RangeInclusive<f64> = 20.0..=45.0;
pub const LEAF_SIZE_RANGE: RangeInclusive<f64> = 0.7..=1.3;
pub const ATTRACTORS_RANGE: RangeInclusive<usize> = 240..=660;
pub const COLONIZATION_ROUNDS_RANGE: RangeInclusive<u32> = 160..=240;

/// Attractors sampled per grammar iteration on the colonization path.
const ATTRACTORS_PER_ITERATION: f64 = 50.0;

// ---------------------------------------------------------------------------
// Parameter groups
// ---------------------------------------------------------------------------

/// Drawing state for one branch level. The decay marker multiplies
/// `length`, `width` and `color` by their ratios.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StrokeParams {
    /// Segment length before jitter.
    pub length: f64,
    pub length_decay: f64,
    /// Stroke width in drawing units.
    pub width: f64,
    pub width_decay: f64,
    /// Tip color as 0–255 channels. Segment color blends toward it with depth.
    pub color: [f64; 3],
    /// Per-level color multiplier. Above 1.0 the tips brighten.
    pub color_decay: f64,
}

/// Turn and length randomness for the turtle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AngleParams {
    /// Lower bound of a turn, degrees.
    pub angle_min: f64,
    /// Upper bound of a turn, degrees.
    pub angle_max: f64,
    /// Relative segment length jitter: lengths vary by `±length_jitter / 2`.
    pub length_jitter: f64,
    /// Relative asymmetric perturbation added to each turn.
    pub angle_asymmetry: f64,
}

/// Leaf density, spread and appearance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LeafParams {
    /// Clusters per qualifying terminal before the global cap is applied.
    pub clusters_per_terminal: u32,
    /// Half-angle of the cluster fan around the branch direction, degrees.
    pub spread_deg: f64,
    /// Multiplier on ellipse size. Harder texts get smaller leaves.
    pub size_scale: f64,
    /// Green channel of leaf color, [0, 1].
    pub green: f64,
    /// How much red and blue are pulled down, [0, 0.15].
    pub darken: f64,
}

/// Crown shape and growth radii for space colonization. Units are crown
/// units: the crown is about two units across.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ColonizationParams {
    pub crown_radius: f64,
    pub crown_height: f64,
    /// Height at which the crown begins.
    pub trunk_height: f64,
    pub num_attractors: usize,
    /// Attractors farther than this from every branch exert no pull.
    pub influence_radius: f64,
    /// An attractor closer than this to any branch is consumed.
    pub kill_radius: f64,
    /// Length of every grown branch step.
    pub branch_step: f64,
    /// Cap on colonization rounds.
    pub max_iterations: u32,
    /// Horizontal shift of the crown per unit of normalized height.
    pub lean_factor: f64,
    /// Direction jitter amplitude, as a fraction of pi radians.
    pub direction_jitter: f64,
    /// Number of scaffold branches fanned out at the trunk tip (3 or 4).
    pub scaffold_count: u32,
    pub scaffold_length: f64,
    /// Outermost scaffold angle from vertical, degrees.
    pub scaffold_spread_deg: f64,
}

/// Everything derived from a `MetricVector`. Created fresh per generation
/// call and never mutated; the turtle works on copies of `stroke`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GrowthParameters {
    /// Grammar iteration count. On the colonization path it scales the
    /// attractor count instead.
    pub iterations: u32,
    pub stroke: StrokeParams,
    pub angles: AngleParams,
    pub leaves: LeafParams,
    pub colonization: ColonizationParams,
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Map metrics to growth parameters. Total: every input in [0, 1] (which
/// `MetricVector` guarantees) lands every output inside its `*_RANGE`.
pub fn map(metrics: &MetricVector) -> GrowthParameters {
    let acc = metrics.accuracy();
    let synt = metrics.complexity();
    let lex = metrics.diversity();
    let coh = metrics.cohesion();
    let diff = metrics.difficulty();
    let inf = metrics.informality();
    let maturity = metrics.maturity();

    // Deeper recursion for harder, more complex text.
    let iterations = ((6.0 + diff * 3.0 + synt * 2.0).floor() as u32)
        .clamp(*ITERATIONS_RANGE.start(), *ITERATIONS_RANGE.end());

    let stroke = StrokeParams {
        length: (60.0 + diff * 60.0 + synt * 20.0).min(*LENGTH_RANGE.end()),
        // Complex syntax keeps child branches long and the crown full.
        length_decay: 0.68 + synt * 0.14,
        // Accurate, demanding text grows a sturdier trunk.
        width: (4.0 + acc * 4.0 + diff * 4.0).min(*WIDTH_RANGE.end()),
        width_decay: 0.82 + coh * 0.11,
        color: [40.0, 90.0 + diff * 50.0, 30.0 + diff * 20.0],
        color_decay: 1.10,
    };

    // Cohesive text branches in an orderly, narrow fan. An all-zero vector
    // therefore gets the widest fan (15-30 degrees), not the narrowest.
    let angles = AngleParams {
        angle_min: (10.0 + (1.0 - coh) * 5.0).min(18.0),
        angle_max: (20.0 + (1.0 - coh) * 10.0 + diff * 5.0).min(*ANGLE_MAX_RANGE.end()),
        length_jitter: 0.05 + (1.0 - coh) * 0.15,
        angle_asymmetry: 0.05 + inf * 0.20,
    };

    let leaves = LeafParams {
        clusters_per_terminal: (1 + (lex * 3.0).floor() as u32)
            .clamp(*CLUSTERS_RANGE.start(), *CLUSTERS_RANGE.end()),
        spread_deg: 20.0 + (1.0 - coh) * 25.0,
        size_scale: 0.7 + (1.0 - diff) * 0.6,
        green: (0.55 + 0.3 * lex).clamp(0.45, 0.9),
        darken: 0.15 * diff,
    };

    let density = lerp(0.8, 1.2, maturity);
    let num_attractors = (iterations as f64 * ATTRACTORS_PER_ITERATION * density).round() as usize;

    let colonization = ColonizationParams {
        crown_radius: lerp(0.8, 1.2, coh) * lerp(0.85, 1.15, maturity),
        crown_height: lerp(1.0, 1.5, synt),
        trunk_height: lerp(0.3, 0.5, diff),
        num_attractors: num_attractors.clamp(*ATTRACTORS_RANGE.start(), *ATTRACTORS_RANGE.end()),
        influence_radius: 0.25,
        kill_radius: 0.07,
        branch_step: lerp(0.025, 0.04, synt),
        max_iterations: ((160.0 + 80.0 * diff).floor() as u32).clamp(
            *COLONIZATION_ROUNDS_RANGE.start(),
            *COLONIZATION_ROUNDS_RANGE.end(),
        ),
        lean_factor: lerp(0.0, 0.5, inf),
        direction_jitter: 0.18,
        scaffold_count: if synt < 0.5 { 3 } else { 4 },
        scaffold_length: 0.12,
        scaffold_spread_deg: 40.0,
    };

    GrowthParameters {
        iterations,
        stroke,
        angles,
        leaves,
        colonization,
    }
}

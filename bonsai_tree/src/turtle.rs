// Turtle interpretation of an expanded grammar stream.
//
// A stack machine that walks the symbol stream once, left to right, and
// emits one `Segment` per drawn symbol (`F` and `X`). The turtle state is
// position, heading (degrees, 90 = up), a `StrokeParams` snapshot, the
// current depth, and the index of the last segment drawn on this branch
// (the parent of the next one). `[` pushes a copy of the whole state and
// goes one level deeper; `]` restores the copy exactly. `@` scales length,
// width and color in place and also goes one level deeper.
//
// Segment color is a depth ramp from bark brown toward the stroke's current
// color, so trunks read brown and tips read green.
//
// An unbalanced stream is a bug in the grammar, reported as
// `TreeError::StackUnderflow` or `TreeError::UnclosedBranches`.
//
// See also: `grammar.rs` for the stream, `mapper.rs` for `StrokeParams` and
// `AngleParams`, `leaves.rs`, which consumes the segments.
//
// **Critical constraint: determinism.** All jitter comes from the
// `GrowthRng` passed in by the caller, consumed in stream order.

use crate::error::TreeError;
use crate::grammar::Symbol;
use crate::mapper::{AngleParams, StrokeParams};
use crate::types::{Bounds, Color, Point, Segment, lerp_rgb};
use bonsai_prng::GrowthRng;

/// Bark color at the trunk base, 0–255 channels.
pub const BARK_RGB: [f64; 3] = [90.0, 60.0, 40.0];
/// Depth at which the color ramp reaches the stroke color.
const COLOR_RAMP_DEPTH: f64 = 12.0;
/// Narrowest stroke the decay marker can produce.
const MIN_STROKE_WIDTH: f64 = 1.0;

/// Everything saved and restored by `[` and `]`.
#[derive(Clone, Copy, Debug)]
struct TurtleState {
    position: Point,
    heading_deg: f64,
    stroke: StrokeParams,
    depth: u32,
    last_segment: Option<usize>,
}

/// Output of one interpretation pass.
#[derive(Clone, Debug)]
pub struct TurtleDrawing {
    pub segments: Vec<Segment>,
    /// Bounds of every turtle position visited, including the origin.
    pub bounds: Bounds,
    /// Deepest stack seen during the walk.
    pub max_stack_depth: usize,
}

/// Walk `stream` and emit segments.
pub fn interpret(
    stream: &[Symbol],
    stroke: StrokeParams,
    angles: &AngleParams,
    rng: &mut GrowthRng,
) -> Result<TurtleDrawing, TreeError> {
    let mut state = TurtleState {
        position: Point::ORIGIN,
        heading_deg: 90.0,
        stroke,
        depth: 0,
        last_segment: None,
    };
    let mut stack: Vec<TurtleState> = Vec::new();
    let mut max_stack_depth = 0;
    let mut segments = Vec::new();
    let mut bounds = Bounds::at(state.position);

    for (offset, &sym) in stream.iter().enumerate() {
        match sym {
            Symbol::Forward | Symbol::Grow => {
                let jitter = 1.0 + rng.centered(angles.length_jitter);
                let length = state.stroke.length * jitter;
                let end = state.position.advance(state.heading_deg, length);

                segments.push(Segment {
                    start: state.position,
                    end,
                    depth: state.depth,
                    parent: state.last_segment,
                    width: state.stroke.width,
                    color: depth_color(&state.stroke, state.depth),
                });
                state.last_segment = Some(segments.len() - 1);
                state.position = end;
                bounds.include(end);
            }
            Symbol::TurnLeft => state.heading_deg += turn_angle(angles, rng),
            Symbol::TurnRight => state.heading_deg -= turn_angle(angles, rng),
            Symbol::Push => {
                stack.push(state);
                max_stack_depth = max_stack_depth.max(stack.len());
                state.depth += 1;
            }
            Symbol::Pop => {
                state = stack.pop().ok_or(TreeError::StackUnderflow { offset })?;
            }
            Symbol::Decay => {
                let s = &mut state.stroke;
                s.length *= s.length_decay;
                s.width = (s.width * s.width_decay).max(MIN_STROKE_WIDTH);
                for channel in &mut s.color {
                    *channel *= s.color_decay;
                }
                state.depth += 1;
            }
        }
    }

    if !stack.is_empty() {
        return Err(TreeError::UnclosedBranches { open: stack.len() });
    }

    tracing::debug!(
        symbols = stream.len(),
        segments = segments.len(),
        max_stack_depth,
        "interpreted turtle stream"
    );

    Ok(TurtleDrawing {
        segments,
        bounds,
        max_stack_depth,
    })
}

/// One jittered turn: uniform in `[angle_min, angle_max]` plus an
/// asymmetric perturbation proportional to the drawn angle.
fn turn_angle(angles: &AngleParams, rng: &mut GrowthRng) -> f64 {
    let base = rng.range_f64(angles.angle_min, angles.angle_max);
    base + base * rng.centered(angles.angle_asymmetry)
}

fn depth_color(stroke: &StrokeParams, depth: u32) -> Color {
    let t = (depth as f64 / COLOR_RAMP_DEPTH).clamp(0.0, 1.0);
    Color::from_rgb255(lerp_rgb(BARK_RGB, stroke.color, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{expand, parse_stream, segment_count};
    use crate::mapper::map;
    use crate::tree::validate;
    use crate::types::MetricVector;

    fn params() -> (StrokeParams, AngleParams) {
        let p = map(&MetricVector::default());
        (p.stroke, p.angles)
    }

    fn run(text: &str) -> Result<TurtleDrawing, TreeError> {
        let (stroke, angles) = params();
        interpret(&parse_stream(text), stroke, &angles, &mut GrowthRng::new(0))
    }

    #[test]
    fn single_forward_points_up() {
        let d = run("F").unwrap();
        assert_eq!(d.segments.len(), 1);
        let s = d.segments[0];
        assert_eq!(s.start, Point::ORIGIN);
        assert!(s.end.x.abs() < 1e-9, "trunk should be vertical: {:?}", s.end);
        assert!(s.end.y > 0.0);
        assert_eq!(s.parent, None);
        assert_eq!(s.depth, 0);
    }

    #[test]
    fn length_jitter_stays_in_band() {
        let (stroke, angles) = params();
        let d = run("FFFFFFFFFFFFFFFFFFFF").unwrap();
        for s in &d.segments {
            let ratio = s.length() / stroke.length;
            assert!(
                (1.0 - angles.length_jitter / 2.0 - 1e-9..=1.0 + angles.length_jitter / 2.0 + 1e-9)
                    .contains(&ratio),
                "length ratio {ratio} outside jitter band"
            );
        }
    }

    #[test]
    fn pop_restores_position_heading_and_depth() {
        let d = run("F[-F]F").unwrap();
        assert_eq!(d.segments.len(), 3);
        let trunk = d.segments[0];
        let side = d.segments[1];
        let cont = d.segments[2];
        assert_eq!(side.start, trunk.end);
        assert_eq!(side.depth, 1);
        assert_eq!(cont.start, trunk.end);
        assert_eq!(cont.depth, 0);
        assert_eq!(cont.parent, Some(0));
        // The continuation was not turned, so it stays vertical.
        assert!((cont.heading_deg() - 90.0).abs() < 1e-9);
        // The side branch turned clockwise.
        assert!(side.heading_deg() < 90.0);
    }

    #[test]
    fn decay_marker_shrinks_stroke_and_deepens() {
        let (stroke, _) = params();
        let d = run("F@F").unwrap();
        let second = d.segments[1];
        assert_eq!(second.depth, 1);
        assert!((second.width - (stroke.width * stroke.width_decay).max(1.0)).abs() < 1e-12);
    }

    #[test]
    fn pop_undoes_decay_inside_the_branch() {
        let (stroke, angles) = params();
        let d = run("F[@F]F").unwrap();
        let (trunk, inner, after) = (d.segments[0], d.segments[1], d.segments[2]);
        assert!(inner.width < trunk.width);
        assert_eq!(after.width, trunk.width);
        assert_eq!(after.color, trunk.color);
        assert_eq!(after.depth, trunk.depth);
        let ratio = after.length() / stroke.length;
        assert!(
            (1.0 - angles.length_jitter / 2.0 - 1e-9..=1.0 + angles.length_jitter / 2.0 + 1e-9)
                .contains(&ratio),
            "length after pop should use the undecayed stroke, ratio {ratio}"
        );
    }

    #[test]
    fn decay_after_pop_starts_from_the_saved_stroke() {
        let (stroke, _) = params();
        // Two decays inside the branch, one after it: the last segment has
        // been decayed exactly once.
        let d = run("F[@@F]@F").unwrap();
        let last = d.segments[2];
        assert!((last.width - (stroke.width * stroke.width_decay).max(1.0)).abs() < 1e-12);
        assert_eq!(last.depth, 1);
        assert_eq!(last.color, run("F@F").unwrap().segments[1].color);
    }

    #[test]
    fn width_never_drops_below_floor() {
        let d = run("F@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@F").unwrap();
        assert_eq!(d.segments[1].width, MIN_STROKE_WIDTH);
    }

    #[test]
    fn color_ramps_from_bark() {
        let d = run("F@@@@@@@@@@@@F").unwrap();
        assert_eq!(d.segments[0].color, Color::from_rgb255(BARK_RGB));
        assert!(d.segments[1].color.g > d.segments[0].color.g);
    }

    #[test]
    fn underflow_is_reported() {
        assert_eq!(
            run("F]F").unwrap_err(),
            TreeError::StackUnderflow { offset: 1 }
        );
    }

    #[test]
    fn unclosed_branch_is_reported() {
        assert_eq!(
            run("F[[F]").unwrap_err(),
            TreeError::UnclosedBranches { open: 1 }
        );
    }

    #[test]
    fn empty_stream_draws_nothing() {
        let d = run("").unwrap();
        assert!(d.segments.is_empty());
        assert_eq!(d.bounds, Bounds::at(Point::ORIGIN));
    }

    #[test]
    fn expanded_stream_forms_a_valid_tree() {
        let (stroke, angles) = params();
        for n in 0..=8 {
            let stream = expand(Symbol::Grow, n).unwrap();
            let d = interpret(&stream, stroke, &angles, &mut GrowthRng::new(0)).unwrap();
            assert_eq!(d.segments.len() as u64, segment_count(n));
            assert_eq!(validate(&d.segments), Ok(()), "invalid tree at n={n}");
        }
    }

    #[test]
    fn interpretation_is_deterministic() {
        let (stroke, angles) = params();
        let stream = expand(Symbol::Grow, 7).unwrap();
        let a = interpret(&stream, stroke, &angles, &mut GrowthRng::new(0)).unwrap();
        let b = interpret(&stream, stroke, &angles, &mut GrowthRng::new(0)).unwrap();
        assert_eq!(a.segments, b.segments);
        assert_eq!(a.bounds, b.bounds);
    }
}

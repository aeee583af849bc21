// End-to-end generation: metrics in, drawing out.
//
// `generate()` runs the whole chain for one request:
//
//   MetricVector -> map() -> GrowthParameters
//     -> LSystem:       expand() -> interpret()
//     -> Colonization:  colonization::grow() -> to_segments()
//   -> validate() -> leaves::place() -> render()
//
// Both growth paths are checked with `tree::validate` before leaves are
// placed, so a broken parent link surfaces as an error here instead of as a
// strange picture. `generate_batch()` runs independent requests on the
// rayon pool.
//
// **Critical constraint: determinism.** Each call builds its own
// `GrowthRng` from `GeneratorConfig::seed` and threads it through growth
// and leaf placement in that order. Nothing is shared between calls, so
// batch results equal sequential results bit for bit.

use crate::colonization;
use crate::config::{GeneratorConfig, GrowthMode};
use crate::error::TreeError;
use crate::grammar::{self, Symbol};
use crate::leaves;
use crate::mapper::{self, GrowthParameters};
use crate::render::{self, Drawing};
use crate::tree::validate;
use crate::turtle;
use crate::types::{MetricVector, Segment};
use bonsai_prng::GrowthRng;
use rayon::prelude::*;

/// Grow the branch structure for `params` on the configured path.
pub fn grow_segments(
    params: &GrowthParameters,
    config: &GeneratorConfig,
    rng: &mut GrowthRng,
) -> Result<Vec<Segment>, TreeError> {
    let segments = match config.mode {
        GrowthMode::LSystem => {
            let stream = grammar::expand(Symbol::Grow, params.iterations)?;
            turtle::interpret(&stream, params.stroke, &params.angles, rng)?.segments
        }
        GrowthMode::Colonization => {
            let grown = colonization::grow(&params.colonization, config.use_spatial_index, rng)?;
            validate(&grown.branches)?;
            colonization::to_segments(&grown.branches, params.stroke.width)
        }
    };
    validate(&segments)?;
    Ok(segments)
}

/// Generate one tree.
pub fn generate(metrics: &MetricVector, config: &GeneratorConfig) -> Result<Drawing, TreeError> {
    let params = mapper::map(metrics);
    tracing::debug!(mode = ?config.mode, seed = config.seed, iterations = params.iterations, "generating tree");

    let mut rng = GrowthRng::new(config.seed);
    let segments = grow_segments(&params, config, &mut rng)?;
    let scale = config.scale();
    let cover = leaves::place(
        &segments,
        &params.leaves,
        &config.leaves,
        scale.min_leaf_width,
        &mut rng,
    );

    Ok(render::render(
        &segments,
        &cover.leaves,
        config.mode,
        scale,
        &config.render,
    ))
}

/// Generate one tree per metric vector, in parallel. Results come back in
/// input order.
pub fn generate_batch(
    metrics: &[MetricVector],
    config: &GeneratorConfig,
) -> Vec<Result<Drawing, TreeError>> {
    metrics.par_iter().map(|m| generate(m, config)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lsystem_segment_count_follows_iterations() {
        let params = mapper::map(&MetricVector::default());
        let segments =
            grow_segments(&params, &GeneratorConfig::default(), &mut GrowthRng::new(0)).unwrap();
        assert_eq!(segments.len() as u64, grammar::segment_count(params.iterations));
    }

    #[test]
    fn colonization_segments_start_at_origin() {
        let params = mapper::map(&MetricVector::default());
        let config = GeneratorConfig::default().with_mode(GrowthMode::Colonization);
        let segments = grow_segments(&params, &config, &mut GrowthRng::new(0)).unwrap();
        assert!(!segments.is_empty());
        assert_eq!(segments[0].start.x, 0.0);
        assert_eq!(segments[0].start.y, 0.0);
    }

    #[test]
    fn seed_changes_the_tree() {
        let config = GeneratorConfig::default();
        let other = GeneratorConfig {
            seed: 1,
            ..config.clone()
        };
        let m = MetricVector::default();
        assert_ne!(generate(&m, &config).unwrap(), generate(&m, &other).unwrap());
    }

    #[test]
    fn drawing_records_mode() {
        let config = GeneratorConfig::default().with_mode(GrowthMode::Colonization);
        let d = generate(&MetricVector::default(), &config).unwrap();
        assert_eq!(d.mode, GrowthMode::Colonization);
    }
}

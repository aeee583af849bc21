// bonsai_tree: procedural bonsai generation from text-quality metrics.
//
// Six normalized metrics (grammar accuracy, syntactic complexity, lexical
// diversity, cohesion, difficulty, informality) become a deterministic 2D
// tree: a flat list of line and ellipse primitives plus a bounding box. The
// crate does no I/O; the `render_tree` binary is a thin host that reads
// JSON and writes JSON or SVG.
//
// Module overview:
// - `types.rs`:        Point, Bounds, Color, MetricVector (+ JSON record shapes), Segment, Leaf.
// - `mapper.rs`:       Pure metric -> GrowthParameters table.
// - `grammar.rs`:      Symbol alphabet and lockstep expansion of X -> F[@[-X]+X].
// - `turtle.rs`:       Stack-machine interpretation of a symbol stream into segments.
// - `colonization.rs`: Space-colonization growth toward a crown-shaped attractor cloud.
// - `spatial.rs`:      Nearest-branch queries (linear scan and uniform grid).
// - `tree.rs`:         TreeNode trait and single-rooted-tree validation.
// - `leaves.rs`:       Leaf clusters on deep terminal segments, with a global cap.
// - `render.rs`:       Segments + leaves -> Primitive list and bounds.
// - `pipeline.rs`:     generate() / generate_batch() over the whole chain.
// - `config.rs`:       GeneratorConfig: seed, growth mode, leaf budget, per-mode scale.
// - `error.rs`:        TreeError.
// - `prng`:            Re-exported from `bonsai_prng`: xoshiro256++ with SplitMix64 seeding.
//
// **Critical constraint: determinism.** Identical metrics and config give
// bit-identical primitives. All randomness comes from a `GrowthRng` seeded
// from `GeneratorConfig::seed` and passed explicitly; ordered collections
// use `BTreeMap`; no system time, no OS entropy.

pub mod colonization;
pub mod config;
pub mod error;
pub mod grammar;
pub mod leaves;
pub mod mapper;
pub mod pipeline;
pub use bonsai_prng as prng;
pub mod render;
pub mod spatial;
pub mod tree;
pub mod turtle;
pub mod types;

pub use config::{GeneratorConfig, GrowthMode};
pub use error::TreeError;
pub use pipeline::{generate, generate_batch};
pub use render::{Drawing, Primitive};
pub use types::{MetricRecord, MetricVector};

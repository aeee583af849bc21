// Data-driven generator configuration.
//
// Everything tunable that is not part of the metric mapping lives in
// `GeneratorConfig`, loaded from JSON. The mapping table in `mapper.rs`
// stays pure and config-free; this file covers the PRNG seed, the choice of
// growth path, the leaf layout budget, and the per-path drawing scale.
//
// The two growth paths work in different units. A grammar segment is tens
// of units long while a colonization step is a few hundredths of a crown
// unit, so margins, ground overhang and the leaf size floor come in one
// `ScaleProfile` per path.
//
// See also: `pipeline.rs`, which reads every field here, `leaves.rs` for
// `LeafLayout`, `render.rs` for `RenderStyle`.
//
// **Critical constraint: determinism.** Two hosts with identical configs
// and identical metric vectors produce bit-identical drawings.

use serde::{Deserialize, Serialize};

/// Which growth algorithm produces the branch geometry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrowthMode {
    /// Grammar expansion plus turtle interpretation.
    #[default]
    LSystem,
    /// Space colonization toward an attractor cloud.
    Colonization,
}

impl GrowthMode {
    /// Parse a command-line style name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "lsystem" | "l-system" | "grammar" => Some(GrowthMode::LSystem),
            "colonization" | "space-colonization" | "sc" => Some(GrowthMode::Colonization),
            _ => None,
        }
    }
}

/// Budget and shape of the leaf pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeafLayout {
    /// Terminal segments shallower than this get no leaves.
    pub min_depth: u32,
    /// Global cap on leaf clusters per tree.
    pub max_total_clusters: u32,
    /// Inclusive range of overlapping ellipses per cluster.
    pub ellipses_per_cluster: (u32, u32),
}

impl Default for LeafLayout {
    fn default() -> Self {
        Self {
            min_depth: 3,
            max_total_clusters: 160,
            ellipses_per_cluster: (2, 4),
        }
    }
}

/// Unit-dependent constants for one growth path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaleProfile {
    /// Fixed margin added to every side of the bounding box.
    pub margin: f64,
    /// How far the ground line extends past the tree's horizontal bounds.
    pub ground_overhang: f64,
    /// Floor on the base width of a leaf ellipse.
    pub min_leaf_width: f64,
}

impl ScaleProfile {
    pub fn lsystem() -> Self {
        Self {
            margin: 20.0,
            ground_overhang: 30.0,
            min_leaf_width: 0.15,
        }
    }

    pub fn colonization() -> Self {
        Self {
            margin: 0.2,
            ground_overhang: 0.2,
            min_leaf_width: 0.04,
        }
    }
}

/// Styling of primitives that do not come from the tree itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStyle {
    /// Ground line color as 0–255 channels.
    pub ground_color: [f64; 3],
    pub ground_width: f64,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            ground_color: [68.0, 68.0, 68.0],
            ground_width: 1.0,
        }
    }
}

/// Top-level generator configuration. Loaded from JSON, never mutated
/// during a generation call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Fixed PRNG seed. Every generation call starts a fresh `GrowthRng`
    /// from this value.
    pub seed: u64,
    pub mode: GrowthMode,
    pub leaves: LeafLayout,
    pub lsystem_scale: ScaleProfile,
    pub colonization_scale: ScaleProfile,
    pub render: RenderStyle,
    /// Bucket branches in a uniform grid during colonization. Produces the
    /// same nearest-branch answers as the linear scan, only faster.
    pub use_spatial_index: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            mode: GrowthMode::LSystem,
            leaves: LeafLayout::default(),
            lsystem_scale: ScaleProfile::lsystem(),
            colonization_scale: ScaleProfile::colonization(),
            render: RenderStyle::default(),
            use_spatial_index: true,
        }
    }
}

impl GeneratorConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Same config with a different growth path.
    pub fn with_mode(&self, mode: GrowthMode) -> Self {
        Self {
            mode,
            ..self.clone()
        }
    }

    /// The scale profile for the configured growth path.
    pub fn scale(&self) -> &ScaleProfile {
        match self.mode {
            GrowthMode::LSystem => &self.lsystem_scale,
            GrowthMode::Colonization => &self.colonization_scale,
        }
    }
}

// Core types shared across the generator.
//
// Defines the planar geometry primitives (`Point`, `Bounds`), the RGBA
// `Color` used by every drawable, the clamped `MetricVector` input record
// and the two geometry outputs of the growth stage: `Segment` (a drawn
// branch piece with a parent link) and `Leaf` (an ellipse descriptor).
//
// All types derive `Serialize` so a host can ship generated geometry over
// any serde format. `MetricVector` also derives `Deserialize`, going through
// `RawMetrics` so that clamping and defaulting happen exactly once, on
// ingestion.
//
// **Critical constraint: determinism.** Everything here is plain `f64`
// arithmetic with no hidden state. Do not add fields that depend on time,
// addresses or hash iteration order.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A position in the drawing plane. Y grows upward; the trunk base sits at
/// the origin and the ground line is `y = 0`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance between two points.
    pub fn distance(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// The point `length` units away along `heading_deg` (0 = east, 90 = up).
    pub fn advance(self, heading_deg: f64, length: f64) -> Self {
        let rad = heading_deg.to_radians();
        Self {
            x: self.x + rad.cos() * length,
            y: self.y + rad.sin() * length,
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Bounds {
    /// A zero-area box at `p`.
    pub fn at(p: Point) -> Self {
        Self {
            min_x: p.x,
            max_x: p.x,
            min_y: p.y,
            max_y: p.y,
        }
    }

    pub fn include(&mut self, p: Point) {
        self.min_x = self.min_x.min(p.x);
        self.max_x = self.max_x.max(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_y = self.max_y.max(p.y);
    }

    /// Grow the box by `margin` on every side.
    pub fn expanded(self, margin: f64) -> Self {
        Self {
            min_x: self.min_x - margin,
            max_x: self.max_x + margin,
            min_y: self.min_y - margin,
            max_y: self.max_y + margin,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// An RGBA color with channels in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    /// Opaque color from 0–255 channel values. Channels are clamped.
    pub fn from_rgb255(rgb: [f64; 3]) -> Self {
        Self {
            r: rgb[0].clamp(0.0, 255.0) / 255.0,
            g: rgb[1].clamp(0.0, 255.0) / 255.0,
            b: rgb[2].clamp(0.0, 255.0) / 255.0,
            a: 1.0,
        }
    }

    /// `#rrggbb` form, ignoring alpha.
    pub fn to_hex(&self) -> String {
        let ch = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", ch(self.r), ch(self.g), ch(self.b))
    }
}

/// Componentwise linear interpolation between two 0–255 triples.
pub fn lerp_rgb(from: [f64; 3], to: [f64; 3], t: f64) -> [f64; 3] {
    [
        lerp(from[0], to[0], t),
        lerp(from[1], to[1], t),
        lerp(from[2], to[2], t),
    ]
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

// ---------------------------------------------------------------------------
// Metric input
// ---------------------------------------------------------------------------

/// Neutral value substituted for a missing or NaN `grammar_accuracy`.
pub const DEFAULT_ACCURACY: f64 = 0.7;
/// Neutral value substituted for a missing or NaN `syntactic_complexity`.
pub const DEFAULT_COMPLEXITY: f64 = 0.5;
/// Neutral value substituted for a missing or NaN `lexical_diversity`.
pub const DEFAULT_DIVERSITY: f64 = 0.7;
/// Neutral value substituted for a missing or NaN `cohesion`.
pub const DEFAULT_COHESION: f64 = 0.5;
/// Neutral value substituted for a missing or NaN `text_difficulty`.
pub const DEFAULT_DIFFICULTY: f64 = 0.5;
/// Neutral value substituted for a missing or NaN `register_informality`.
pub const DEFAULT_INFORMALITY: f64 = 0.2;
/// Neutral value substituted for a missing or NaN auxiliary `maturity`.
pub const DEFAULT_MATURITY: f64 = 0.5;

/// The six normalized text metrics that drive tree growth, plus the
/// auxiliary maturity signal used only by the colonization mapping.
///
/// Immutable once constructed: every field is clamped to [0, 1] by
/// `MetricVector::new` (and by deserialization, which routes through it).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawMetrics")]
pub struct MetricVector {
    #[serde(rename = "grammar_accuracy")]
    accuracy: f64,
    #[serde(rename = "syntactic_complexity")]
    complexity: f64,
    #[serde(rename = "lexical_diversity")]
    diversity: f64,
    cohesion: f64,
    #[serde(rename = "text_difficulty")]
    difficulty: f64,
    #[serde(rename = "register_informality")]
    informality: f64,
    maturity: f64,
}

impl MetricVector {
    /// Build a vector from the six metrics in canonical order. Out-of-range
    /// values are clamped, NaN falls back to the field's neutral default.
    /// Maturity is set to its neutral default; see `with_maturity`.
    pub fn new(
        accuracy: f64,
        complexity: f64,
        diversity: f64,
        cohesion: f64,
        difficulty: f64,
        informality: f64,
    ) -> Self {
        Self {
            accuracy: sanitize(accuracy, DEFAULT_ACCURACY),
            complexity: sanitize(complexity, DEFAULT_COMPLEXITY),
            diversity: sanitize(diversity, DEFAULT_DIVERSITY),
            cohesion: sanitize(cohesion, DEFAULT_COHESION),
            difficulty: sanitize(difficulty, DEFAULT_DIFFICULTY),
            informality: sanitize(informality, DEFAULT_INFORMALITY),
            maturity: DEFAULT_MATURITY,
        }
    }

    /// Copy of `self` with the auxiliary maturity signal set (clamped).
    pub fn with_maturity(self, maturity: f64) -> Self {
        Self {
            maturity: sanitize(maturity, DEFAULT_MATURITY),
            ..self
        }
    }

    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    pub fn complexity(&self) -> f64 {
        self.complexity
    }

    pub fn diversity(&self) -> f64 {
        self.diversity
    }

    pub fn cohesion(&self) -> f64 {
        self.cohesion
    }

    pub fn difficulty(&self) -> f64 {
        self.difficulty
    }

    pub fn informality(&self) -> f64 {
        self.informality
    }

    pub fn maturity(&self) -> f64 {
        self.maturity
    }
}

impl Default for MetricVector {
    fn default() -> Self {
        RawMetrics::default().into()
    }
}

fn sanitize(value: f64, default: f64) -> f64 {
    if value.is_nan() {
        default
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Unvalidated metric record as it arrives over the wire. Every field is
/// optional; unknown keys (other dimensions the upstream analysis emits,
/// such as `written_formality`) are ignored.
///
/// A field that is not a usable number reads as missing, so it falls back to
/// its neutral default without disturbing its neighbours. Numeric strings
/// such as `"0.8"` are accepted.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawMetrics {
    #[serde(deserialize_with = "lenient_metric")]
    pub grammar_accuracy: Option<f64>,
    #[serde(deserialize_with = "lenient_metric")]
    pub syntactic_complexity: Option<f64>,
    #[serde(deserialize_with = "lenient_metric")]
    pub lexical_diversity: Option<f64>,
    #[serde(deserialize_with = "lenient_metric")]
    pub cohesion: Option<f64>,
    #[serde(deserialize_with = "lenient_metric")]
    pub text_difficulty: Option<f64>,
    #[serde(deserialize_with = "lenient_metric")]
    pub register_informality: Option<f64>,
    #[serde(deserialize_with = "lenient_metric")]
    pub maturity: Option<f64>,
}

/// A number, a string holding a number, or anything else (read as `None`).
fn lenient_metric<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Number(f64),
        Text(String),
        Other(IgnoredAny),
    }

    Ok(match Loose::deserialize(deserializer)? {
        Loose::Number(v) => Some(v),
        Loose::Text(text) => text.trim().parse().ok(),
        Loose::Other(_) => None,
    })
}

impl From<RawMetrics> for MetricVector {
    fn from(raw: RawMetrics) -> Self {
        let v = MetricVector::new(
            raw.grammar_accuracy.unwrap_or(DEFAULT_ACCURACY),
            raw.syntactic_complexity.unwrap_or(DEFAULT_COMPLEXITY),
            raw.lexical_diversity.unwrap_or(DEFAULT_DIVERSITY),
            raw.cohesion.unwrap_or(DEFAULT_COHESION),
            raw.text_difficulty.unwrap_or(DEFAULT_DIFFICULTY),
            raw.register_informality.unwrap_or(DEFAULT_INFORMALITY),
        );
        v.with_maturity(raw.maturity.unwrap_or(DEFAULT_MATURITY))
    }
}

/// The metric record in either shape the upstream analysis produces: the
/// bare dimension map, or a summary with the dimensions nested under `dims`
/// and the maturity score beside them. The shape is chosen by the presence
/// of a `dims` key, never by whether the values happen to parse.
#[derive(Clone, Debug, Deserialize)]
#[serde(from = "RecordEnvelope")]
pub enum MetricRecord {
    Summary {
        dims: RawMetrics,
        maturity: Option<f64>,
    },
    Dims(RawMetrics),
}

/// Both record shapes at once: `dims` if present, plus every top-level key.
#[derive(Deserialize)]
struct RecordEnvelope {
    #[serde(default)]
    dims: Option<RawMetrics>,
    #[serde(flatten)]
    top: RawMetrics,
}

impl From<RecordEnvelope> for MetricRecord {
    fn from(envelope: RecordEnvelope) -> Self {
        match envelope.dims {
            Some(dims) => MetricRecord::Summary {
                dims,
                maturity: envelope.top.maturity,
            },
            None => MetricRecord::Dims(envelope.top),
        }
    }
}

impl From<MetricRecord> for MetricVector {
    fn from(record: MetricRecord) -> Self {
        match record {
            MetricRecord::Summary { mut dims, maturity } => {
                dims.maturity = dims.maturity.or(maturity);
                dims.into()
            }
            MetricRecord::Dims(dims) => dims.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Growth output
// ---------------------------------------------------------------------------

/// One drawn piece of wood: a straight line from `start` to `end`.
///
/// `parent` is the index of the segment this one grows out of in the same
/// collection; the first segment is the root and has none. Parents always
/// precede their children, so a collection is a tree in append order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
    pub depth: u32,
    pub parent: Option<usize>,
    pub width: f64,
    pub color: Color,
}

impl Segment {
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    /// Direction of travel in degrees (0 = east, 90 = up).
    pub fn heading_deg(&self) -> f64 {
        (self.end.y - self.start.y)
            .atan2(self.end.x - self.start.x)
            .to_degrees()
    }
}

/// A filled leaf ellipse. `rotation_deg` turns the width axis
/// counter-clockwise from east.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Leaf {
    pub center: Point,
    pub width: f64,
    pub height: f64,
    pub rotation_deg: f64,
    pub color: Color,
}

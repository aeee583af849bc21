// Conversion of grown geometry into drawing primitives.
//
// `render()` is the last pipeline stage and the only output format the
// library defines: a flat list of `Primitive`s plus a bounding box. Order is
// fixed (every segment as a line, in segment order; every leaf as an
// ellipse, in leaf order; one ground line last) so two drawings can be
// compared primitive by primitive.
//
// The ground line sits at y = 0 and spans the tree's horizontal extent plus
// `ScaleProfile::ground_overhang` on each side. The bounding box covers all
// segment endpoints, leaf extents and the ground line, then grows by
// `ScaleProfile::margin` on every side.
//
// Turning primitives into pixels, SVG or UI calls is the host's job; see
// `bin/render_tree.rs` for an SVG writer.

use crate::config::{GrowthMode, RenderStyle, ScaleProfile};
use crate::types::{Bounds, Color, Leaf, Point, Segment};
use serde::Serialize;

/// One drawing instruction. Coordinates are y-up.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Primitive {
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        width: f64,
        color: Color,
    },
    /// Filled ellipse; `rotation` is degrees counter-clockwise.
    Ellipse {
        cx: f64,
        cy: f64,
        w: f64,
        h: f64,
        rotation: f64,
        color: Color,
    },
}

/// A finished tree, ready for a host to draw.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Drawing {
    pub primitives: Vec<Primitive>,
    pub bounds: Bounds,
    pub mode: GrowthMode,
}

impl Drawing {
    pub fn lines(&self) -> impl Iterator<Item = &Primitive> {
        self.primitives
            .iter()
            .filter(|p| matches!(p, Primitive::Line { .. }))
    }

    pub fn ellipses(&self) -> impl Iterator<Item = &Primitive> {
        self.primitives
            .iter()
            .filter(|p| matches!(p, Primitive::Ellipse { .. }))
    }
}

/// Build the primitive list and bounds. Never mutates its inputs.
pub fn render(
    segments: &[Segment],
    leaves: &[Leaf],
    mode: GrowthMode,
    scale: &ScaleProfile,
    style: &RenderStyle,
) -> Drawing {
    let mut primitives = Vec::with_capacity(segments.len() + leaves.len() + 1);
    let mut bounds = Bounds::at(Point::ORIGIN);

    for s in segments {
        bounds.include(s.start);
        bounds.include(s.end);
        primitives.push(Primitive::Line {
            x1: s.start.x,
            y1: s.start.y,
            x2: s.end.x,
            y2: s.end.y,
            width: s.width,
            color: s.color,
        });
    }

    for leaf in leaves {
        // Half the long axis bounds the ellipse whatever its rotation.
        let r = leaf.width.max(leaf.height) / 2.0;
        bounds.include(Point::new(leaf.center.x - r, leaf.center.y - r));
        bounds.include(Point::new(leaf.center.x + r, leaf.center.y + r));
        primitives.push(Primitive::Ellipse {
            cx: leaf.center.x,
            cy: leaf.center.y,
            w: leaf.width,
            h: leaf.height,
            rotation: leaf.rotation_deg,
            color: leaf.color,
        });
    }

    let x1 = bounds.min_x - scale.ground_overhang;
    let x2 = bounds.max_x + scale.ground_overhang;
    bounds.include(Point::new(x1, 0.0));
    bounds.include(Point::new(x2, 0.0));
    primitives.push(Primitive::Line {
        x1,
        y1: 0.0,
        x2,
        y2: 0.0,
        width: style.ground_width,
        color: Color::from_rgb255(style.ground_color),
    });

    Drawing {
        primitives,
        bounds: bounds.expanded(scale.margin),
        mode,
    }
}

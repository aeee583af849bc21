// Nearest-branch queries for space colonization.
//
// Each colonization round asks, for every active attractor: is any branch
// within the kill radius, and if not, which branch is nearest within the
// influence radius? `nearest_linear()` answers by scanning every branch in
// index order. `BranchGrid` buckets branches into square cells one influence
// radius wide so a query only inspects the 3x3 block of cells around the
// attractor.
//
// The grid must give exactly the linear scan's answer, including ties:
// - `Reached` names the lowest-indexed branch inside the kill radius.
// - `Influenced` names the nearest branch inside the influence radius,
//   lowest index first among equal distances.
//
// **Critical constraint: determinism.** The hash map is only used for
// lookups; candidate order never leaks into the answer.

use crate::types::Point;
use rustc_hash::FxHashMap;

/// Result of a nearest-branch query for one attractor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Proximity {
    /// A branch is inside the kill radius; the attractor is consumed.
    Reached(usize),
    /// The nearest branch inside the influence radius.
    Influenced(usize),
    /// No branch is close enough to matter.
    Distant,
}

/// Scan all branches in index order.
pub fn nearest_linear(
    target: Point,
    branches: &[Point],
    kill_radius: f64,
    influence_radius: f64,
) -> Proximity {
    let mut best: Option<(usize, f64)> = None;
    for (i, &p) in branches.iter().enumerate() {
        let d = target.distance(p);
        if d < kill_radius {
            return Proximity::Reached(i);
        }
        if d < influence_radius && best.is_none_or(|(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    best.map_or(Proximity::Distant, |(i, _)| Proximity::Influenced(i))
}

/// Uniform grid over branch positions.
pub struct BranchGrid {
    cell: f64,
    cells: FxHashMap<(i64, i64), Vec<usize>>,
}

impl BranchGrid {
    /// Create an empty grid for the given radii. Returns `None` when the
    /// radii are degenerate (non-positive or non-finite), in which case the
    /// caller should fall back to the linear scan.
    pub fn new(kill_radius: f64, influence_radius: f64) -> Option<Self> {
        let cell = kill_radius.max(influence_radius);
        (cell > 0.0 && cell.is_finite()).then(|| Self {
            cell,
            cells: FxHashMap::default(),
        })
    }

    fn key(&self, p: Point) -> (i64, i64) {
        ((p.x / self.cell).floor() as i64, (p.y / self.cell).floor() as i64)
    }

    pub fn insert(&mut self, index: usize, p: Point) {
        let key = self.key(p);
        self.cells.entry(key).or_default().push(index);
    }

    /// Same answer as `nearest_linear` over the inserted branches.
    pub fn nearest(
        &self,
        target: Point,
        branches: &[Point],
        kill_radius: f64,
        influence_radius: f64,
    ) -> Proximity {
        let (cx, cy) = self.key(target);
        let mut reached: Option<usize> = None;
        let mut best: Option<(usize, f64)> = None;

        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(bucket) = self.cells.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for &i in bucket {
                    let d = target.distance(branches[i]);
                    if d < kill_radius {
                        reached = Some(reached.map_or(i, |r| r.min(i)));
                    } else if d < influence_radius
                        && best.is_none_or(|(bi, bd)| d < bd || (d == bd && i < bi))
                    {
                        best = Some((i, d));
                    }
                }
            }
        }

        match (reached, best) {
            (Some(i), _) => Proximity::Reached(i),
            (None, Some((i, _))) => Proximity::Influenced(i),
            (None, None) => Proximity::Distant,
        }
    }
}

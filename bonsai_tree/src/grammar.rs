// L-system grammar expansion.
//
// The tree grammar has a single production, applied to every growth symbol
// in lockstep each iteration:
//
//   X -> F[@[-X]+X]
//
// Every other symbol is copied through unchanged. Each growth symbol doubles
// per iteration, so the stream grows geometrically; `MAX_ITERATIONS` is the
// largest count the parameter mapper ever requests, and the closed-form
// helpers below give exact stream statistics for any count.
//
// See also: `turtle.rs`, which walks the expanded stream and turns it into
// segments, and `mapper.rs`, which picks the iteration count.

use crate::error::TreeError;
use serde::Serialize;
use std::fmt;

/// Largest iteration count the mapper produces. At this depth the stream is
/// 18424 symbols long.
pub const MAX_ITERATIONS: u32 = 11;

/// One instruction in the tree alphabet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Symbol {
    /// `X`: growth bud. Rewritten by the production; drawn as a terminal
    /// segment when interpretation reaches it.
    Grow,
    /// `F`: draw forward.
    Forward,
    /// `+`: turn counter-clockwise.
    TurnLeft,
    /// `-`: turn clockwise.
    TurnRight,
    /// `[`: save turtle state.
    Push,
    /// `]`: restore turtle state.
    Pop,
    /// `@`: shrink length, width and color and go one level deeper.
    Decay,
}

impl Symbol {
    pub fn as_char(self) -> char {
        match self {
            Symbol::Grow => 'X',
            Symbol::Forward => 'F',
            Symbol::TurnLeft => '+',
            Symbol::TurnRight => '-',
            Symbol::Push => '[',
            Symbol::Pop => ']',
            Symbol::Decay => '@',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'X' => Symbol::Grow,
            'F' => Symbol::Forward,
            '+' => Symbol::TurnLeft,
            '-' => Symbol::TurnRight,
            '[' => Symbol::Push,
            ']' => Symbol::Pop,
            '@' => Symbol::Decay,
            _ => return None,
        })
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Right-hand side of the growth production.
const GROW_RULE: [Symbol; 10] = [
    Symbol::Forward,
    Symbol::Push,
    Symbol::Decay,
    Symbol::Push,
    Symbol::TurnRight,
    Symbol::Grow,
    Symbol::Pop,
    Symbol::TurnLeft,
    Symbol::Grow,
    Symbol::Pop,
];

/// Expand `axiom` by applying the growth production `iterations` times.
///
/// The axiom must be `Symbol::Grow`. Callers are responsible for bounding
/// `iterations` (see `MAX_ITERATIONS`); the stream length is
/// `stream_len(iterations)`.
pub fn expand(axiom: Symbol, iterations: u32) -> Result<Vec<Symbol>, TreeError> {
    if axiom != Symbol::Grow {
        return Err(TreeError::InvalidAxiom { found: axiom });
    }

    let mut current = vec![axiom];
    for _ in 0..iterations {
        let buds = current.iter().filter(|&&s| s == Symbol::Grow).count();
        let mut next = Vec::with_capacity(current.len() + buds * (GROW_RULE.len() - 1));
        for &sym in &current {
            if sym == Symbol::Grow {
                next.extend_from_slice(&GROW_RULE);
            } else {
                next.push(sym);
            }
        }
        current = next;
    }

    tracing::debug!(iterations, stream_len = current.len(), "expanded tree grammar");
    Ok(current)
}

/// Exact stream length after `iterations` rewrites of a single `X`:
/// `9 * 2^n - 8`. Saturates instead of overflowing for absurd counts.
pub fn stream_len(iterations: u32) -> u64 {
    buds(iterations).saturating_mul(9).saturating_sub(8)
}

/// Number of `[` (and, equally, `]`) symbols after `iterations` rewrites:
/// each rewrite contributes two pairs.
pub fn push_count(iterations: u32) -> u64 {
    buds(iterations).saturating_sub(1).saturating_mul(2)
}

/// Number of drawn segments the turtle emits for the stream: every `F`
/// plus every surviving `X`, i.e. `2^(n+1) - 1`.
pub fn segment_count(iterations: u32) -> u64 {
    buds(iterations).saturating_mul(2).saturating_sub(1)
}

/// Number of `X` symbols after `iterations` rewrites.
fn buds(iterations: u32) -> u64 {
    1u64.checked_shl(iterations)
        .filter(|_| iterations < 63)
        .unwrap_or(u64::MAX)
}

/// Parse a textual stream, skipping characters outside the alphabet.
pub fn parse_stream(text: &str) -> Vec<Symbol> {
    text.chars().filter_map(Symbol::from_char).collect()
}

/// Textual form of a stream, e.g. `F[@[-X]+X]`.
pub fn stream_to_string(stream: &[Symbol]) -> String {
    stream.iter().map(|s| s.as_char()).collect()
}

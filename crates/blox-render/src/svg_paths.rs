//! Small builders for SVG path-data fragments.
//!
//! Every fragment carries its own surrounding spaces so fragments can be
//! concatenated directly.

use kurbo::Vec2;

/// Format a coordinate, folding `-0` into `0`.
fn num(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

/// `" x,y "`.
pub fn point(x: f64, y: f64) -> String {
    format!(" {},{} ", num(x), num(y))
}

fn points(pts: &[Vec2]) -> String {
    pts.iter().map(|p| point(p.x, p.y)).collect()
}

/// A curve command (`c`, `s`, `q`, …) through the given points.
pub fn curve(command: &str, pts: &[Vec2]) -> String {
    format!(" {command}{}", points(pts))
}

pub fn move_to(x: f64, y: f64) -> String {
    format!(" M {},{} ", num(x), num(y))
}

pub fn move_by(dx: f64, dy: f64) -> String {
    format!(" m {},{} ", num(dx), num(dy))
}

pub fn line_to(dx: f64, dy: f64) -> String {
    format!(" l {},{} ", num(dx), num(dy))
}

/// Relative polyline through the given offsets.
pub fn line(pts: &[Vec2]) -> String {
    format!(" l{}", points(pts))
}

/// A single-axis line: `H`/`h`/`V`/`v`.
pub fn line_on_axis(command: &str, value: f64) -> String {
    format!(" {command} {} ", num(value))
}

/// Circular arc. `flags` is `"rotation large,sweep"`, e.g. `"0 0,1"`.
pub fn arc(command: &str, flags: &str, radius: f64, x: f64, y: f64) -> String {
    format!("{command} {radius} {radius} {flags}{}", point(x, y))
}

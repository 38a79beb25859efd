//! One-shot decorative fracture patterns. Nothing here is simulated.

use glam::Vec2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::math::{centroid, signed_area};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FracturePattern {
    /// Wedges around the centre, like a shattered pane.
    Radial { pieces: usize },
    /// Jittered lattice over the square.
    Grid { cols: usize, rows: usize },
}

/// One piece of a fractured surface.
#[derive(Clone, Debug, PartialEq)]
pub struct Fragment {
    pub polygon: Vec<Vec2>,
    pub centroid: Vec2,
    pub rotation: f32,
    /// Suggested initial velocity, outward from the impact and faster near it.
    pub velocity: Vec2,
}

impl Fragment {
    fn new(polygon: Vec<Vec2>, center: Vec2, size: f32, rng: &mut ChaCha8Rng) -> Self {
        let c = centroid(&polygon);
        let offset = c - center;
        let d = offset.length();
        let dir = if d > 1e-6 { offset / d } else { Vec2::X };
        let speed = size * 2.0 / (1.0 + d / size.max(1e-3));
        Self {
            polygon,
            centroid: c,
            rotation: rng.gen_range(0.0..std::f32::consts::TAU),
            velocity: dir * speed,
        }
    }

    pub fn area(&self) -> f32 {
        signed_area(&self.polygon).abs()
    }
}

/// Break a `size` x `size` surface centred on `center` into fragments.
///
/// Radial wedges reach out to `size / 2` with jittered rim radii. Grid cells
/// share their jittered interior corners, so the pieces tile the square.
pub fn fracture_surface(
    center: Vec2,
    size: f32,
    pattern: FracturePattern,
    rng: &mut ChaCha8Rng,
) -> Vec<Fragment> {
    if !(size > 0.0 && size.is_finite()) {
        return Vec::new();
    }
    match pattern {
        FracturePattern::Radial { pieces } => radial(center, size, pieces, rng),
        FracturePattern::Grid { cols, rows } => grid(center, size, cols, rows, rng),
    }
}

fn radial(center: Vec2, size: f32, pieces: usize, rng: &mut ChaCha8Rng) -> Vec<Fragment> {
    let pieces = pieces.max(3);
    let step = std::f32::consts::TAU / pieces as f32;
    let half = size * 0.5;
    let rim: Vec<Vec2> = (0..pieces)
        .map(|i| {
            let angle = step * i as f32 + rng.gen_range(-0.3..0.3) * step;
            let r = half * rng.gen_range(0.8..1.0);
            center + Vec2::new(angle.cos(), angle.sin()) * r
        })
        .collect();

    (0..pieces)
        .map(|i| {
            let poly = vec![center, rim[i], rim[(i + 1) % pieces]];
            Fragment::new(poly, center, size, rng)
        })
        .collect()
}

fn grid(center: Vec2, size: f32, cols: usize, rows: usize, rng: &mut ChaCha8Rng) -> Vec<Fragment> {
    let cols = cols.max(1);
    let rows = rows.max(1);
    let cell = Vec2::new(size / cols as f32, size / rows as f32);
    let origin = center - Vec2::splat(size * 0.5);

    // Shared lattice, border vertices stay on the border
    let mut lattice = Vec::with_capacity((cols + 1) * (rows + 1));
    for row in 0..=rows {
        for col in 0..=cols {
            let mut p = origin + Vec2::new(col as f32, row as f32) * cell;
            if col > 0 && col < cols {
                p.x += rng.gen_range(-0.3..0.3) * cell.x;
            }
            if row > 0 && row < rows {
                p.y += rng.gen_range(-0.3..0.3) * cell.y;
            }
            lattice.push(p);
        }
    }

    let at = |col: usize, row: usize| lattice[row * (cols + 1) + col];
    let mut out = Vec::with_capacity(cols * rows);
    for row in 0..rows {
        for col in 0..cols {
            let poly = vec![at(col, row), at(col + 1, row), at(col + 1, row + 1), at(col, row + 1)];
            out.push(Fragment::new(poly, center, size, rng));
        }
    }
    out
}

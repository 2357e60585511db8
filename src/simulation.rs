use crate::grid::{Lattice, Rule};

/// Advance the lattice by one generation on the CPU using the given rule.
///
/// Every cell reads only the previous generation, so the result does not
/// depend on visiting order. Positions beyond the lattice faces are dead.
pub fn step(lattice: &Lattice, rule: &Rule) -> Lattice {
    let sums = neighbor_sums(lattice);
    let next = sums.iter().map(|&s| rule.next_state(s)).collect();
    Lattice::from_cells(lattice.size(), next)
}

/// Count live cells in the 3×3×3 cube around every cell, the cell included.
///
/// Computed as three 1-D box passes (x, then y, then z) with zero padding,
/// which equals the 27-position count. Values lie in `0..=27`.
pub fn neighbor_sums(lattice: &Lattice) -> Vec<u8> {
    let size = lattice.size();
    let mut a = lattice.cells().to_vec();
    let mut b = vec![0u8; a.len()];

    box_pass(&a, &mut b, size, 1);
    box_pass(&b, &mut a, size, size);
    box_pass(&a, &mut b, size, size * size);
    b
}

/// Sum each cell with its two neighbors along the axis of the given stride.
fn box_pass(src: &[u8], dst: &mut [u8], size: usize, stride: usize) {
    for (idx, out) in dst.iter_mut().enumerate() {
        let along = (idx / stride) % size;
        let mut sum = src[idx];
        if along > 0 {
            sum += src[idx - stride];
        }
        if along + 1 < size {
            sum += src[idx + stride];
        }
        *out = sum;
    }
}

/// Owns a lattice and a rule and advances them generation by generation.
#[derive(Debug, Clone)]
pub struct Simulation {
    lattice: Lattice,
    rule: Rule,
    pub generation: u32,
}

impl Simulation {
    pub fn new(lattice: Lattice, rule: Rule) -> Self {
        Self {
            lattice,
            rule,
            generation: 0,
        }
    }

    /// Replace the lattice with its successor.
    pub fn step(&mut self) {
        self.lattice = step(&self.lattice, &self.rule);
        self.generation += 1;
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }
}

use std::fmt;

use crate::error::{Error, Result};

/// Number of neighborhood sums a rule can address (sums 0-7).
pub const RULE_ARITY: usize = 8;

/// Number of rules in the low-count totalistic family.
pub const RULE_COUNT: usize = 1 << RULE_ARITY;

/// A low-count totalistic rule.
///
/// The decision for neighborhood sum `s` is bit `s` of the rule number, so
/// rule 54 (`0b00110110`) is live for sums 1, 2, 4 and 5. Sums of 8 or more
/// have no entry here; the engine forces them dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rule {
    number: u8,
    decisions: [bool; RULE_ARITY],
}

impl Rule {
    /// Validate a rule number and unpack its decision vector.
    pub fn encode(number: i64) -> Result<Self> {
        let number = u8::try_from(number).map_err(|_| Error::RuleOutOfRange(number))?;
        Ok(Self::from_number(number))
    }

    /// Unpack a rule number that is already known to be in range.
    pub fn from_number(number: u8) -> Self {
        let mut decisions = [false; RULE_ARITY];
        for (sum, decision) in decisions.iter_mut().enumerate() {
            *decision = (number >> sum) & 1 == 1;
        }
        Self { number, decisions }
    }

    /// All 256 rules in ascending order.
    pub fn all() -> impl Iterator<Item = Rule> {
        (0..RULE_COUNT).map(|n| Rule::from_number(n as u8))
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    /// The live/dead decision for each neighborhood sum 0-7.
    pub fn decisions(&self) -> &[bool; RULE_ARITY] {
        &self.decisions
    }

    /// Next state of a cell whose 27-cell neighborhood holds `sum` live cells.
    #[inline]
    pub fn next_state(&self, sum: u8) -> u8 {
        match self.decisions.get(sum as usize) {
            Some(&live) => u8::from(live),
            None => 0,
        }
    }

    /// Binary form with the sum-7 bit first, e.g. `00110110` for rule 54.
    pub fn binary(&self) -> String {
        format!("{:08b}", self.number)
    }

    /// Short label used in file names and overlays.
    pub fn label(&self) -> String {
        format!("R{}", self.number)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rule {} ({})", self.number, self.binary())
    }
}

/// Validate a lattice side length.
pub fn check_size(size: usize) -> Result<()> {
    if size == 0 || size % 2 == 0 {
        return Err(Error::InvalidLatticeSize(size));
    }
    Ok(())
}

/// A cubic lattice of binary cells with dead cells beyond its faces.
///
/// Cells are stored x-fastest: `index = (z * size + y) * size + x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lattice {
    size: usize,
    cells: Vec<u8>,
}

impl Lattice {
    /// An all-dead lattice of side `size`.
    pub fn empty(size: usize) -> Result<Self> {
        check_size(size)?;
        Ok(Self {
            size,
            cells: vec![0; size * size * size],
        })
    }

    /// An all-dead lattice except for a single live cell at the center.
    pub fn seeded(size: usize) -> Result<Self> {
        let mut lattice = Self::empty(size)?;
        let c = lattice.center();
        lattice.set(c, c, c, true);
        Ok(lattice)
    }

    pub(crate) fn from_cells(size: usize, cells: Vec<u8>) -> Self {
        debug_assert_eq!(cells.len(), size * size * size);
        Self { size, cells }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Coordinate of the center cell along each axis.
    pub fn center(&self) -> usize {
        self.size / 2
    }

    /// Total number of cells, `size^3`.
    pub fn volume(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.size + y) * self.size + x
    }

    /// Inverse of [`Lattice::index`].
    #[inline]
    pub fn coords(&self, index: usize) -> (usize, usize, usize) {
        let x = index % self.size;
        let y = (index / self.size) % self.size;
        let z = index / (self.size * self.size);
        (x, y, z)
    }

    /// Cell state; coordinates outside the lattice read as dead.
    pub fn get(&self, x: i64, y: i64, z: i64) -> bool {
        let n = self.size as i64;
        if x < 0 || y < 0 || z < 0 || x >= n || y >= n || z >= n {
            return false;
        }
        self.cells[self.index(x as usize, y as usize, z as usize)] == 1
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, alive: bool) {
        let idx = self.index(x, y, z);
        self.cells[idx] = u8::from(alive);
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Count live cells.
    pub fn population(&self) -> u64 {
        self.cells.iter().map(|&c| u64::from(c)).sum()
    }

    /// One z-plane as a row-major `size * size` slice.
    pub fn slice_z(&self, z: usize) -> &[u8] {
        let plane = self.size * self.size;
        &self.cells[z * plane..(z + 1) * plane]
    }
}

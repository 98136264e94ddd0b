//! Layout of the decision variables of one time step
//!
//! The variables are laid out as five contiguous blocks: steady state basis coefficients,
//! log-concentrations, loop law terms, Gibbs energy error terms and Gibbs energies.
//! Auxiliary variables added by the objective follow after the last block.
use std::ops::Range;

use crate::optimize::problem::{Problem, ProblemError};

/// One of the five variable blocks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Block {
    /// One coefficient per steady state basis vector
    Flux,
    /// One log-concentration per species
    Concentration,
    /// One loop law term per steady state basis vector
    LoopLaw,
    /// One Gibbs energy error term per reaction
    Error,
    /// One Gibbs energy per reaction
    Gibbs,
}

impl Block {
    pub const ALL: [Block; 5] = [
        Block::Flux,
        Block::Concentration,
        Block::LoopLaw,
        Block::Error,
        Block::Gibbs,
    ];

    /// Prefix of the ids of the variables in the block
    pub fn prefix(&self) -> &'static str {
        match self {
            Block::Flux => "c",
            Block::Concentration => "x",
            Block::LoopLaw => "L",
            Block::Error => "e",
            Block::Gibbs => "G",
        }
    }
}

/// Bounds applied to every variable of a block
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockBounds {
    pub flux: (f64, f64),
    pub log_concentration: (f64, f64),
    /// Symmetric magnitude for the loop law, error and Gibbs blocks
    pub unbounded_magnitude: f64,
}

impl BlockBounds {
    pub fn of(&self, block: Block) -> (f64, f64) {
        match block {
            Block::Flux => self.flux,
            Block::Concentration => self.log_concentration,
            Block::LoopLaw | Block::Error | Block::Gibbs => {
                (-self.unbounded_magnitude, self.unbounded_magnitude)
            }
        }
    }
}

/// Index ranges of the five variable blocks
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableBlocks {
    flux: Range<usize>,
    concentration: Range<usize>,
    loop_law: Range<usize>,
    error: Range<usize>,
    gibbs: Range<usize>,
}

impl VariableBlocks {
    pub fn new(num_vectors: usize, num_species: usize, num_reactions: usize) -> Self {
        let flux = 0..num_vectors;
        let concentration = flux.end..flux.end + num_species;
        let loop_law = concentration.end..concentration.end + num_vectors;
        let error = loop_law.end..loop_law.end + num_reactions;
        let gibbs = error.end..error.end + num_reactions;
        VariableBlocks {
            flux,
            concentration,
            loop_law,
            error,
            gibbs,
        }
    }

    /// Index range of a block
    pub fn range(&self, block: Block) -> Range<usize> {
        match block {
            Block::Flux => self.flux.clone(),
            Block::Concentration => self.concentration.clone(),
            Block::LoopLaw => self.loop_law.clone(),
            Block::Error => self.error.clone(),
            Block::Gibbs => self.gibbs.clone(),
        }
    }

    /// Number of variables in the five blocks
    pub fn len(&self) -> usize {
        self.gibbs.end
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coefficient of basis vector `k`
    pub fn flux(&self, k: usize) -> usize {
        self.flux.start + k
    }

    /// Log-concentration of species `i`
    pub fn concentration(&self, i: usize) -> usize {
        self.concentration.start + i
    }

    /// Loop law term of basis vector `k`
    pub fn loop_law(&self, k: usize) -> usize {
        self.loop_law.start + k
    }

    /// Gibbs energy error term of reaction `j`
    pub fn error(&self, j: usize) -> usize {
        self.error.start + j
    }

    /// Gibbs energy of reaction `j`
    pub fn gibbs(&self, j: usize) -> usize {
        self.gibbs.start + j
    }

    /// The values of one block in a solution vector
    pub fn slice<'a>(&self, block: Block, values: &'a [f64]) -> &'a [f64] {
        &values[self.range(block)]
    }

    /// Add the variables of every block to an empty problem, in block order
    pub fn declare(&self, problem: &mut Problem, bounds: &BlockBounds) -> Result<(), ProblemError> {
        for block in Block::ALL {
            let (lower, upper) = bounds.of(block);
            for (offset, index) in self.range(block).enumerate() {
                let id = format!("{}_{}", block.prefix(), offset);
                let added = problem.add_variable(&id, lower, upper)?;
                debug_assert_eq!(added, index);
            }
        }
        Ok(())
    }
}

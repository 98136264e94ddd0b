//! Restructuring of a reaction network ahead of steady state flux analysis
//!
//! The three steps are applied in order by [`crate::network::AugmentedNetwork::build`]:
//! transport reactions are removed, reversible reactions are split into two irreversible
//! halves, and one exchange reaction is added for every species that the split network
//! produces or consumes on balance.
use indexmap::IndexMap;
use log::debug;

use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::{Reaction, ReactionKind};
use crate::network::stoichiometry::StoichiometricMatrix;

/// Pairing between the two halves of every split reversible reaction
///
/// Indices are reaction positions in the split network.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReverseIndexMap {
    /// forward index -> backward index, in forward order
    forward_to_backward: IndexMap<usize, usize>,
    /// backward index -> forward index
    backward_to_forward: IndexMap<usize, usize>,
}

impl ReverseIndexMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `backward` is the reverse half of `forward`
    pub fn insert(&mut self, forward: usize, backward: usize) {
        self.forward_to_backward.insert(forward, backward);
        self.backward_to_forward.insert(backward, forward);
    }

    /// Backward half of a forward reaction
    pub fn backward_of(&self, forward: usize) -> Option<usize> {
        self.forward_to_backward.get(&forward).copied()
    }

    /// Forward half of a backward reaction
    pub fn forward_of(&self, backward: usize) -> Option<usize> {
        self.backward_to_forward.get(&backward).copied()
    }

    /// The other half of a split reaction, whichever half `index` is
    pub fn partner(&self, index: usize) -> Option<usize> {
        self.backward_of(index).or_else(|| self.forward_of(index))
    }

    /// Whether the two reactions are the halves of one split reaction
    pub fn are_partners(&self, a: usize, b: usize) -> bool {
        self.backward_of(a) == Some(b) || self.backward_of(b) == Some(a)
    }

    pub fn is_backward(&self, index: usize) -> bool {
        self.backward_to_forward.contains_key(&index)
    }

    /// Iterator over (forward, backward) pairs
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.forward_to_backward.iter().map(|(f, b)| (*f, *b))
    }

    pub fn len(&self) -> usize {
        self.forward_to_backward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward_to_backward.is_empty()
    }
}

/// Remove every reaction tagged as a transport process
///
/// # Returns
/// The reduced model and the ids of the removed reactions, in model order. A model without
/// transport reactions is returned unchanged.
pub fn eliminate_transport_reactions(model: &Model) -> (Model, Vec<String>) {
    let mut removed = Vec::new();
    let mut kept = IndexMap::new();
    for (id, rxn) in &model.reactions {
        if rxn.is_transport() {
            removed.push(id.clone());
        } else {
            kept.insert(id.clone(), rxn.clone());
        }
    }
    if !removed.is_empty() {
        debug!("Removed {} transport reactions: {:?}", removed.len(), removed);
    }
    (model.with_reactions(kept), removed)
}

/// Split every reversible reaction into an irreversible forward and backward half
///
/// The backward half directly follows its forward half, so the relative order of the
/// original reactions is kept. The returned [`ReverseIndexMap`] is expressed in the
/// numbering of the returned model.
pub fn split_reversible_reactions(model: &Model) -> (Model, ReverseIndexMap) {
    let mut reverse_index_map = ReverseIndexMap::new();
    let mut reactions: IndexMap<String, Reaction> = IndexMap::new();
    for rxn in model.reactions.values() {
        if rxn.reversible {
            let forward = rxn.forward_half();
            let backward = rxn.backward_half();
            let forward_index = reactions.len();
            reactions.insert(forward.id.clone(), forward);
            reactions.insert(backward.id.clone(), backward);
            reverse_index_map.insert(forward_index, forward_index + 1);
        } else {
            reactions.insert(rxn.id.clone(), rxn.clone());
        }
    }
    (model.with_reactions(reactions), reverse_index_map)
}

/// Id of the exchange reaction for a species
///
/// # Note:
/// The id is "{prefix}{species}_source" for a producing exchange, and
/// "{prefix}{species}_sink" for a consuming one
pub fn boundary_id(prefix: &str, species: &str, produces: bool) -> String {
    let tag = if produces { "source" } else { "sink" };
    format!("{}{}_{}", prefix, species, tag)
}

/// Add one exchange reaction per species with a nonzero row sum in `matrix`
///
/// A negative row sum (net consumption) gets a producing exchange and a positive row
/// sum gets a consuming one. Only the sign of the sum is used, every exchange has a
/// unit coefficient.
///
/// # Returns
/// The augmented model and, per species, the coefficient of its exchange reaction
/// (`1.` producing, `-1.` consuming), or NaN for species balanced inside the network.
pub fn add_system_boundaries(
    model: &Model,
    matrix: &StoichiometricMatrix,
    prefix: &str,
) -> (Model, Vec<f64>) {
    let row_sums = matrix.row_sums();
    let mut reactions = model.reactions.clone();
    let mut boundary_signs = Vec::with_capacity(row_sums.len());
    for (species, sum) in matrix.species.iter().zip(row_sums.iter()) {
        if *sum == 0. {
            boundary_signs.push(f64::NAN);
            continue;
        }
        let produces = *sum < 0.;
        let coefficient = if produces { 1. } else { -1. };
        let id = boundary_id(prefix, species, produces);
        let exchange = Reaction {
            id: id.clone(),
            metabolites: IndexMap::from([(species.clone(), coefficient)]),
            name: None,
            reversible: false,
            kind: ReactionKind::Boundary,
            standard_gibbs: None,
            subsystem: None,
        };
        reactions.insert(id, exchange);
        boundary_signs.push(coefficient);
    }
    (model.with_reactions(reactions), boundary_signs)
}

//! Module for turning a reaction network into the augmented form used by the dynamic analysis

pub mod stoichiometry;
pub mod transform;

use log::info;
use thiserror::Error;

use crate::metabolic_model::model::Model;
use crate::network::stoichiometry::StoichiometricMatrix;
use crate::network::transform::{
    add_system_boundaries, eliminate_transport_reactions, split_reversible_reactions,
    ReverseIndexMap,
};

/// Where a reaction of the augmented network comes from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReactionOrigin {
    /// An irreversible reaction of the input network, kept as is
    Original(String),
    /// Forward half of a split reversible reaction, holding the original id
    Forward(String),
    /// Backward half of a split reversible reaction, holding the original id
    Backward(String),
    /// Exchange reaction added for the species with the held id
    Boundary(String),
}

/// Reaction network after transport removal, reversible splitting and the addition of
/// system boundaries, together with its stoichiometric matrix
#[derive(Clone, Debug)]
pub struct AugmentedNetwork {
    /// The augmented model
    pub model: Model,
    /// Stoichiometric matrix of `model`
    pub stoichiometry: StoichiometricMatrix,
    /// Pairing of split forward/backward reactions, in augmented numbering
    pub reverse_index_map: ReverseIndexMap,
    /// Per species coefficient of its exchange reaction, NaN when it has none
    pub boundary_signs: Vec<f64>,
    /// Ids of the transport reactions dropped from the input
    pub removed_transport: Vec<String>,
    /// Origin of every augmented reaction, in augmented order
    pub origins: Vec<ReactionOrigin>,
}

impl AugmentedNetwork {
    /// Build the augmented network of a model
    ///
    /// The input model is validated first, so a malformed network fails before any
    /// transformation takes place.
    pub fn build(model: &Model, boundary_prefix: &str) -> Result<Self, StructuralError> {
        StoichiometricMatrix::build(model)?;

        let (without_transport, removed_transport) = eliminate_transport_reactions(model);
        let (split, reverse_index_map) = split_reversible_reactions(&without_transport);
        let split_stoichiometry = StoichiometricMatrix::build(&split)?;
        let (augmented, boundary_signs) =
            add_system_boundaries(&split, &split_stoichiometry, boundary_prefix);
        if augmented.num_reactions()
            != split.num_reactions() + boundary_signs.iter().filter(|s| !s.is_nan()).count()
        {
            return Err(StructuralError::DuplicateReaction);
        }
        let stoichiometry = StoichiometricMatrix::build(&augmented)?;

        let mut origins = Vec::with_capacity(augmented.num_reactions());
        for rxn in without_transport.reactions.values() {
            if rxn.reversible {
                origins.push(ReactionOrigin::Forward(rxn.id.clone()));
                origins.push(ReactionOrigin::Backward(rxn.id.clone()));
            } else {
                origins.push(ReactionOrigin::Original(rxn.id.clone()));
            }
        }
        for (species, sign) in stoichiometry.species.iter().zip(&boundary_signs) {
            if !sign.is_nan() {
                origins.push(ReactionOrigin::Boundary(species.clone()));
            }
        }

        let network = AugmentedNetwork {
            model: augmented,
            stoichiometry,
            reverse_index_map,
            boundary_signs,
            removed_transport,
            origins,
        };
        network.check_split_consistency()?;
        info!(
            "Augmented network: {} species, {} reactions ({} split pairs, {} boundaries, {} transport removed)",
            network.stoichiometry.num_species(),
            network.stoichiometry.num_reactions(),
            network.reverse_index_map.len(),
            network.num_boundaries(),
            network.removed_transport.len()
        );
        Ok(network)
    }

    /// Every split pair must have opposite columns
    fn check_split_consistency(&self) -> Result<(), StructuralError> {
        let matrix = &self.stoichiometry.matrix;
        for (forward, backward) in self.reverse_index_map.pairs() {
            let consistent = forward < matrix.ncols()
                && backward < matrix.ncols()
                && matrix
                    .column(forward)
                    .iter()
                    .zip(matrix.column(backward).iter())
                    .all(|(f, b)| *f == -*b);
            if !consistent {
                return Err(StructuralError::InconsistentSplit {
                    forward: self.reaction_id(forward).unwrap_or_default(),
                    backward: self.reaction_id(backward).unwrap_or_default(),
                });
            }
        }
        Ok(())
    }

    pub fn num_species(&self) -> usize {
        self.stoichiometry.num_species()
    }

    pub fn num_reactions(&self) -> usize {
        self.stoichiometry.num_reactions()
    }

    pub fn num_boundaries(&self) -> usize {
        self.origins
            .iter()
            .filter(|o| matches!(o, ReactionOrigin::Boundary(_)))
            .count()
    }

    /// Id of the augmented reaction at `index`
    pub fn reaction_id(&self, index: usize) -> Option<String> {
        self.stoichiometry.reactions.get(index).cloned()
    }

    /// Indices of all reactions that are not system boundaries
    pub fn internal_reactions(&self) -> Vec<usize> {
        self.origins
            .iter()
            .enumerate()
            .filter(|(_, o)| !matches!(o, ReactionOrigin::Boundary(_)))
            .map(|(i, _)| i)
            .collect()
    }

    /// Whether the reaction at `index` carries the net direction of its original
    /// reaction, which is every reaction except a backward half
    pub fn is_net_direction(&self, index: usize) -> bool {
        !self.reverse_index_map.is_backward(index)
    }

    /// Standard Gibbs energy of the augmented reaction at `index`
    pub fn standard_gibbs(&self, index: usize) -> Option<f64> {
        self.model
            .reactions
            .get_index(index)
            .and_then(|(_, rxn)| rxn.standard_gibbs)
    }

    /// Index of the augmented reaction carrying the net direction of an original reaction
    pub fn net_index_of(&self, original_id: &str) -> Option<usize> {
        self.origins.iter().position(|o| match o {
            ReactionOrigin::Original(id) | ReactionOrigin::Forward(id) => id == original_id,
            _ => false,
        })
    }
}

/// Errors caused by a malformed reaction network
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructuralError {
    /// A coefficient is NaN or infinite
    #[error("Undefined stoichiometry for metabolite {metabolite} in reaction {reaction}")]
    UndefinedStoichiometry {
        reaction: String,
        metabolite: String,
    },
    /// A reaction references a metabolite that is not in the model
    #[error("Reaction {reaction} references metabolite {metabolite} which is not in the model")]
    UnknownMetabolite {
        reaction: String,
        metabolite: String,
    },
    /// A reaction has no nonzero coefficient
    #[error("Reaction {0} has no nonzero stoichiometric coefficient")]
    VacuousReaction(String),
    /// The halves of a split reaction do not mirror each other
    #[error("Split reactions {forward} and {backward} are not reverses of each other")]
    InconsistentSplit { forward: String, backward: String },
    /// A generated reaction id collides with an existing reaction
    #[error("Generated reaction id collides with an existing reaction id")]
    DuplicateReaction,
}

//! This module provides the Model struct for representing an entire reaction network
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::reaction::Reaction;

use indexmap::IndexMap;

/// Represents a metabolic reaction network
///
/// Metabolite and reaction order is the insertion order, and is the row and column order
/// of every matrix derived from the model.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Model {
    /// Map of reaction ids to Reaction Objects
    pub reactions: IndexMap<String, Reaction>,
    /// Map of metabolite ids to Metabolite Objects
    pub metabolites: IndexMap<String, Metabolite>,
    /// Id associated with the Model
    pub id: Option<String>,
    /// Compartments in the model
    ///
    /// An IndexMap<String, String> of {short name: long name}
    pub compartments: Option<IndexMap<String, String>>,
}

impl Model {
    pub fn new_empty() -> Self {
        Model {
            reactions: IndexMap::new(),
            metabolites: IndexMap::new(),
            id: None,
            compartments: None,
        }
    }

    /// Add a reaction to the model
    ///
    /// # Parameters
    /// - reaction: Reaction to add
    ///
    /// # Examples
    /// ```rust
    /// use dfba_core::metabolic_model::model::Model;
    /// use dfba_core::metabolic_model::reaction::ReactionBuilder;
    /// let mut model = Model::new_empty();
    /// let new_reaction = ReactionBuilder::default().id("new_reaction").build().unwrap();
    /// model.add_reaction(new_reaction);
    /// ```
    pub fn add_reaction(&mut self, reaction: Reaction) {
        let id = reaction.id.clone();
        self.reactions.insert(id, reaction);
    }

    /// Add a metabolite to the model
    pub fn add_metabolite(&mut self, metabolite: Metabolite) {
        let id = metabolite.id.clone();
        self.metabolites.insert(id, metabolite);
    }

    /// Add a series of metabolites, each only identified by its id
    pub fn add_metabolites_by_id(&mut self, ids: &[&str]) {
        for id in ids {
            self.add_metabolite(Metabolite::new(id));
        }
    }

    /// Number of metabolites (species) in the model
    pub fn num_metabolites(&self) -> usize {
        self.metabolites.len()
    }

    /// Number of reactions in the model
    pub fn num_reactions(&self) -> usize {
        self.reactions.len()
    }

    /// Position of a metabolite in the model ordering
    pub fn metabolite_index(&self, id: &str) -> Option<usize> {
        self.metabolites.get_index_of(id)
    }

    /// Position of a reaction in the model ordering
    pub fn reaction_index(&self, id: &str) -> Option<usize> {
        self.reactions.get_index_of(id)
    }

    /// Copy of the model with a different reaction set, same metabolites and metadata
    pub(crate) fn with_reactions(&self, reactions: IndexMap<String, Reaction>) -> Model {
        Model {
            reactions,
            metabolites: self.metabolites.clone(),
            id: self.id.clone(),
            compartments: self.compartments.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic_model::reaction::ReactionBuilder;

    #[test]
    fn ordering_is_insertion_order() {
        let mut model = Model::new_empty();
        model.add_metabolites_by_id(&["C", "A", "B"]);
        assert_eq!(model.metabolite_index("C"), Some(0));
        assert_eq!(model.metabolite_index("B"), Some(2));
        assert_eq!(model.metabolite_index("D"), None);

        model.add_reaction(ReactionBuilder::default().id("R2").build().unwrap());
        model.add_reaction(ReactionBuilder::default().id("R1").build().unwrap());
        assert_eq!(model.reaction_index("R2"), Some(0));
        assert_eq!(model.num_reactions(), 2);
        assert_eq!(model.num_metabolites(), 3);
    }
}

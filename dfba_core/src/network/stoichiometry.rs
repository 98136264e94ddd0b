//! Builds the dense species × reaction stoichiometric matrix of a model
use nalgebra::{DMatrix, DVector};

use crate::metabolic_model::model::Model;
use crate::network::StructuralError;

/// Dense stoichiometric matrix, rows are species and columns are reactions
///
/// Entry (i, j) is the signed coefficient of species i in reaction j, negative for
/// reactants and positive for products. Row and column ids follow model order.
#[derive(Clone, Debug, PartialEq)]
pub struct StoichiometricMatrix {
    /// The coefficients
    pub matrix: DMatrix<f64>,
    /// Species id of each row
    pub species: Vec<String>,
    /// Reaction id of each column
    pub reactions: Vec<String>,
}

impl StoichiometricMatrix {
    /// Build the stoichiometric matrix of a model
    ///
    /// # Errors
    /// - [`StructuralError::UndefinedStoichiometry`] if a coefficient is NaN or infinite
    /// - [`StructuralError::UnknownMetabolite`] if a reaction references a metabolite that
    ///   is not part of the model
    /// - [`StructuralError::VacuousReaction`] if a reaction has no nonzero coefficient
    pub fn build(model: &Model) -> Result<Self, StructuralError> {
        let mut matrix = DMatrix::zeros(model.num_metabolites(), model.num_reactions());
        for (col, (rxn_id, rxn)) in model.reactions.iter().enumerate() {
            for (met_id, coef) in &rxn.metabolites {
                let row = model.metabolite_index(met_id).ok_or_else(|| {
                    StructuralError::UnknownMetabolite {
                        reaction: rxn_id.clone(),
                        metabolite: met_id.clone(),
                    }
                })?;
                if !coef.is_finite() {
                    return Err(StructuralError::UndefinedStoichiometry {
                        reaction: rxn_id.clone(),
                        metabolite: met_id.clone(),
                    });
                }
                // Reactants are stored with negative coefficients already
                matrix[(row, col)] = *coef;
            }
            if matrix.column(col).iter().all(|v| *v == 0.) {
                return Err(StructuralError::VacuousReaction(rxn_id.clone()));
            }
        }
        Ok(StoichiometricMatrix {
            matrix,
            species: model.metabolites.keys().cloned().collect(),
            reactions: model.reactions.keys().cloned().collect(),
        })
    }

    pub fn num_species(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn num_reactions(&self) -> usize {
        self.matrix.ncols()
    }

    /// Net production of every species when each reaction carries unit flux
    pub fn row_sums(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.num_species(),
            self.matrix.row_iter().map(|row| row.sum()),
        )
    }

    /// Copy of the matrix restricted to the given columns, in the given order
    pub fn select_reactions(&self, columns: &[usize]) -> DMatrix<f64> {
        self.matrix.select_columns(columns.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic_model::reaction::ReactionBuilder;
    use indexmap::IndexMap;

    fn chain_model() -> Model {
        let mut model = Model::new_empty();
        model.add_metabolites_by_id(&["A", "B", "C"]);
        model.add_reaction(
            ReactionBuilder::default()
                .id("R1")
                .metabolites(IndexMap::from([("A".to_string(), -1.0), ("B".to_string(), 1.0)]))
                .build()
                .unwrap(),
        );
        model.add_reaction(
            ReactionBuilder::default()
                .id("R2")
                .metabolites(IndexMap::from([("B".to_string(), -2.0), ("C".to_string(), 1.0)]))
                .build()
                .unwrap(),
        );
        model
    }

    #[test]
    fn dense_fill() {
        let stoich = StoichiometricMatrix::build(&chain_model()).unwrap();
        assert_eq!(stoich.num_species(), 3);
        assert_eq!(stoich.num_reactions(), 2);
        assert_eq!(stoich.matrix[(0, 0)], -1.0);
        assert_eq!(stoich.matrix[(1, 0)], 1.0);
        assert_eq!(stoich.matrix[(1, 1)], -2.0);
        assert_eq!(stoich.matrix[(2, 1)], 1.0);
        assert_eq!(stoich.matrix[(2, 0)], 0.0);
        assert_eq!(stoich.species, vec!["A", "B", "C"]);
        assert_eq!(stoich.reactions, vec!["R1", "R2"]);

        let sums = stoich.row_sums();
        assert_eq!(sums.as_slice(), &[-1.0, -1.0, 1.0]);
    }

    #[test]
    fn undefined_stoichiometry_is_reported() {
        let mut model = chain_model();
        model.reactions.get_mut("R2").unwrap().metabolites["C"] = f64::NAN;
        match StoichiometricMatrix::build(&model) {
            Err(StructuralError::UndefinedStoichiometry {
                reaction,
                metabolite,
            }) => {
                assert_eq!(reaction, "R2");
                assert_eq!(metabolite, "C");
            }
            _ => panic!("NaN stoichiometry not caught"),
        }
    }

    #[test]
    fn unknown_metabolite_is_reported() {
        let mut model = chain_model();
        model
            .reactions
            .get_mut("R1")
            .unwrap()
            .metabolites
            .insert("Z".to_string(), 1.0);
        assert!(matches!(
            StoichiometricMatrix::build(&model),
            Err(StructuralError::UnknownMetabolite { .. })
        ));
    }

    #[test]
    fn vacuous_reaction_is_reported() {
        let mut model = chain_model();
        model.add_reaction(ReactionBuilder::default().id("EMPTY").build().unwrap());
        match StoichiometricMatrix::build(&model) {
            Err(StructuralError::VacuousReaction(id)) => assert_eq!(id, "EMPTY"),
            _ => panic!("Vacuous reaction not caught"),
        }
    }
}

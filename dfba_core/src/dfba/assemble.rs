//! Mapping of the augmented-space working trajectory back onto the input network
use indexmap::IndexMap;
use log::debug;

use crate::dfba::driver::WorkingTrajectory;
use crate::metabolic_model::model::Model;
use crate::network::AugmentedNetwork;
use crate::timeseries::Trajectory;

/// How the flux of a split reversible reaction is reported
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NetFluxPolicy {
    /// Forward half minus backward half
    #[default]
    ForwardMinusBackward,
    /// Forward half only, the backward half is treated as bookkeeping
    ForwardOnly,
}

impl NetFluxPolicy {
    pub fn net(&self, forward: f64, backward: f64) -> f64 {
        match self {
            NetFluxPolicy::ForwardMinusBackward => forward - backward,
            NetFluxPolicy::ForwardOnly => forward,
        }
    }
}

/// Builds the user facing trajectory, keyed by the ids of the input network
#[derive(Clone, Debug)]
pub struct ResultAssembler<'a> {
    pub network: &'a AugmentedNetwork,
    pub original: &'a Model,
    pub policy: NetFluxPolicy,
}

impl<'a> ResultAssembler<'a> {
    pub fn new(network: &'a AugmentedNetwork, original: &'a Model, policy: NetFluxPolicy) -> Self {
        ResultAssembler {
            network,
            original,
            policy,
        }
    }

    /// Map a working trajectory onto the species and reactions of the input network
    ///
    /// Species columns are copied. Split reactions are merged according to the
    /// [`NetFluxPolicy`], other reactions are copied. Transport reactions, which take no
    /// part in the optimization, are reported as NaN. System boundaries are not reported.
    pub fn finalize(&self, working: &WorkingTrajectory) -> Trajectory {
        let steps = working.len();
        let species = &self.network.stoichiometry.species;

        let concentrations: IndexMap<String, Vec<f64>> = self
            .original
            .metabolites
            .keys()
            .map(|id| {
                let column = match species.iter().position(|s| s == id) {
                    Some(i) => working.concentrations.column(i).iter().copied().collect(),
                    None => vec![f64::NAN; steps],
                };
                (id.clone(), column)
            })
            .collect();

        let mut fluxes: IndexMap<String, Vec<f64>> = IndexMap::new();
        for rxn in self.original.reactions.values() {
            let column = match self.network.net_index_of(&rxn.id) {
                _ if rxn.is_transport() => vec![f64::NAN; steps],
                Some(forward) => match self.network.reverse_index_map.backward_of(forward) {
                    Some(backward) => working
                        .fluxes
                        .column(forward)
                        .iter()
                        .zip(working.fluxes.column(backward).iter())
                        .map(|(f, b)| self.policy.net(*f, *b))
                        .collect(),
                    None => working.fluxes.column(forward).iter().copied().collect(),
                },
                None => {
                    debug!("Reaction {} has no augmented counterpart", rxn.id);
                    vec![f64::NAN; steps]
                }
            };
            fluxes.insert(rxn.id.clone(), column);
        }

        Trajectory {
            time: working.time.clone(),
            concentrations,
            fluxes,
        }
    }
}

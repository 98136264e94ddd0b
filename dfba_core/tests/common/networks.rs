//! Small reaction networks and measurement tables

use std::path::PathBuf;

use dfba_core::metabolic_model::model::Model;
use dfba_core::metabolic_model::reaction::ReactionBuilder;
use dfba_core::timeseries::Trajectory;

/// Path of a file in the test_data directory
pub fn test_data(file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_data")
        .join(file)
}

/// Irreversible chain `A -> B -> C`
pub fn chain_model() -> Model {
    let mut model = Model::new_empty();
    model.add_metabolites_by_id(&["A", "B", "C"]);
    for (id, from, to) in [("R1", "A", "B"), ("R2", "B", "C")] {
        model.add_reaction(
            ReactionBuilder::default()
                .id(id)
                .metabolites([(from.to_string(), -1.), (to.to_string(), 1.)].into())
                .build()
                .unwrap(),
        );
    }
    model
}

/// A consumed and C produced over three time points, B never measured
pub fn chain_measurements() -> Trajectory {
    let mut measurements = Trajectory::new(vec![0., 1., 2.]).unwrap();
    measurements
        .insert_concentration("A", vec![1.0, 0.9, 0.8])
        .unwrap();
    measurements
        .insert_concentration("C", vec![0.1, 0.2, 0.3])
        .unwrap();
    measurements
}

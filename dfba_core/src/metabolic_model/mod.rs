//! Module providing the Model struct for representing a reaction network.

pub mod metabolite;
pub mod model;
pub mod reaction;

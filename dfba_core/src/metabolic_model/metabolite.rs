//! This module provides the metabolite struct representing a species of the network

use std::hash::Hash;

use derive_builder::Builder;

/// Represents a metabolite (a species tracked by the network)
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Metabolite {
    /// Used to identify the metabolite (must be unique)
    #[builder(setter(into))]
    pub id: String,
    /// Human Readable name of the metabolite
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Which compartment the metabolite is in
    #[builder(default = "None")]
    pub compartment: Option<String>,
}

impl Metabolite {
    /// Create a metabolite with only an id
    pub fn new(id: &str) -> Self {
        Metabolite {
            id: id.to_string(),
            name: None,
            compartment: None,
        }
    }

    /// Create a metabolite with an id and a compartment
    pub fn in_compartment(id: &str, compartment: &str) -> Self {
        Metabolite {
            id: id.to_string(),
            name: None,
            compartment: Some(compartment.to_string()),
        }
    }
}

impl Hash for Metabolite {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state); // Hash by id
                             // If the metabolite has an associated compartment, also hash by that
        if let Some(ref compartment) = self.compartment {
            compartment.hash(state)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let met = MetaboliteBuilder::default().id("glc__D_e").build().unwrap();
        assert_eq!(met.id, "glc__D_e");
        assert!(met.name.is_none());
        assert!(met.compartment.is_none());
    }

    #[test]
    fn compartment_constructor() {
        let met = Metabolite::in_compartment("atp_c", "c");
        assert_eq!(met.compartment.unwrap(), "c");
    }
}

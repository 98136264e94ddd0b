//! Core rust implementation of dynamic flux balance analysis.
//!
//! A reaction network is restructured (transport removal, reversible splitting and system
//! boundaries), its steady state flux space is computed once, and a convex optimization
//! problem is solved at every time point of a measurement series to fit a flux and
//! concentration trajectory. See [`dfba::DynamicFba`].

pub mod configuration;
pub mod dfba;
pub mod io;
pub mod metabolic_model;
pub mod network;
pub mod optimize;
pub mod steady_state;
pub mod timeseries;
mod utils;

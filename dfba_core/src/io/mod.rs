//! Module for reading and writing reaction networks and trajectory tables
pub mod json;

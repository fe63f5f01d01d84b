//! Common types shared by every iGain crate

pub mod errors;
pub mod fixed_point;
pub mod identifiers;

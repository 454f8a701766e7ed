//! Patient Flow Library
//!
//! Discrete simulation of patients moving through a capacity-gated process
//! graph, day by day.

pub mod simulation;

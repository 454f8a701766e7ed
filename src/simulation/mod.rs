//! Patient flow simulation
//!
//! This module contains the process graph, the capacity-gated traversal
//! engine and the day-cycle driver, plus flow aggregation and rendering of
//! simulation output. It has no I/O of its own beyond the HTML/CSV writers.

mod branch;
mod capacity;
mod clock;
mod driver;
mod entity;
mod error;
mod flow;
mod graph;
pub mod render;
pub mod scenario;
mod traversal;
mod types;

pub use branch::{
    sampler_fn, trial_fn, BernoulliTrial, BranchSampler, CoinFlip, FixedOutcome, FixedSample,
    Sampler, SamplerFn, TrialFn, UniformSampler,
};
pub use capacity::{
    generator_fn, Admission, CapacityProvider, GeneratorFn, NoCapacity, PatientGenerator,
};
pub use clock::{Day, SimulationClock, Weekday};
pub use driver::{DaySummary, FailurePolicy, SimConfig, Simulation, SimulationResult};
pub use entity::{Entity, Patient};
pub use error::{BranchFault, ConfigError, RouteError, SimError, SimResult};
pub use flow::{FlowLink, PathwayFlow};
pub use graph::{GateStats, ProcessGraph, ProcessGraphBuilder, Transition};
pub use traversal::{Routed, RoutingFailure};
pub use types::{
    EntityId, Resource, StageId, DEFAULT_HOP_LIMIT, DEFAULT_HORIZON, PROBABILITY_TOLERANCE,
};

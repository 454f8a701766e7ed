//! Error types for graph construction, routing and the day loop

use thiserror::Error;

use super::types::EntityId;

/// The process graph cannot be used as given. Raised while building.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("no stage has zero in-degree; cannot identify a start stage")]
    NoStartStage,

    #[error("ambiguous start stage: {candidates:?} all have zero in-degree")]
    AmbiguousStart { candidates: Vec<String> },

    #[error("stage '{0}' has a capacity provider but no resource")]
    ProviderWithoutResource(String),

    #[error("stage '{0}' has a resource but no capacity provider")]
    ResourceWithoutProvider(String),

    #[error("capacity-gated stage '{stage}' has {transitions} outgoing transitions but {marked} marked overflow (expected exactly one)")]
    Overflow {
        stage: String,
        transitions: usize,
        marked: usize,
    },

    #[error("capacity-gated stage '{0}' has no outgoing transition to divert declined patients to")]
    GatedTerminal(String),

    #[error("unknown stage '{0}'")]
    UnknownStage(String),

    #[error("more than one stage is named '{0}'")]
    DuplicateStage(String),

    #[error("the process graph has no stages")]
    Empty,
}

/// Why a branching stage cannot pick its next stage
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BranchFault {
    #[error("transition probabilities sum to {total} and no Bernoulli pair is declared")]
    ProbabilitySum { total: f64 },

    #[error("Bernoulli branching needs exactly two transitions flagged true and false, found {flagged} flagged of {transitions}")]
    BernoulliPair { flagged: usize, transitions: usize },

    #[error("transition probabilities sum to 1 and a Bernoulli pair is also declared")]
    Ambiguous,

    #[error("no branch sampler is attached")]
    MissingSampler,

    #[error("attached sampler does not fit the branch: expected a {expected}, found a {found}")]
    SamplerKind {
        expected: &'static str,
        found: &'static str,
    },
}

/// A single patient could not be routed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    #[error("branch configuration error at stage '{stage}': {fault}")]
    BranchConfiguration { stage: String, fault: BranchFault },

    #[error("routing gave up after {limit} stages, last at '{stage}'")]
    HopLimit { stage: String, limit: usize },
}

/// Errors that end a simulation run
#[derive(Debug, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("patient {entity} failed on day {day}: {source}")]
    Routing {
        day: u32,
        entity: EntityId,
        #[source]
        source: RouteError,
    },

    #[error("generator produced patient {id} twice (day {day})")]
    DuplicateEntity { id: EntityId, day: u32 },
}

pub type SimResult<T> = Result<T, SimError>;

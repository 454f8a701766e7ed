//! Process graph: stages, transitions and their validated routing roles
//!
//! The graph is described through [`ProcessGraphBuilder`], which accepts the
//! loose attribute set of a stage (sampler, capacity provider, resource) and
//! of a transition (probability, Bernoulli flag, overflow marker). `build`
//! checks the topology once and resolves every stage into a routing role, so
//! traversal never has to inspect optional attributes.

use log::{debug, warn};
use ordered_float::OrderedFloat;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

use super::branch::{BernoulliTrial, BranchSampler, Sampler};
use super::capacity::CapacityProvider;
use super::clock::Day;
use super::error::{BranchFault, ConfigError};
use super::types::{Resource, StageId, DEFAULT_HOP_LIMIT, PROBABILITY_TOLERANCE};

/// Attributes of a transition between two stages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Transition {
    /// Weight used for cumulative-probability branching
    pub probability: Option<OrderedFloat<f64>>,
    /// Outcome this transition stands for in a two-way Bernoulli split
    pub bernoulli: Option<bool>,
    /// Taken when a capacity-gated stage declines admission
    pub overflow: bool,
}

impl Transition {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn weighted(probability: f64) -> Self {
        Self {
            probability: Some(OrderedFloat(probability)),
            ..Self::default()
        }
    }

    pub fn bernoulli(outcome: bool) -> Self {
        Self {
            bernoulli: Some(outcome),
            ..Self::default()
        }
    }

    pub fn overflow() -> Self {
        Self {
            overflow: true,
            ..Self::default()
        }
    }

    /// Probability weight, zero when none is declared
    pub fn weight(&self) -> f64 {
        self.probability.map_or(0.0, |p| p.0)
    }

    fn takes_part_in_branching(&self) -> bool {
        self.probability.is_some() || self.bernoulli.is_some()
    }
}

/// Loose per-stage attributes collected by the builder
struct StageAttrs<E> {
    sampler: Option<Sampler<E>>,
    provider: Option<Box<dyn CapacityProvider<E>>>,
    resource: Option<Resource>,
}

impl<E> StageAttrs<E> {
    fn empty() -> Self {
        Self {
            sampler: None,
            provider: None,
            resource: None,
        }
    }
}

/// Capacity gate of a stage
pub(crate) struct Gate<E> {
    pub(crate) resource: Resource,
    pub(crate) provider: Box<dyn CapacityProvider<E>>,
    pub(crate) overflow: NodeIndex,
    pub(crate) admitted: u64,
    pub(crate) declined: u64,
    pub(crate) released: u64,
    pub(crate) abandoned: u64,
}

/// How a stage picks its successor once a patient has been recorded there
pub(crate) enum Routing<E> {
    Terminal,
    Direct(NodeIndex),
    Weighted {
        sampler: Box<dyn BranchSampler<E>>,
        /// Targets with a positive weight, in transition order
        targets: Vec<NodeIndex>,
        /// Running sum of the weights of `targets`
        cumulative: Vec<OrderedFloat<f64>>,
    },
    Bernoulli {
        trial: Box<dyn BernoulliTrial<E>>,
        on_true: NodeIndex,
        on_false: NodeIndex,
    },
    Faulty(BranchFault),
}

impl<E> Routing<E> {
    fn kind(&self) -> &'static str {
        match self {
            Routing::Terminal => "terminal",
            Routing::Direct(_) => "direct",
            Routing::Weighted { .. } => "weighted",
            Routing::Bernoulli { .. } => "bernoulli",
            Routing::Faulty(_) => "faulty",
        }
    }
}

pub(crate) struct Stage<E> {
    pub(crate) gate: Option<Gate<E>>,
    pub(crate) routing: Routing<E>,
}

/// Admission counters of one capacity-gated stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateStats {
    pub stage: StageId,
    pub resource: Resource,
    /// Patients the provider accepted
    pub admitted: u64,
    /// Patients diverted along the overflow transition
    pub declined: u64,
    /// Patients the provider released back into the graph
    pub released: u64,
    /// Patients handed back by the provider at the end of a run
    pub abandoned: u64,
}

impl GateStats {
    /// Admitted patients the provider has neither released nor handed back
    pub fn outstanding(&self) -> u64 {
        self.admitted
            .saturating_sub(self.released)
            .saturating_sub(self.abandoned)
    }
}

#[derive(Debug, Clone, Copy)]
struct Outgoing {
    edge: EdgeIndex,
    target: NodeIndex,
    transition: Transition,
}

/// Outgoing transitions of a node, in insertion order
fn outgoing(topology: &DiGraph<String, Transition>, node: NodeIndex) -> Vec<Outgoing> {
    let mut edges: Vec<Outgoing> = topology
        .edges(node)
        .map(|edge| Outgoing {
            edge: edge.id(),
            target: edge.target(),
            transition: *edge.weight(),
        })
        .collect();
    // petgraph walks adjacency lists newest first
    edges.sort_by_key(|out| out.edge);
    edges
}

/// Builder for a [`ProcessGraph`]
///
/// Stages are created on first mention by name.
pub struct ProcessGraphBuilder<E> {
    topology: DiGraph<String, Transition>,
    attrs: Vec<StageAttrs<E>>,
    names: HashMap<String, NodeIndex>,
    /// Names carried by more than one node of an imported topology
    duplicates: Vec<String>,
    entry: Option<String>,
    hop_limit: usize,
}

impl<E> Default for ProcessGraphBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> ProcessGraphBuilder<E> {
    pub fn new() -> Self {
        Self {
            topology: DiGraph::new(),
            attrs: Vec::new(),
            names: HashMap::new(),
            duplicates: Vec::new(),
            entry: None,
            hop_limit: DEFAULT_HOP_LIMIT,
        }
    }

    /// Start from an existing topology whose node weights are stage names
    pub fn from_topology(topology: DiGraph<String, Transition>) -> Self {
        let mut names = HashMap::new();
        let mut duplicates = Vec::new();
        for node in topology.node_indices() {
            let name = topology[node].clone();
            if names.insert(name.clone(), node).is_some() {
                duplicates.push(name);
            }
        }
        let attrs = topology.node_indices().map(|_| StageAttrs::empty()).collect();
        Self {
            topology,
            attrs,
            names,
            duplicates,
            entry: None,
            hop_limit: DEFAULT_HOP_LIMIT,
        }
    }

    /// Adds a stage, or returns the existing one with that name
    pub fn stage(&mut self, name: &str) -> StageId {
        if let Some(node) = self.names.get(name) {
            return StageId(*node);
        }

        let node = self.topology.add_node(name.to_string());
        self.names.insert(name.to_string(), node);
        self.attrs.push(StageAttrs::empty());
        StageId(node)
    }

    /// Adds a transition, creating either stage if needed
    pub fn transition(&mut self, from: &str, to: &str, transition: Transition) -> &mut Self {
        let from = self.stage(from);
        let to = self.stage(to);
        self.topology.add_edge(from.0, to.0, transition);
        self
    }

    /// Attaches a weighted sampler, replacing any earlier sampler
    pub fn sampler(&mut self, stage: &str, sampler: impl BranchSampler<E> + 'static) -> &mut Self {
        self.attrs_mut(stage).sampler = Some(Sampler::Weighted(Box::new(sampler)));
        self
    }

    /// Attaches a Bernoulli trial, replacing any earlier sampler
    pub fn bernoulli_trial(
        &mut self,
        stage: &str,
        trial: impl BernoulliTrial<E> + 'static,
    ) -> &mut Self {
        self.attrs_mut(stage).sampler = Some(Sampler::Bernoulli(Box::new(trial)));
        self
    }

    pub fn capacity_provider(
        &mut self,
        stage: &str,
        provider: impl CapacityProvider<E> + 'static,
    ) -> &mut Self {
        self.attrs_mut(stage).provider = Some(Box::new(provider));
        self
    }

    pub fn resource(&mut self, stage: &str, resource: impl Into<Resource>) -> &mut Self {
        self.attrs_mut(stage).resource = Some(resource.into());
        self
    }

    /// Gates a stage: shorthand for `resource` plus `capacity_provider`
    pub fn gate(
        &mut self,
        stage: &str,
        resource: impl Into<Resource>,
        provider: impl CapacityProvider<E> + 'static,
    ) -> &mut Self {
        self.resource(stage, resource);
        self.capacity_provider(stage, provider)
    }

    /// Declares the entry stage instead of discovering it by in-degree.
    /// Needed when transitions feed back into the first stage.
    pub fn entry(&mut self, stage: &str) -> &mut Self {
        self.entry = Some(stage.to_string());
        self
    }

    /// Maximum number of stages a single routing call may visit
    pub fn hop_limit(&mut self, limit: usize) -> &mut Self {
        self.hop_limit = limit.max(1);
        self
    }

    fn attrs_mut(&mut self, stage: &str) -> &mut StageAttrs<E> {
        let node = self.stage(stage);
        &mut self.attrs[node.index()]
    }

    /// Validates the graph and resolves every stage's routing role
    pub fn build(self) -> Result<ProcessGraph<E>, ConfigError> {
        let Self {
            topology,
            attrs,
            names,
            duplicates,
            entry,
            hop_limit,
        } = self;

        if topology.node_count() == 0 {
            return Err(ConfigError::Empty);
        }
        if let Some(name) = duplicates.into_iter().next() {
            return Err(ConfigError::DuplicateStage(name));
        }

        let start = match entry {
            Some(name) => *names.get(&name).ok_or(ConfigError::UnknownStage(name))?,
            None => find_start(&topology)?,
        };

        let mut stages = Vec::with_capacity(attrs.len());
        let mut gated = Vec::new();

        for (node, stage_attrs) in topology.node_indices().zip(attrs) {
            let name = &topology[node];
            let transitions = outgoing(&topology, node);

            let gate = match (stage_attrs.provider, stage_attrs.resource) {
                (Some(provider), Some(resource)) => {
                    let overflow = overflow_target(name, &transitions)?;
                    gated.push(StageId(node));
                    Some(Gate {
                        resource,
                        provider,
                        overflow,
                        admitted: 0,
                        declined: 0,
                        released: 0,
                        abandoned: 0,
                    })
                }
                (Some(_), None) => return Err(ConfigError::ProviderWithoutResource(name.clone())),
                (None, Some(_)) => return Err(ConfigError::ResourceWithoutProvider(name.clone())),
                (None, None) => None,
            };

            // A released patient does not branch onto a bare overflow transition
            let candidates: Vec<Outgoing> = if gate.is_some() && transitions.len() > 1 {
                transitions
                    .into_iter()
                    .filter(|out| !out.transition.overflow || out.transition.takes_part_in_branching())
                    .collect()
            } else {
                transitions
            };

            let routing = resolve_routing(&candidates, stage_attrs.sampler);
            match &routing {
                Routing::Faulty(fault) => warn!("Stage '{}' cannot branch: {}", name, fault),
                other => debug!("Stage '{}' routes {}", name, other.kind()),
            }

            stages.push(Stage { gate, routing });
        }

        Ok(ProcessGraph {
            topology,
            stages,
            names,
            start: StageId(start),
            gated,
            hop_limit,
        })
    }
}

fn find_start(topology: &DiGraph<String, Transition>) -> Result<NodeIndex, ConfigError> {
    let candidates: Vec<NodeIndex> = topology.externals(Direction::Incoming).collect();
    match candidates.as_slice() {
        [start] => Ok(*start),
        [] => Err(ConfigError::NoStartStage),
        _ => Err(ConfigError::AmbiguousStart {
            candidates: candidates
                .iter()
                .map(|node| topology[*node].clone())
                .collect(),
        }),
    }
}

fn overflow_target(stage: &str, transitions: &[Outgoing]) -> Result<NodeIndex, ConfigError> {
    match transitions {
        [] => Err(ConfigError::GatedTerminal(stage.to_string())),
        [only] => Ok(only.target),
        many => {
            let marked: Vec<&Outgoing> = many.iter().filter(|out| out.transition.overflow).collect();
            match marked.as_slice() {
                [overflow] => Ok(overflow.target),
                _ => Err(ConfigError::Overflow {
                    stage: stage.to_string(),
                    transitions: many.len(),
                    marked: marked.len(),
                }),
            }
        }
    }
}

fn resolve_routing<E>(candidates: &[Outgoing], sampler: Option<Sampler<E>>) -> Routing<E> {
    match candidates {
        [] => return Routing::Terminal,
        [only] => return Routing::Direct(only.target),
        _ => {}
    }

    let total: f64 = candidates.iter().map(|out| out.transition.weight()).sum();
    let flagged: Vec<(bool, NodeIndex)> = candidates
        .iter()
        .filter_map(|out| out.transition.bernoulli.map(|flag| (flag, out.target)))
        .collect();

    let weighted = (total - 1.0).abs() <= PROBABILITY_TOLERANCE;
    let pair = match flagged.as_slice() {
        [(a, first), (b, second)] if candidates.len() == 2 && a != b => {
            Some(if *a { (*first, *second) } else { (*second, *first) })
        }
        _ => None,
    };

    match (weighted, pair) {
        (true, Some(_)) => Routing::Faulty(BranchFault::Ambiguous),
        (true, None) => match sampler {
            Some(Sampler::Weighted(sampler)) => {
                let mut targets = Vec::new();
                let mut cumulative = Vec::new();
                let mut running = 0.0;
                for out in candidates.iter().filter(|out| out.transition.weight() > 0.0) {
                    running += out.transition.weight();
                    targets.push(out.target);
                    cumulative.push(OrderedFloat(running));
                }
                Routing::Weighted {
                    sampler,
                    targets,
                    cumulative,
                }
            }
            Some(other @ Sampler::Bernoulli(_)) => Routing::Faulty(BranchFault::SamplerKind {
                expected: "weighted sampler",
                found: other.kind(),
            }),
            None => Routing::Faulty(BranchFault::MissingSampler),
        },
        (false, Some((on_true, on_false))) => match sampler {
            Some(Sampler::Bernoulli(trial)) => Routing::Bernoulli {
                trial,
                on_true,
                on_false,
            },
            Some(other @ Sampler::Weighted(_)) => Routing::Faulty(BranchFault::SamplerKind {
                expected: "Bernoulli trial",
                found: other.kind(),
            }),
            None => Routing::Faulty(BranchFault::MissingSampler),
        },
        (false, None) if !flagged.is_empty() => Routing::Faulty(BranchFault::BernoulliPair {
            flagged: flagged.len(),
            transitions: candidates.len(),
        }),
        (false, None) => Routing::Faulty(BranchFault::ProbabilitySum { total }),
    }
}

/// A validated process graph
///
/// Owns the capacity providers and samplers attached to its stages, so
/// routing takes `&mut self`.
pub struct ProcessGraph<E> {
    pub(crate) topology: DiGraph<String, Transition>,
    pub(crate) stages: Vec<Stage<E>>,
    names: HashMap<String, NodeIndex>,
    start: StageId,
    gated: Vec<StageId>,
    pub(crate) hop_limit: usize,
}

impl<E> ProcessGraph<E> {
    /// The stage every new patient enters at
    pub fn start(&self) -> StageId {
        self.start
    }

    pub fn stage_count(&self) -> usize {
        self.topology.node_count()
    }

    pub fn transition_count(&self) -> usize {
        self.topology.edge_count()
    }

    pub fn stages(&self) -> impl Iterator<Item = StageId> + '_ {
        self.topology.node_indices().map(StageId)
    }

    pub fn stage_name(&self, stage: StageId) -> &str {
        &self.topology[stage.0]
    }

    pub fn find_stage(&self, name: &str) -> Option<StageId> {
        self.names.get(name).copied().map(StageId)
    }

    /// True when the stage has no outgoing transitions
    pub fn is_terminal(&self, stage: StageId) -> bool {
        self.topology
            .edges_directed(stage.0, Direction::Outgoing)
            .next()
            .is_none()
    }

    /// Capacity-gated stages in discovery order
    pub fn gated_stages(&self) -> &[StageId] {
        &self.gated
    }

    pub fn resource(&self, stage: StageId) -> Option<&Resource> {
        self.stages[stage.index()]
            .gate
            .as_ref()
            .map(|gate| &gate.resource)
    }

    /// Routing role of a stage: terminal, direct, weighted, bernoulli or faulty
    pub fn routing_kind(&self, stage: StageId) -> &'static str {
        self.stages[stage.index()].routing.kind()
    }

    /// All transitions, in insertion order
    pub fn transitions(&self) -> impl Iterator<Item = (StageId, StageId, &Transition)> + '_ {
        self.topology
            .edge_references()
            .map(|edge| (StageId(edge.source()), StageId(edge.target()), edge.weight()))
    }

    /// Stage names along a pathway
    pub fn pathway_names(&self, pathway: &[StageId]) -> Vec<&str> {
        pathway.iter().map(|stage| self.stage_name(*stage)).collect()
    }

    /// Stages whose branching is misconfigured. Routing through any of them fails.
    pub fn branch_faults(&self) -> Vec<(StageId, &BranchFault)> {
        self.stages
            .iter()
            .enumerate()
            .filter_map(|(index, stage)| match &stage.routing {
                Routing::Faulty(fault) => Some((StageId(NodeIndex::new(index)), fault)),
                _ => None,
            })
            .collect()
    }

    pub fn hop_limit(&self) -> usize {
        self.hop_limit
    }

    /// Admission counters of every gated stage, in discovery order
    pub fn gate_stats(&self) -> Vec<GateStats> {
        self.gated
            .iter()
            .filter_map(|stage| {
                self.stages[stage.index()].gate.as_ref().map(|gate| GateStats {
                    stage: *stage,
                    resource: gate.resource.clone(),
                    admitted: gate.admitted,
                    declined: gate.declined,
                    released: gate.released,
                    abandoned: gate.abandoned,
                })
            })
            .collect()
    }

    /// Patients the gate's provider clears to continue on `day`
    pub(crate) fn advance_gate(&mut self, stage: StageId, day: Day) -> Vec<E> {
        match self.stages[stage.index()].gate.as_mut() {
            Some(gate) => {
                let released = gate.provider.advance_day(day.number, day.weekday);
                gate.released += released.len() as u64;
                released
            }
            None => Vec::new(),
        }
    }

    /// Patients still held by the gate's provider
    pub(crate) fn abandon_gate(&mut self, stage: StageId) -> Vec<E> {
        match self.stages[stage.index()].gate.as_mut() {
            Some(gate) => {
                let abandoned = gate.provider.abandon();
                gate.abandoned += abandoned.len() as u64;
                abandoned
            }
            None => Vec::new(),
        }
    }
}

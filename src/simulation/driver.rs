//! Day-cycle driver
//!
//! Each simulated day runs two phases in a fixed order:
//!
//! 1. Deferred re-dispatch: every gated stage, in discovery order, is asked
//!    which of its waiting patients continue today. Once all gates have
//!    answered, those patients are routed on past the stage that held them.
//! 2. Arrivals: the generator's new patients are routed from the start stage.
//!
//! Everything a run produces lives in the returned [`SimulationResult`].

use log::{debug, info, warn};
use std::collections::HashSet;

use super::capacity::PatientGenerator;
use super::clock::{Day, SimulationClock};
use super::entity::Entity;
use super::error::{SimError, SimResult};
use super::graph::{GateStats, ProcessGraph};
use super::traversal::{Routed, RoutingFailure};
use super::types::{EntityId, StageId, DEFAULT_HORIZON};

/// What to do when a single patient cannot be routed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Record the failure and carry on with the next patient
    #[default]
    Isolate,
    /// Stop the run with [`SimError::Routing`]
    Abort,
}

#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of days to simulate
    pub horizon: u32,
    pub failure_policy: FailurePolicy,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            horizon: DEFAULT_HORIZON,
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Counters for one simulated day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySummary {
    pub day: Day,
    /// Patients released by capacity providers
    pub released: usize,
    /// New patients from the generator
    pub arrivals: usize,
    pub discharged: usize,
    /// Patients admitted by a provider and now waiting
    pub deferred: usize,
    pub failed: usize,
}

impl DaySummary {
    fn new(day: Day) -> Self {
        Self {
            day,
            released: 0,
            arrivals: 0,
            discharged: 0,
            deferred: 0,
            failed: 0,
        }
    }
}

/// Outcome of a simulation run
#[derive(Debug)]
pub struct SimulationResult<E> {
    /// Discharged patients in discharge order
    pub discharged: Vec<E>,
    /// Patients that could not be routed (isolated failures)
    pub failures: Vec<RoutingFailure<E>>,
    /// Patients still held by a provider when the run ended
    pub still_waiting: Vec<(StageId, E)>,
    pub days: Vec<DaySummary>,
    /// Admission counters per gated stage at the end of the run
    pub gates: Vec<GateStats>,
}

impl<E> Default for SimulationResult<E> {
    fn default() -> Self {
        Self {
            discharged: Vec::new(),
            failures: Vec::new(),
            still_waiting: Vec::new(),
            days: Vec::new(),
            gates: Vec::new(),
        }
    }
}

impl<E: Entity> SimulationResult<E> {
    pub fn total_arrivals(&self) -> usize {
        self.days.iter().map(|day| day.arrivals).sum()
    }

    pub fn total_deferred(&self) -> usize {
        self.days.iter().map(|day| day.deferred).sum()
    }

    /// Admitted patients no provider ever gave back
    pub fn unaccounted(&self) -> u64 {
        self.gates.iter().map(GateStats::outstanding).sum()
    }

    /// Discharged patients whose pathway ends at `stage`
    pub fn discharged_at(&self, stage: StageId) -> usize {
        self.discharged
            .iter()
            .filter(|entity| entity.pathway().last() == Some(&stage))
            .count()
    }

    /// Print a summary of the run to stdout
    pub fn print_summary(&self, graph: &ProcessGraph<E>) {
        println!("=== Simulation Summary ===");
        println!("Days simulated: {}", self.days.len());
        println!("Patients generated: {}", self.total_arrivals());
        println!("Patients discharged: {}", self.discharged.len());
        println!("Patients still waiting: {}", self.still_waiting.len());
        println!("Routing failures: {}", self.failures.len());

        println!();
        println!("Discharges by final stage:");
        for stage in graph.stages().filter(|stage| graph.is_terminal(*stage)) {
            println!("  {:<32} {}", graph.stage_name(stage), self.discharged_at(stage));
        }

        if !self.gates.is_empty() {
            println!();
            println!("Capacity gates:");
            for gate in &self.gates {
                println!(
                    "  {} [{}]: admitted {}, declined {}, released {}, abandoned {}",
                    graph.stage_name(gate.stage),
                    gate.resource,
                    gate.admitted,
                    gate.declined,
                    gate.released,
                    gate.abandoned
                );
            }
        }
    }
}

/// Runs patients from a generator through a process graph, day by day
pub struct Simulation<E, G> {
    graph: ProcessGraph<E>,
    generator: G,
    config: SimConfig,
    seen: HashSet<EntityId>,
}

impl<E, G> Simulation<E, G>
where
    E: Entity,
    G: PatientGenerator<E>,
{
    pub fn new(graph: ProcessGraph<E>, generator: G) -> Self {
        Self::with_config(graph, generator, SimConfig::default())
    }

    pub fn with_config(graph: ProcessGraph<E>, generator: G, config: SimConfig) -> Self {
        Self {
            graph,
            generator,
            config,
            seen: HashSet::new(),
        }
    }

    pub fn graph(&self) -> &ProcessGraph<E> {
        &self.graph
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Run every day of the horizon, then collect patients still held by
    /// providers.
    pub fn run(&mut self) -> SimResult<SimulationResult<E>> {
        let mut result = SimulationResult::default();

        for day in SimulationClock::new(self.config.horizon) {
            self.step(day, &mut result)?;
        }

        self.finish(&mut result);

        info!(
            "Simulation finished after {} days: {} generated, {} discharged, {} waiting, {} failed",
            result.days.len(),
            result.total_arrivals(),
            result.discharged.len(),
            result.still_waiting.len(),
            result.failures.len()
        );

        Ok(result)
    }

    /// Simulate a single day, appending its outcomes to `result`
    pub fn step(&mut self, day: Day, result: &mut SimulationResult<E>) -> SimResult<()> {
        let mut summary = DaySummary::new(day);

        // Every gate advances before anyone moves, so a patient released
        // upstream and admitted downstream waits there until tomorrow
        let gated: Vec<StageId> = self.graph.gated_stages().to_vec();
        let mut releases: Vec<(StageId, Vec<E>)> = Vec::with_capacity(gated.len());
        for stage in gated {
            let released = self.graph.advance_gate(stage, day);
            if !released.is_empty() {
                debug!(
                    "{}: {} patients released from '{}'",
                    day,
                    released.len(),
                    self.graph.stage_name(stage)
                );
            }
            releases.push((stage, released));
        }

        for (stage, released) in releases {
            for entity in released {
                summary.released += 1;
                let outcome = self.graph.route(stage, entity, false);
                self.settle(day, outcome, &mut summary, result)?;
            }
        }

        let arrivals = self.generator.generate(day.number, day.weekday);
        let start = self.graph.start();
        for entity in arrivals {
            if !self.seen.insert(entity.id()) {
                return Err(SimError::DuplicateEntity {
                    id: entity.id(),
                    day: day.number,
                });
            }
            summary.arrivals += 1;
            let outcome = self.graph.route(start, entity, true);
            self.settle(day, outcome, &mut summary, result)?;
        }

        debug!(
            "{}: {} arrivals, {} released, {} discharged, {} deferred",
            day, summary.arrivals, summary.released, summary.discharged, summary.deferred
        );
        result.days.push(summary);
        Ok(())
    }

    fn settle(
        &self,
        day: Day,
        outcome: Result<Routed<E>, RoutingFailure<E>>,
        summary: &mut DaySummary,
        result: &mut SimulationResult<E>,
    ) -> SimResult<()> {
        match outcome {
            Ok(Routed::Discharged(entity)) => {
                summary.discharged += 1;
                result.discharged.push(entity);
            }
            Ok(Routed::Waiting { .. }) => {
                summary.deferred += 1;
            }
            Err(failure) => match self.config.failure_policy {
                FailurePolicy::Abort => {
                    return Err(SimError::Routing {
                        day: day.number,
                        entity: failure.id,
                        source: failure.error,
                    });
                }
                FailurePolicy::Isolate => {
                    warn!("{}: patient {} not routed: {}", day, failure.id, failure.error);
                    summary.failed += 1;
                    result.failures.push(failure);
                }
            },
        }
        Ok(())
    }

    /// Reclaim patients still held by providers and snapshot gate counters
    fn finish(&mut self, result: &mut SimulationResult<E>) {
        let gated: Vec<StageId> = self.graph.gated_stages().to_vec();
        for stage in gated {
            for entity in self.graph.abandon_gate(stage) {
                result.still_waiting.push((stage, entity));
            }
        }

        result.gates = self.graph.gate_stats();
        for gate in &result.gates {
            if gate.released + gate.abandoned > gate.admitted {
                warn!(
                    "Provider at '{}' gave back {} patients but admitted only {}",
                    self.graph.stage_name(gate.stage),
                    gate.released + gate.abandoned,
                    gate.admitted
                );
            } else if gate.outstanding() > 0 {
                warn!(
                    "Provider at '{}' still accounts for {} admitted patients it never handed back",
                    self.graph.stage_name(gate.stage),
                    gate.outstanding()
                );
            }
        }
    }
}

//! Capacity-gated routing of a single patient
//!
//! Routing walks the graph from a given stage until the patient either
//! reaches a terminal stage (discharge) or is admitted by a capacity
//! provider (waiting). The walk is a loop over the current stage, bounded by
//! the graph's hop limit.

use log::debug;
use petgraph::graph::NodeIndex;

use super::capacity::Admission;
use super::entity::Entity;
use super::error::RouteError;
use super::graph::{ProcessGraph, Routing};
use super::types::{EntityId, StageId};

/// Result of routing one patient
#[derive(Debug)]
pub enum Routed<E> {
    /// Reached a terminal stage; the pathway is complete
    Discharged(E),
    /// Admitted by the provider of `stage`, which now holds the patient
    Waiting { stage: StageId },
}

impl<E> Routed<E> {
    pub fn is_discharged(&self) -> bool {
        matches!(self, Routed::Discharged(_))
    }

    pub fn discharged(self) -> Option<E> {
        match self {
            Routed::Discharged(entity) => Some(entity),
            Routed::Waiting { .. } => None,
        }
    }
}

/// A patient that could not be routed, handed back with the reason
#[derive(Debug)]
pub struct RoutingFailure<E> {
    pub id: EntityId,
    pub entity: E,
    pub error: RouteError,
}

impl<E: Entity> ProcessGraph<E> {
    /// Routes `entity` onwards from `stage`.
    ///
    /// With `enforce_capacity` set, a gated `stage` first asks its provider
    /// for admission; a released patient is routed with it unset so it moves
    /// past the stage that held it.
    pub fn route(
        &mut self,
        stage: StageId,
        mut entity: E,
        enforce_capacity: bool,
    ) -> Result<Routed<E>, RoutingFailure<E>> {
        let mut current = stage.0;
        let mut enforce = enforce_capacity;

        for _ in 0..self.hop_limit {
            if enforce {
                if let Some(gate) = self.stages[current.index()].gate.as_mut() {
                    match gate.provider.admit(gate.resource.as_str(), entity) {
                        Admission::Admitted => {
                            gate.admitted += 1;
                            debug!(
                                "Patient admitted at '{}'",
                                self.stage_name(StageId(current))
                            );
                            return Ok(Routed::Waiting {
                                stage: StageId(current),
                            });
                        }
                        Admission::Declined(returned) => {
                            gate.declined += 1;
                            let next = gate.overflow;
                            entity = returned;
                            debug!(
                                "Patient {} declined at '{}', overflowing to '{}'",
                                entity.id(),
                                self.stage_name(StageId(current)),
                                self.stage_name(StageId(next))
                            );
                            if self.is_terminal(StageId(next)) {
                                entity.record_visit(StageId(next));
                                return Ok(Routed::Discharged(entity));
                            }
                            current = next;
                            continue;
                        }
                    }
                }
            }

            entity.record_visit(StageId(current));

            let next = match self.next_stage(current, &entity) {
                Ok(Some(next)) => next,
                Ok(None) => return Ok(Routed::Discharged(entity)),
                Err(error) => {
                    return Err(RoutingFailure {
                        id: entity.id(),
                        entity,
                        error,
                    })
                }
            };

            if self.is_terminal(StageId(next)) {
                entity.record_visit(StageId(next));
                debug!(
                    "Patient {} discharged at '{}'",
                    entity.id(),
                    self.stage_name(StageId(next))
                );
                return Ok(Routed::Discharged(entity));
            }

            current = next;
            enforce = true;
        }

        Err(RoutingFailure {
            id: entity.id(),
            error: RouteError::HopLimit {
                stage: self.stage_name(StageId(current)).to_string(),
                limit: self.hop_limit,
            },
            entity,
        })
    }

    /// Successor of a stage the patient has just been recorded at.
    /// `None` means the stage itself is terminal.
    fn next_stage(&mut self, current: NodeIndex, entity: &E) -> Result<Option<NodeIndex>, RouteError> {
        let stage = &mut self.stages[current.index()];
        match &mut stage.routing {
            Routing::Terminal => Ok(None),
            Routing::Direct(next) => Ok(Some(*next)),
            Routing::Weighted {
                sampler,
                targets,
                cumulative,
            } => {
                let p = sampler.sample(entity);
                let index = cumulative
                    .partition_point(|c| c.0 < p)
                    .min(targets.len().saturating_sub(1));
                Ok(targets.get(index).copied())
            }
            Routing::Bernoulli {
                trial,
                on_true,
                on_false,
            } => {
                let next = if trial.trial(entity) { *on_true } else { *on_false };
                Ok(Some(next))
            }
            Routing::Faulty(fault) => Err(RouteError::BranchConfiguration {
                stage: self.topology[current].clone(),
                fault: fault.clone(),
            }),
        }
    }
}

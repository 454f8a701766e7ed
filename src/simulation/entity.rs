//! Entities travelling through the process graph

use std::fmt;

use super::types::{EntityId, StageId};

/// Something that can be routed through a [`ProcessGraph`](super::ProcessGraph).
///
/// Implementors carry an identity and an append-only visit history. Extra
/// fields (age, acuity, ...) are free to live on the implementing type, where
/// branch samplers and capacity providers can read them.
pub trait Entity: fmt::Debug {
    fn id(&self) -> EntityId;

    /// Stages visited so far, in order
    fn pathway(&self) -> &[StageId];

    /// Record a visit. Only the traversal engine calls this.
    fn record_visit(&mut self, stage: StageId);
}

/// The stock entity: an id and a pathway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patient {
    pub id: EntityId,
    pathway: Vec<StageId>,
}

impl Patient {
    pub fn new(id: u64) -> Self {
        Self {
            id: EntityId(id),
            pathway: Vec::new(),
        }
    }
}

impl Entity for Patient {
    fn id(&self) -> EntityId {
        self.id
    }

    fn pathway(&self) -> &[StageId] {
        &self.pathway
    }

    fn record_visit(&mut self, stage: StageId) {
        self.pathway.push(stage);
    }
}

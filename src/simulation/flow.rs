//! Pathway flows
//!
//! Aggregates the pathways of discharged patients into weighted links
//! between consecutive stages: the data behind a Sankey diagram.

use anyhow::{Context, Result};
use csv::Writer;
use std::collections::HashMap;
use std::io::Write;

use super::entity::Entity;
use super::graph::ProcessGraph;
use super::types::StageId;

/// Patients that moved from `source` straight to `target`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowLink {
    pub source: StageId,
    pub target: StageId,
    pub patients: u64,
}

/// Links in first-seen order
#[derive(Debug, Clone, Default)]
pub struct PathwayFlow {
    links: Vec<FlowLink>,
    index: HashMap<(StageId, StageId), usize>,
}

impl PathwayFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entities<E: Entity>(entities: &[E]) -> Self {
        let mut flow = Self::new();
        for entity in entities {
            flow.add_pathway(entity.pathway());
        }
        flow
    }

    /// Count every consecutive pair of stages in `pathway`
    pub fn add_pathway(&mut self, pathway: &[StageId]) {
        for pair in pathway.windows(2) {
            let key = (pair[0], pair[1]);
            match self.index.get(&key) {
                Some(&position) => self.links[position].patients += 1,
                None => {
                    self.index.insert(key, self.links.len());
                    self.links.push(FlowLink {
                        source: pair[0],
                        target: pair[1],
                        patients: 1,
                    });
                }
            }
        }
    }

    pub fn links(&self) -> &[FlowLink] {
        &self.links
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn patients_between(&self, source: StageId, target: StageId) -> u64 {
        self.index
            .get(&(source, target))
            .map_or(0, |&position| self.links[position].patients)
    }

    /// Patients that entered `stage` along any link
    pub fn inflow(&self, stage: StageId) -> u64 {
        self.links
            .iter()
            .filter(|link| link.target == stage)
            .map(|link| link.patients)
            .sum()
    }

    /// Stages touched by any link, in first-seen order
    pub fn stages(&self) -> Vec<StageId> {
        let mut stages = Vec::new();
        for link in &self.links {
            for stage in [link.source, link.target] {
                if !stages.contains(&stage) {
                    stages.push(stage);
                }
            }
        }
        stages
    }

    /// Write `source,target,patients` rows with stage names
    pub fn write_csv<E, W: Write>(&self, graph: &ProcessGraph<E>, out: W) -> Result<()> {
        let mut writer = Writer::from_writer(out);
        writer
            .write_record(["source", "target", "patients"])
            .context("Failed to write CSV header")?;
        for link in &self.links {
            let patients = link.patients.to_string();
            writer
                .write_record([
                    graph.stage_name(link.source),
                    graph.stage_name(link.target),
                    patients.as_str(),
                ])
                .context("Failed to write CSV row")?;
        }
        writer.flush().context("Failed to flush CSV output")
    }
}

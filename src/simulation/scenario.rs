//! Demo scenario: an outpatient pathway with a clinic appointment book
//!
//! ```text
//! Patient arrives -> Patient triaged -+-> Patient discharged        (0.2)
//!                                     +-> Appointment made          (0.8, gated)
//! Appointment made -> Patient treated      (when a clinic slot comes up)
//! Appointment made -> Referred elsewhere   (overflow: waiting list full)
//! Patient treated  -> Follow-up booked     (bernoulli true)
//! Patient treated  -> Discharged after treatment (bernoulli false)
//! ```

use std::collections::VecDeque;

use super::branch::{CoinFlip, UniformSampler};
use super::capacity::{Admission, CapacityProvider, PatientGenerator};
use super::clock::Weekday;
use super::entity::Patient;
use super::error::ConfigError;
use super::graph::{ProcessGraph, ProcessGraphBuilder, Transition};

pub const STAGE_ARRIVES: &str = "Patient arrives";
pub const STAGE_TRIAGED: &str = "Patient triaged";
pub const STAGE_DISCHARGED: &str = "Patient discharged";
pub const STAGE_APPOINTMENT: &str = "Appointment made";
pub const STAGE_TREATED: &str = "Patient treated";
pub const STAGE_REFERRED: &str = "Referred elsewhere";
pub const STAGE_FOLLOW_UP: &str = "Follow-up booked";
pub const STAGE_TREATED_DISCHARGED: &str = "Discharged after treatment";

/// Resource name of the outpatient clinic
pub const CLINIC_RESOURCE: &str = "outpatient clinic";

/// Share of triaged patients sent home straight away
pub const TRIAGE_DISCHARGE_PROBABILITY: f64 = 0.2;
/// Share of treated patients that need a follow-up
pub const FOLLOW_UP_PROBABILITY: f64 = 0.3;

/// Waiting list for clinic sessions
///
/// Admits patients while the list has room. On each clinic day the longest
/// waiting patients are seen, up to `slots_per_clinic`.
#[derive(Debug, Clone)]
pub struct AppointmentBook<E> {
    slots_per_clinic: usize,
    max_waiting: usize,
    clinic_days: Vec<Weekday>,
    booked: VecDeque<E>,
}

impl<E> AppointmentBook<E> {
    pub fn new(slots_per_clinic: usize, max_waiting: usize, clinic_days: Vec<Weekday>) -> Self {
        Self {
            slots_per_clinic,
            max_waiting,
            clinic_days,
            booked: VecDeque::new(),
        }
    }

    pub fn waiting(&self) -> usize {
        self.booked.len()
    }
}

impl<E> CapacityProvider<E> for AppointmentBook<E> {
    fn admit(&mut self, _resource: &str, entity: E) -> Admission<E> {
        if self.booked.len() < self.max_waiting {
            self.booked.push_back(entity);
            Admission::Admitted
        } else {
            Admission::Declined(entity)
        }
    }

    fn advance_day(&mut self, _day_num: u32, weekday: Weekday) -> Vec<E> {
        if !self.clinic_days.contains(&weekday) {
            return Vec::new();
        }
        let seen = self.slots_per_clinic.min(self.booked.len());
        self.booked.drain(..seen).collect()
    }

    fn abandon(&mut self) -> Vec<E> {
        self.booked.drain(..).collect()
    }
}

/// Generates a fixed number of patients per weekday, with sequential ids
#[derive(Debug, Clone)]
pub struct WeeklyArrivals {
    per_weekday: [u32; 7],
    next_id: u64,
}

impl WeeklyArrivals {
    /// `per_weekday[0]` is Monday
    pub fn new(per_weekday: [u32; 7]) -> Self {
        Self {
            per_weekday,
            next_id: 0,
        }
    }

    /// `count` patients every Monday and nobody otherwise
    pub fn mondays(count: u32) -> Self {
        Self::new([count, 0, 0, 0, 0, 0, 0])
    }
}

impl PatientGenerator<Patient> for WeeklyArrivals {
    fn generate(&mut self, _day_num: u32, weekday: Weekday) -> Vec<Patient> {
        (0..self.per_weekday[weekday.index()])
            .map(|_| {
                let patient = Patient::new(self.next_id);
                self.next_id += 1;
                patient
            })
            .collect()
    }
}

/// Tunables of the demo scenario
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub seed: Option<u64>,
    pub slots_per_clinic: usize,
    pub max_waiting: usize,
    pub clinic_days: Vec<Weekday>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            seed: None,
            slots_per_clinic: 4,
            max_waiting: 20,
            clinic_days: Weekday::ALL
                .into_iter()
                .filter(|day| !day.is_weekend())
                .collect(),
        }
    }
}

/// Builds the demo outpatient graph
pub fn outpatient_graph(config: &ScenarioConfig) -> Result<ProcessGraph<Patient>, ConfigError> {
    let mut builder = ProcessGraphBuilder::new();
    builder
        .transition(STAGE_ARRIVES, STAGE_TRIAGED, Transition::plain())
        .transition(
            STAGE_TRIAGED,
            STAGE_DISCHARGED,
            Transition::weighted(TRIAGE_DISCHARGE_PROBABILITY),
        )
        .transition(
            STAGE_TRIAGED,
            STAGE_APPOINTMENT,
            Transition::weighted(1.0 - TRIAGE_DISCHARGE_PROBABILITY),
        )
        .transition(STAGE_APPOINTMENT, STAGE_TREATED, Transition::plain())
        .transition(STAGE_APPOINTMENT, STAGE_REFERRED, Transition::overflow())
        .transition(STAGE_TREATED, STAGE_FOLLOW_UP, Transition::bernoulli(true))
        .transition(
            STAGE_TREATED,
            STAGE_TREATED_DISCHARGED,
            Transition::bernoulli(false),
        )
        .gate(
            STAGE_APPOINTMENT,
            CLINIC_RESOURCE,
            AppointmentBook::new(
                config.slots_per_clinic,
                config.max_waiting,
                config.clinic_days.clone(),
            ),
        );

    match config.seed {
        Some(seed) => {
            builder
                .sampler(STAGE_TRIAGED, UniformSampler::seeded(seed))
                .bernoulli_trial(
                    STAGE_TREATED,
                    CoinFlip::seeded(FOLLOW_UP_PROBABILITY, seed.wrapping_add(1)),
                );
        }
        None => {
            builder
                .sampler(STAGE_TRIAGED, UniformSampler::new())
                .bernoulli_trial(STAGE_TREATED, CoinFlip::new(FOLLOW_UP_PROBABILITY));
        }
    }

    builder.build()
}

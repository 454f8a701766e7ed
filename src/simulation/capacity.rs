//! Capacity provider and generator contracts
//!
//! Both are supplied by the user of the engine. The engine never looks at a
//! provider's waiting list; it only asks for admissions and collects the
//! patients the provider releases each day.

use super::clock::Weekday;

/// Outcome of an admission request
#[derive(Debug)]
pub enum Admission<E> {
    /// The provider now holds the entity and will release it through
    /// [`CapacityProvider::advance_day`]
    Admitted,
    /// No capacity; the entity is handed back for overflow routing
    Declined(E),
}

impl<E> Admission<E> {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Per-stage admission and waiting-list bookkeeping
pub trait CapacityProvider<E> {
    /// Try to grant `resource` to `entity` right now
    fn admit(&mut self, resource: &str, entity: E) -> Admission<E>;

    /// Entities admitted earlier that may continue today
    fn advance_day(&mut self, day_num: u32, weekday: Weekday) -> Vec<E>;

    /// Hand back every entity still held. Called once after the last day.
    fn abandon(&mut self) -> Vec<E> {
        Vec::new()
    }
}

/// Creates the new arrivals of a day. Called exactly once per simulated day.
pub trait PatientGenerator<E> {
    fn generate(&mut self, day_num: u32, weekday: Weekday) -> Vec<E>;
}

/// Adapts a closure into a [`PatientGenerator`]
pub struct GeneratorFn<F>(F);

pub fn generator_fn<E, F>(f: F) -> GeneratorFn<F>
where
    F: FnMut(u32, Weekday) -> Vec<E>,
{
    GeneratorFn(f)
}

impl<E, F> PatientGenerator<E> for GeneratorFn<F>
where
    F: FnMut(u32, Weekday) -> Vec<E>,
{
    fn generate(&mut self, day_num: u32, weekday: Weekday) -> Vec<E> {
        (self.0)(day_num, weekday)
    }
}

/// Never admits anyone
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapacity;

impl<E> CapacityProvider<E> for NoCapacity {
    fn admit(&mut self, _resource: &str, entity: E) -> Admission<E> {
        Admission::Declined(entity)
    }

    fn advance_day(&mut self, _day_num: u32, _weekday: Weekday) -> Vec<E> {
        Vec::new()
    }
}

//! Routing of single patients through a process graph

use patient_flow::simulation::{
    sampler_fn, trial_fn, Admission, BranchFault, CapacityProvider, Entity, FixedOutcome,
    FixedSample, NoCapacity, Patient, ProcessGraph, ProcessGraphBuilder, RouteError, Routed,
    Transition, UniformSampler, Weekday,
};

fn names(graph: &ProcessGraph<Patient>, patient: &Patient) -> Vec<String> {
    graph
        .pathway_names(patient.pathway())
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn discharge(graph: &mut ProcessGraph<Patient>, id: u64) -> Patient {
    let start = graph.start();
    match graph.route(start, Patient::new(id), true) {
        Ok(Routed::Discharged(patient)) => patient,
        Ok(Routed::Waiting { stage }) => panic!("patient {} waiting at {}", id, stage),
        Err(failure) => panic!("patient {} failed: {}", id, failure.error),
    }
}

/// Admits everyone and keeps them
#[derive(Default)]
struct AdmitAll {
    held: Vec<Patient>,
}

impl CapacityProvider<Patient> for AdmitAll {
    fn admit(&mut self, _resource: &str, entity: Patient) -> Admission<Patient> {
        self.held.push(entity);
        Admission::Admitted
    }

    fn advance_day(&mut self, _day_num: u32, _weekday: Weekday) -> Vec<Patient> {
        Vec::new()
    }
}

#[test]
fn test_linear_graph_visits_every_stage() {
    let mut builder: ProcessGraphBuilder<Patient> = ProcessGraphBuilder::new();
    builder
        .transition("Start", "A", Transition::plain())
        .transition("A", "B", Transition::plain());
    let mut graph = builder.build().unwrap();

    for id in 0..5 {
        let patient = discharge(&mut graph, id);
        assert_eq!(names(&graph, &patient), vec!["Start", "A", "B"]);
    }
}

#[test]
fn test_single_stage_graph_discharges_immediately() {
    let mut builder: ProcessGraphBuilder<Patient> = ProcessGraphBuilder::new();
    builder.stage("Only");
    let mut graph = builder.build().unwrap();

    let patient = discharge(&mut graph, 0);
    assert_eq!(names(&graph, &patient), vec!["Only"]);
}

#[test]
fn test_weighted_branching_converges_to_weights() {
    let mut builder: ProcessGraphBuilder<Patient> = ProcessGraphBuilder::new();
    builder
        .transition("Start", "T", Transition::plain())
        .transition("T", "Discharge", Transition::weighted(0.2))
        .transition("T", "Scheduled", Transition::weighted(0.8))
        .sampler("T", UniformSampler::seeded(42));
    let mut graph = builder.build().unwrap();
    let discharge_stage = graph.find_stage("Discharge").unwrap();

    let total = 10_000;
    let discharged = (0..total)
        .map(|id| discharge(&mut graph, id))
        .filter(|patient| patient.pathway().last() == Some(&discharge_stage))
        .count();

    let share = discharged as f64 / total as f64;
    assert!(
        (share - 0.2).abs() <= 0.01,
        "discharge share {:.4} strays from 0.2",
        share
    );
}

#[test]
fn test_weighted_selection_uses_cumulative_boundaries() {
    let build = |p: f64| {
        let mut builder: ProcessGraphBuilder<Patient> = ProcessGraphBuilder::new();
        builder
            .transition("Start", "T", Transition::plain())
            .transition("T", "Low", Transition::weighted(0.25))
            .transition("T", "Mid", Transition::weighted(0.25))
            .transition("T", "High", Transition::weighted(0.5))
            .sampler("T", FixedSample(p));
        builder.build().unwrap()
    };

    for (p, expected) in [(0.0, "Low"), (0.25, "Low"), (0.3, "Mid"), (0.5, "Mid"), (0.99, "High")] {
        let mut graph = build(p);
        let patient = discharge(&mut graph, 0);
        assert_eq!(names(&graph, &patient).last().unwrap(), expected, "p = {}", p);
    }
}

#[test]
fn test_zero_probability_transition_is_never_taken() {
    let mut builder: ProcessGraphBuilder<Patient> = ProcessGraphBuilder::new();
    builder
        .transition("Start", "Never", Transition::weighted(0.0))
        .transition("Start", "Always", Transition::weighted(1.0))
        .sampler("Start", FixedSample(0.0));
    let mut graph = builder.build().unwrap();

    let patient = discharge(&mut graph, 0);
    assert_eq!(names(&graph, &patient), vec!["Start", "Always"]);
}

#[test]
fn test_bernoulli_branching_follows_outcome() {
    for outcome in [true, false] {
        let mut builder: ProcessGraphBuilder<Patient> = ProcessGraphBuilder::new();
        builder
            .transition("Start", "Treat", Transition::plain())
            .transition("Treat", "Follow-up", Transition::bernoulli(true))
            .transition("Treat", "Home", Transition::bernoulli(false))
            .bernoulli_trial("Treat", FixedOutcome(outcome));
        let mut graph = builder.build().unwrap();

        let expected = if outcome { "Follow-up" } else { "Home" };
        for id in 0..50 {
            let patient = discharge(&mut graph, id);
            assert_eq!(names(&graph, &patient), vec!["Start", "Treat", expected]);
        }
    }
}

#[test]
fn test_samplers_can_read_the_patient() {
    let mut builder: ProcessGraphBuilder<Patient> = ProcessGraphBuilder::new();
    builder
        .transition("Start", "Even", Transition::weighted(0.5))
        .transition("Start", "Odd", Transition::weighted(0.5))
        .sampler(
            "Start",
            sampler_fn(|patient: &Patient| if patient.id.0 % 2 == 0 { 0.1 } else { 0.9 }),
        );
    let mut graph = builder.build().unwrap();

    let even = discharge(&mut graph, 4);
    let odd = discharge(&mut graph, 7);
    assert_eq!(names(&graph, &even), vec!["Start", "Even"]);
    assert_eq!(names(&graph, &odd), vec!["Start", "Odd"]);

    let mut builder: ProcessGraphBuilder<Patient> = ProcessGraphBuilder::new();
    builder
        .transition("Start", "Big", Transition::bernoulli(true))
        .transition("Start", "Small", Transition::bernoulli(false))
        .bernoulli_trial("Start", trial_fn(|patient: &Patient| patient.id.0 >= 100));
    let mut graph = builder.build().unwrap();

    let big = discharge(&mut graph, 150);
    let small = discharge(&mut graph, 3);
    assert_eq!(names(&graph, &big), vec!["Start", "Big"]);
    assert_eq!(names(&graph, &small), vec!["Start", "Small"]);
}

#[test]
fn test_declined_admission_takes_overflow_without_recording_gate() {
    let mut builder: ProcessGraphBuilder<Patient> = ProcessGraphBuilder::new();
    builder
        .transition("Start", "Clinic", Transition::plain())
        .transition("Clinic", "Treated", Transition::plain())
        .transition("Clinic", "Elsewhere", Transition::overflow())
        .gate("Clinic", "clinic", NoCapacity);
    let mut graph = builder.build().unwrap();

    for id in 0..20 {
        let patient = discharge(&mut graph, id);
        assert_eq!(names(&graph, &patient), vec!["Start", "Elsewhere"]);
    }

    let stats = graph.gate_stats();
    assert_eq!(stats[0].declined, 20);
    assert_eq!(stats[0].admitted, 0);
}

#[test]
fn test_overflow_continues_through_non_terminal_stages() {
    let mut builder: ProcessGraphBuilder<Patient> = ProcessGraphBuilder::new();
    builder
        .transition("Start", "Clinic", Transition::plain())
        .transition("Clinic", "Treated", Transition::plain())
        .transition("Clinic", "Waiting room", Transition::overflow())
        .transition("Waiting room", "Seen later", Transition::plain())
        .gate("Clinic", "clinic", NoCapacity);
    let mut graph = builder.build().unwrap();

    let patient = discharge(&mut graph, 0);
    assert_eq!(
        names(&graph, &patient),
        vec!["Start", "Waiting room", "Seen later"]
    );
}

#[test]
fn test_admitted_patient_waits_at_gate() {
    let mut builder: ProcessGraphBuilder<Patient> = ProcessGraphBuilder::new();
    builder
        .transition("Start", "Clinic", Transition::plain())
        .transition("Clinic", "Treated", Transition::plain())
        .gate("Clinic", "clinic", AdmitAll::default());
    let mut graph = builder.build().unwrap();
    let clinic = graph.find_stage("Clinic").unwrap();

    let start = graph.start();
    match graph.route(start, Patient::new(1), true) {
        Ok(Routed::Waiting { stage }) => assert_eq!(stage, clinic),
        other => panic!("expected the patient to wait, got {:?}", other.map(|r| r.is_discharged())),
    }
    assert_eq!(graph.gate_stats()[0].admitted, 1);
}

#[test]
fn test_released_patient_skips_bare_overflow() {
    let mut builder: ProcessGraphBuilder<Patient> = ProcessGraphBuilder::new();
    builder
        .transition("Start", "Clinic", Transition::plain())
        .transition("Clinic", "Treated", Transition::plain())
        .transition("Clinic", "Elsewhere", Transition::overflow())
        .gate("Clinic", "clinic", AdmitAll::default());
    let mut graph = builder.build().unwrap();
    let clinic = graph.find_stage("Clinic").unwrap();

    let mut patient = Patient::new(9);
    patient.record_visit(graph.start());
    let routed = graph.route(clinic, patient, false).unwrap();
    let patient = routed.discharged().expect("released patient discharges");
    assert_eq!(names(&graph, &patient), vec!["Start", "Clinic", "Treated"]);
}

#[test]
fn test_misconfigured_branch_fails_on_first_traversal() {
    let mut builder: ProcessGraphBuilder<Patient> = ProcessGraphBuilder::new();
    builder
        .transition("Start", "T", Transition::plain())
        .transition("T", "A", Transition::weighted(0.3))
        .transition("T", "B", Transition::weighted(0.3))
        .sampler("T", UniformSampler::seeded(1));
    let mut graph = builder.build().unwrap();

    let start = graph.start();
    let failure = graph
        .route(start, Patient::new(11), true)
        .expect_err("probabilities sum to 0.6");

    assert_eq!(failure.id.0, 11);
    match &failure.error {
        RouteError::BranchConfiguration { stage, fault } => {
            assert_eq!(stage, "T");
            assert!(matches!(fault, BranchFault::ProbabilitySum { .. }));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(failure.error.to_string().contains("'T'"));
    assert_eq!(names(&graph, &failure.entity), vec!["Start", "T"]);
}

#[test]
fn test_cycles_stop_at_hop_limit() {
    let mut builder: ProcessGraphBuilder<Patient> = ProcessGraphBuilder::new();
    builder
        .transition("Start", "A", Transition::plain())
        .transition("A", "B", Transition::plain())
        .transition("B", "A", Transition::plain())
        .hop_limit(25);
    let mut graph = builder.build().unwrap();
    assert_eq!(graph.hop_limit(), 25);

    let start = graph.start();
    let failure = graph
        .route(start, Patient::new(0), true)
        .expect_err("A and B loop forever");
    assert!(matches!(
        failure.error,
        RouteError::HopLimit { limit: 25, .. }
    ));
    assert_eq!(failure.entity.pathway().len(), 25);
}

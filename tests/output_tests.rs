//! Flow aggregation and rendering tests

use patient_flow::simulation::render;
use patient_flow::simulation::scenario::{self, ScenarioConfig, WeeklyArrivals};
use patient_flow::simulation::{
    Entity, FixedSample, PathwayFlow, Patient, ProcessGraph, ProcessGraphBuilder, Simulation,
    Transition,
};

fn branching_graph() -> ProcessGraph<Patient> {
    let mut builder: ProcessGraphBuilder<Patient> = ProcessGraphBuilder::new();
    builder
        .transition("Arrive", "Triage", Transition::plain())
        .transition("Triage", "Home, same day", Transition::weighted(0.5))
        .transition("Triage", "Ward", Transition::weighted(0.5))
        .sampler("Triage", FixedSample(0.9));
    builder.build().unwrap()
}

#[test]
fn test_flow_counts_consecutive_stages() {
    let mut graph = branching_graph();
    let start = graph.start();
    let patients: Vec<Patient> = (0..3)
        .map(|id| {
            graph
                .route(start, Patient::new(id), true)
                .ok()
                .and_then(|routed| routed.discharged())
                .expect("patient discharges")
        })
        .collect();

    assert!(PathwayFlow::new().is_empty());
    let flow = PathwayFlow::from_entities(&patients);
    assert!(!flow.is_empty());
    let arrive = graph.find_stage("Arrive").unwrap();
    let triage = graph.find_stage("Triage").unwrap();
    let ward = graph.find_stage("Ward").unwrap();

    assert_eq!(flow.links().len(), 2);
    assert_eq!(flow.patients_between(arrive, triage), 3);
    assert_eq!(flow.patients_between(triage, ward), 3);
    assert_eq!(flow.patients_between(arrive, ward), 0);
    assert_eq!(flow.inflow(ward), 3);
    assert_eq!(flow.stages(), vec![arrive, triage, ward]);
}

#[test]
fn test_flow_csv_quotes_stage_names() {
    let graph = branching_graph();
    let mut flow = PathwayFlow::new();
    let arrive = graph.find_stage("Arrive").unwrap();
    let triage = graph.find_stage("Triage").unwrap();
    let home = graph.find_stage("Home, same day").unwrap();
    flow.add_pathway(&[arrive, triage, home]);
    flow.add_pathway(&[arrive, triage, home]);

    let mut out = Vec::new();
    flow.write_csv(&graph, &mut out).unwrap();
    let csv = String::from_utf8(out).unwrap();

    assert_eq!(
        csv,
        "source,target,patients\nArrive,Triage,2\nTriage,\"Home, same day\",2\n"
    );
}

#[test]
fn test_graph_mermaid_lists_stages_and_attributes() {
    let graph = scenario::outpatient_graph(&ScenarioConfig {
        seed: Some(1),
        ..ScenarioConfig::default()
    })
    .unwrap();
    let mermaid = render::graph_mermaid(&graph);

    assert!(mermaid.starts_with("graph TD\n"));
    assert!(mermaid.contains("Patient triaged<br/>branch: weighted"));
    assert!(mermaid.contains("Appointment made<br/>resource: outpatient clinic"));
    assert!(mermaid.contains("probability: 0.2"));
    assert!(mermaid.contains("bernoulli: true"));
    assert!(mermaid.contains("|\"overflow\"|"));
    assert_eq!(
        mermaid.matches("-->").count(),
        graph.transition_count()
    );
}

#[test]
fn test_flow_mermaid_labels_links_with_counts() {
    let graph = scenario::outpatient_graph(&ScenarioConfig {
        seed: Some(9),
        ..ScenarioConfig::default()
    })
    .unwrap();
    let mut sim = Simulation::new(graph, WeeklyArrivals::mondays(4));
    let result = sim.run().unwrap();
    let flow = PathwayFlow::from_entities(&result.discharged);

    let arrived: u64 = result
        .discharged
        .iter()
        .filter(|patient| patient.pathway().len() > 1)
        .count() as u64;
    let start = sim.graph().start();
    let triaged = sim.graph().find_stage(scenario::STAGE_TRIAGED).unwrap();
    assert_eq!(flow.patients_between(start, triaged), arrived);

    let mermaid = render::flow_mermaid(sim.graph(), &flow);
    assert!(mermaid.starts_with("graph LR\n"));
    assert!(mermaid.contains(&format!("-->|{}|", arrived)));
}

#[test]
fn test_html_page_embeds_definition() {
    let html = render::mermaid_html("graph TD\n    0 --> 1\n");
    assert!(html.contains("<pre class=\"mermaid\">\ngraph TD\n    0 --> 1\n"));
    assert!(html.contains("mermaid.initialize({ startOnLoad: true });"));
}

#[test]
fn test_write_html_creates_file() {
    let path = std::env::temp_dir().join(format!("patient_flow_graph_{}.html", std::process::id()));
    let graph = branching_graph();
    render::write_html(&path, &render::graph_mermaid(&graph)).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("Home, same day"));
    std::fs::remove_file(&path).ok();
}

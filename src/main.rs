use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use patient_flow::simulation::render;
use patient_flow::simulation::scenario::{self, ScenarioConfig, WeeklyArrivals};
use patient_flow::simulation::{
    FailurePolicy, PathwayFlow, SimConfig, Simulation, Weekday, DEFAULT_HORIZON,
};

#[derive(Parser)]
#[command(name = "patient_flow")]
#[command(about = "Patient flow simulation through a capacity-gated outpatient pathway")]
struct Cli {
    /// Number of days to simulate
    #[arg(long, default_value_t = DEFAULT_HORIZON)]
    days: u32,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// New patients arriving each Monday
    #[arg(long, default_value = "5")]
    arrivals: u32,

    /// Patients seen per clinic session
    #[arg(long, default_value = "4")]
    clinic_slots: usize,

    /// Clinic days, comma separated (e.g. Mon,Weds,Fri)
    #[arg(
        long,
        value_delimiter = ',',
        value_parser = parse_weekday,
        default_values = ["Mon", "Tues", "Weds", "Thurs", "Fri"]
    )]
    clinic_days: Vec<Weekday>,

    /// Longest the clinic waiting list may grow before referring patients elsewhere
    #[arg(long, default_value = "20")]
    waiting_list: usize,

    /// Write the process graph as a Mermaid HTML page
    #[arg(long)]
    graph_html: Option<PathBuf>,

    /// Write the observed patient flows as a Mermaid HTML page
    #[arg(long)]
    flow_html: Option<PathBuf>,

    /// Write the observed patient flows as CSV (source,target,patients)
    #[arg(long)]
    flow_csv: Option<PathBuf>,

    /// Stop at the first patient that cannot be routed
    #[arg(long)]
    fail_fast: bool,
}

fn parse_weekday(label: &str) -> Result<Weekday, String> {
    Weekday::parse(label).ok_or_else(|| format!("unknown weekday '{}'", label))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run_headless(&cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

/// Run the demo scenario and report the outcome
fn run_headless(cli: &Cli) -> Result<()> {
    info!("Running patient flow simulation for {} days", cli.days);

    let scenario_config = ScenarioConfig {
        seed: cli.seed,
        slots_per_clinic: cli.clinic_slots,
        max_waiting: cli.waiting_list,
        clinic_days: cli.clinic_days.clone(),
    };
    let graph =
        scenario::outpatient_graph(&scenario_config).context("Failed to build the process graph")?;

    let faults = graph.branch_faults();
    if let Some((stage, fault)) = faults.first() {
        bail!(
            "stage '{}' cannot branch: {}",
            graph.stage_name(*stage),
            fault
        );
    }

    if let Some(path) = &cli.graph_html {
        render::write_html(path, &render::graph_mermaid(&graph))?;
        info!("Wrote process graph to {}", path.display());
    }

    let config = SimConfig {
        horizon: cli.days,
        failure_policy: if cli.fail_fast {
            FailurePolicy::Abort
        } else {
            FailurePolicy::Isolate
        },
    };
    let mut sim = Simulation::with_config(graph, WeeklyArrivals::mondays(cli.arrivals), config);
    let result = sim.run().context("Simulation aborted")?;

    println!();
    result.print_summary(sim.graph());
    println!();

    let flow = PathwayFlow::from_entities(&result.discharged);
    if let Some(path) = &cli.flow_html {
        render::write_html(path, &render::flow_mermaid(sim.graph(), &flow))?;
        info!("Wrote patient flows to {}", path.display());
    }
    if let Some(path) = &cli.flow_csv {
        let file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        flow.write_csv(sim.graph(), BufWriter::new(file))?;
        info!("Wrote patient flows to {}", path.display());
    }

    info!("=== SIMULATION COMPLETE ===");
    info!("Days simulated: {}", result.days.len());
    info!("Patients generated: {}", result.total_arrivals());
    info!("Patients discharged: {}", result.discharged.len());
    info!("Patients still waiting: {}", result.still_waiting.len());
    info!("Routing failures: {}", result.failures.len());
    info!(
        "Discharge rate: {:.1}%",
        if result.total_arrivals() > 0 {
            (result.discharged.len() as f32 / result.total_arrivals() as f32) * 100.0
        } else {
            0.0
        }
    );

    Ok(())
}

use std::process::{Command, Output};

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_patient_flow"))
        .args(args)
        .env("RUST_LOG", "warn,patient_flow=info")
        .output()
        .expect("Failed to execute simulation")
}

/// Pull the number following `label` out of the log output
fn logged_count(stderr: &str, label: &str) -> u64 {
    let line = stderr
        .lines()
        .find(|line| line.contains(label))
        .unwrap_or_else(|| panic!("Could not find '{}' line", label));

    line.split(label)
        .nth(1)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or_else(|| panic!("Could not parse count from line: {}", line))
}

/// Test that the simulation runs headless and logs its completion
#[test]
fn test_headless_simulation_completes() {
    let output = run_cli(&["--days", "60", "--seed", "7"]);

    assert!(
        output.status.success(),
        "Simulation failed. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("SIMULATION COMPLETE"),
        "Simulation did not complete properly. stderr: {}",
        stderr
    );

    // Nine Mondays in 60 days, five arrivals each
    assert_eq!(logged_count(&stderr, "Patients generated:"), 45);
    assert_eq!(logged_count(&stderr, "Routing failures:"), 0);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("=== Simulation Summary ==="));
    assert!(stdout.contains("Capacity gates:"));
}

/// Test that flow output files are written
#[test]
fn test_flow_outputs_are_written() {
    let dir = std::env::temp_dir();
    let csv = dir.join(format!("patient_flow_cli_{}.csv", std::process::id()));
    let html = dir.join(format!("patient_flow_cli_{}.html", std::process::id()));

    let output = run_cli(&[
        "--days",
        "30",
        "--seed",
        "3",
        "--flow-csv",
        csv.to_str().unwrap(),
        "--graph-html",
        html.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "Simulation failed to run");

    let written = std::fs::read_to_string(&csv).expect("CSV written");
    assert!(written.starts_with("source,target,patients\n"));
    assert!(written.contains("Patient arrives,Patient triaged,"));

    let page = std::fs::read_to_string(&html).expect("HTML written");
    assert!(page.contains("graph TD"));

    std::fs::remove_file(&csv).ok();
    std::fs::remove_file(&html).ok();
}

/// Test that bad arguments are rejected
#[test]
fn test_unknown_clinic_day_is_rejected() {
    let output = run_cli(&["--clinic-days", "Mon,Funday"]);
    assert!(!output.status.success());
}

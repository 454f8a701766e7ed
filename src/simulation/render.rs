//! Mermaid rendering of the process graph and of pathway flows
//!
//! The output is a Mermaid `graph TD` definition; [`mermaid_html`] wraps it in
//! a standalone page that loads Mermaid from a CDN.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use super::flow::PathwayFlow;
use super::graph::{ProcessGraph, Transition};
use super::types::StageId;

fn escape(text: &str) -> String {
    text.replace('"', "#quot;")
}

fn node_label<E>(graph: &ProcessGraph<E>, stage: StageId) -> String {
    let mut lines = vec![escape(graph.stage_name(stage))];
    if let Some(resource) = graph.resource(stage) {
        lines.push(format!("resource: {}", escape(resource.as_str())));
    }
    match graph.routing_kind(stage) {
        kind @ ("weighted" | "bernoulli" | "faulty") => lines.push(format!("branch: {}", kind)),
        _ => {}
    }
    lines.join("<br/>")
}

fn edge_label(transition: &Transition) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(probability) = transition.probability {
        parts.push(format!("probability: {}", probability));
    }
    if let Some(outcome) = transition.bernoulli {
        parts.push(format!("bernoulli: {}", outcome));
    }
    if transition.overflow {
        parts.push("overflow".to_string());
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("<br/>"))
    }
}

/// Mermaid definition of the whole process graph
pub fn graph_mermaid<E>(graph: &ProcessGraph<E>) -> String {
    let mut out = String::from("graph TD\n");
    for stage in graph.stages() {
        let _ = writeln!(out, "    {}[\"{}\"]", stage.index(), node_label(graph, stage));
    }
    for (source, target, transition) in graph.transitions() {
        match edge_label(transition) {
            Some(label) => {
                let _ = writeln!(
                    out,
                    "    {} -->|\"{}\"| {}",
                    source.index(),
                    label,
                    target.index()
                );
            }
            None => {
                let _ = writeln!(out, "    {} --> {}", source.index(), target.index());
            }
        }
    }
    out
}

/// Mermaid definition of observed flows, each link labelled with its count
pub fn flow_mermaid<E>(graph: &ProcessGraph<E>, flow: &PathwayFlow) -> String {
    let mut out = String::from("graph LR\n");
    for stage in flow.stages() {
        let _ = writeln!(
            out,
            "    {}[\"{}\"]",
            stage.index(),
            escape(graph.stage_name(stage))
        );
    }
    for link in flow.links() {
        let _ = writeln!(
            out,
            "    {} -->|{}| {}",
            link.source.index(),
            link.patients,
            link.target.index()
        );
    }
    out
}

/// Standalone HTML page rendering a Mermaid definition
pub fn mermaid_html(definition: &str) -> String {
    format!(
        r#"<html>
<body>
<style>
    .node rect {{
        fill: #edae49 !important;
        stroke: #edae49 !important;
    }}
</style>
<pre class="mermaid">
{definition}
</pre>
<script type="module">
    import mermaid from 'https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.esm.min.mjs';
    mermaid.initialize({{ startOnLoad: true }});
</script>
</body>
</html>
"#
    )
}

/// Write a Mermaid definition to `path` as an HTML page
pub fn write_html(path: &Path, definition: &str) -> Result<()> {
    fs::write(path, mermaid_html(definition))
        .with_context(|| format!("Failed to write {}", path.display()))
}

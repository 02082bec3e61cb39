//! Markdown rendering of a document body.
//!
//! Section order is fixed:
//!
//! 1. `## Summary`: a checklist of task titles, plus a `### Dependencies`
//!    mermaid diagram when any task has dependencies
//! 2. `## Background`: related links (if any) followed by the background text
//! 3. `## Tasks`: one `### <title>` subsection per task
//!
//! Rendering is deterministic and never starts with whitespace.

use std::collections::HashMap;
use std::fmt::Write;

use crate::models::graph;
use crate::models::{Body, Task, TaskStatus};

/// Node id of the synthetic completion sink in the dependency diagram.
const DONE_NODE: &str = "done";

/// Render a body to Markdown.
pub fn generate_markdown(body: &Body) -> String {
    let reduced = graph::transitive_reduction(&body.tasks);
    let mut out = String::new();

    render_summary(&mut out, body, &reduced);
    render_background(&mut out, body);
    render_tasks(&mut out, body, &reduced);

    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    out.push('\n');

    match out.find(|c: char| !c.is_whitespace()) {
        Some(0) | None => out,
        Some(start) => out[start..].to_string(),
    }
}

fn render_summary(out: &mut String, body: &Body, reduced: &HashMap<String, Vec<String>>) {
    out.push_str("## Summary\n\n");
    for task in &body.tasks {
        let mark = if task.status.is_completed() { "x" } else { " " };
        let _ = writeln!(out, "- [{}] {}", mark, task.title);
    }
    out.push('\n');

    if body.tasks.iter().any(|t| !t.depends_on.is_empty()) {
        out.push_str("### Dependencies\n\n");
        render_mermaid(out, &body.tasks, reduced);
        out.push('\n');
    }
}

fn render_mermaid(out: &mut String, tasks: &[Task], reduced: &HashMap<String, Vec<String>>) {
    let node_ids: HashMap<&str, String> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id.as_str(), format!("t{}", i + 1)))
        .collect();

    out.push_str("```mermaid\ngraph TD\n");
    for task in tasks {
        let _ = writeln!(
            out,
            "    {}[\"{}\"]:::{}",
            node_ids[task.id.as_str()],
            escape_mermaid_label(&task.title),
            task.status.as_str()
        );
    }
    let _ = writeln!(out, "    {}((\"Done\")):::{}", DONE_NODE, DONE_NODE);

    for task in tasks {
        let Some(deps) = reduced.get(&task.id) else {
            continue;
        };
        for dep in deps {
            if let Some(from) = node_ids.get(dep.as_str()) {
                let _ = writeln!(out, "    {} --> {}", from, node_ids[task.id.as_str()]);
            }
        }
    }
    for leaf in graph::leaf_nodes(tasks) {
        if let Some(from) = node_ids.get(leaf.as_str()) {
            let _ = writeln!(out, "    {} --> {}", from, DONE_NODE);
        }
    }

    for status in TaskStatus::ALL {
        let _ = writeln!(out, "    classDef {} {}", status.as_str(), status_style(status));
    }
    let _ = writeln!(out, "    classDef {} fill:#424242,stroke:#212121,color:#ffffff", DONE_NODE);
    out.push_str("```\n");
}

fn status_style(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::NotStarted => "fill:#f5f5f5,stroke:#9e9e9e,color:#212121",
        TaskStatus::InProgress => "fill:#fff3cd,stroke:#f0ad4e,color:#212121",
        TaskStatus::InReview => "fill:#d9edf7,stroke:#5bc0de,color:#212121",
        TaskStatus::Completed => "fill:#dff0d8,stroke:#5cb85c,color:#212121",
    }
}

fn escape_mermaid_label(label: &str) -> String {
    label.replace('"', "#quot;")
}

fn render_background(out: &mut String, body: &Body) {
    out.push_str("## Background\n\n");
    if !body.related_links.is_empty() {
        for link in &body.related_links {
            let _ = writeln!(out, "- {}", link);
        }
        out.push('\n');
    }
    out.push_str(&body.background);
    out.push_str("\n\n");
}

fn render_tasks(out: &mut String, body: &Body, reduced: &HashMap<String, Vec<String>>) {
    let titles: HashMap<&str, &str> = body
        .tasks
        .iter()
        .map(|t| (t.id.as_str(), t.title.as_str()))
        .collect();

    out.push_str("## Tasks\n\n");
    for task in &body.tasks {
        let _ = writeln!(out, "### {}\n", task.title);
        let _ = writeln!(out, "- Status: `{}`", task.status);

        let deps: Vec<&str> = reduced
            .get(&task.id)
            .map(|deps| {
                deps.iter()
                    .filter_map(|d| titles.get(d.as_str()).copied())
                    .collect()
            })
            .unwrap_or_default();
        if !deps.is_empty() {
            let _ = writeln!(out, "- Depends on: {}", deps.join(", "));
        }

        if let Some(urls) = &task.github_urls {
            for url in urls {
                let _ = writeln!(out, "- GitHub: {}", url);
            }
        }

        out.push_str("- Summary:\n");
        for line in &task.summary {
            let _ = writeln!(out, "    - {}", line);
        }
        out.push('\n');

        out.push_str("<details><summary>Description</summary>\n\n");
        out.push_str(&task.description);
        out.push_str("\n\n</details>\n\n");
    }
}

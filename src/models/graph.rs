//! Graph algorithms for task dependency analysis.
//!
//! Edges point from a task to each of its prerequisites (`task -> depends_on`).
//! Correctness checks ([`validate_dependencies`]) always run on the full edge
//! set; [`transitive_reduction`] and [`leaf_nodes`] exist for display only.

use std::collections::{HashMap, HashSet};

use super::Task;
use crate::errors::{ErrorKind, ValidationError};

/// Validate every `depends_on` edge and reject cycles.
///
/// Per-edge checks run first, in task order:
/// - empty id: `FieldInvalidFormat`
/// - the owning task's own id: `SelfReference`
/// - an id that is not a task in the document: `NonExistentRef`
///
/// Then the whole graph is checked for cycles of any length
/// (`CircularDependency`).
pub fn validate_dependencies(tasks: &[Task]) -> Result<(), ValidationError> {
    let ids: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();

    for (index, task) in tasks.iter().enumerate() {
        for dep in &task.depends_on {
            if dep.is_empty() {
                return Err(ValidationError::new(ErrorKind::FieldInvalidFormat)
                    .field("body.tasks.depends_on")
                    .index(index)
                    .detail("dependency id is empty"));
            }
            if dep == &task.id {
                return Err(ValidationError::new(ErrorKind::SelfReference)
                    .field("body.tasks.depends_on")
                    .index(index)
                    .detail(format!("\"{}\"", dep)));
            }
            if !ids.contains(dep.as_str()) {
                return Err(ValidationError::new(ErrorKind::NonExistentRef)
                    .field("body.tasks.depends_on")
                    .index(index)
                    .detail(format!("\"{}\"", dep)));
            }
        }
    }

    if has_cycle(tasks) {
        return Err(ValidationError::new(ErrorKind::CircularDependency));
    }

    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Depth-first cycle detection with visiting/done marks.
///
/// Every task is used as a start node so cycles reachable only through one
/// branch, or disconnected from the rest of the graph, are still found.
fn has_cycle(tasks: &[Task]) -> bool {
    let adjacency = adjacency(tasks);
    let mut marks: HashMap<&str, Mark> = HashMap::new();

    fn visit<'a>(
        node: &'a str,
        adjacency: &HashMap<&'a str, Vec<&'a str>>,
        marks: &mut HashMap<&'a str, Mark>,
    ) -> bool {
        match marks.get(node) {
            Some(Mark::Visiting) => return true,
            Some(Mark::Done) => return false,
            None => {}
        }
        marks.insert(node, Mark::Visiting);
        if let Some(deps) = adjacency.get(node) {
            for dep in deps {
                if visit(*dep, adjacency, marks) {
                    return true;
                }
            }
        }
        marks.insert(node, Mark::Done);
        false
    }

    tasks
        .iter()
        .any(|task| visit(task.id.as_str(), &adjacency, &mut marks))
}

fn adjacency(tasks: &[Task]) -> HashMap<&str, Vec<&str>> {
    tasks
        .iter()
        .map(|t| {
            (
                t.id.as_str(),
                t.depends_on.iter().map(String::as_str).collect(),
            )
        })
        .collect()
}

/// Compute the transitively-reduced dependency set for display.
///
/// A direct edge `A -> B` is dropped when `B` is reachable from `A` through
/// another of `A`'s direct dependencies. Reachability is recomputed from
/// scratch for every (dependency, other dependency) pair. Kept prerequisites
/// retain their input order. Every task gets an entry, possibly empty.
pub fn transitive_reduction(tasks: &[Task]) -> HashMap<String, Vec<String>> {
    let adjacency = adjacency(tasks);
    let mut reduced = HashMap::with_capacity(tasks.len());

    for task in tasks {
        let mut kept = Vec::new();
        for dep in &task.depends_on {
            let implied = task
                .depends_on
                .iter()
                .filter(|other| *other != dep)
                .any(|other| is_reachable(&adjacency, other, dep));
            if !implied && !kept.contains(dep) {
                kept.push(dep.clone());
            }
        }
        reduced.insert(task.id.clone(), kept);
    }

    reduced
}

/// Whether `target` can be reached from `start` following dependency edges.
fn is_reachable(adjacency: &HashMap<&str, Vec<&str>>, start: &str, target: &str) -> bool {
    let mut visited = HashSet::new();
    let mut stack = vec![start];

    while let Some(current) = stack.pop() {
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(deps) = adjacency.get(current) {
            for dep in deps {
                if !visited.contains(dep) {
                    stack.push(*dep);
                }
            }
        }
    }

    false
}

/// Tasks that no other task depends on, in input order.
pub fn leaf_nodes(tasks: &[Task]) -> Vec<String> {
    let prerequisites: HashSet<&str> = tasks
        .iter()
        .flat_map(|t| t.depends_on.iter().map(String::as_str))
        .collect();

    tasks
        .iter()
        .filter(|t| !prerequisites.contains(t.id.as_str()))
        .map(|t| t.id.clone())
        .collect()
}

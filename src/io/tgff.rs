//! TGFF task graph reader.
//!
//! Costs come from the `type exec_time` table of the `@PE 5` block: each
//! table row `<type> <cost> ...` maps a type index to a cost (fractional
//! costs are truncated). `TASK <name> TYPE <t>` lines append a task with
//! cost `table[t]`, numbered in order of appearance. `ARC <name> FROM tA_X
//! TO tA_Y TYPE <t>` lines add the edge `X -> Y` with communication cost
//! `table[t]`; the task number is the part of the name after its 3-char
//! prefix.
//!
//! # Reference
//! Dick, Rhodes & Wolf (1998), "TGFF: Task Graphs For Free"

use std::path::Path;

use crate::error::{Error, Result};
use crate::models::TaskGraph;

const COST_BLOCK: &str = "@PE";
const COST_BLOCK_ID: &str = "5";

/// Parses TGFF text into a task graph. `path` is only used in errors.
pub fn parse_tgff(text: &str, path: &Path) -> Result<TaskGraph> {
    let table = cost_table(text, path)?;
    let lookup = |ty: &str, line: usize| -> Result<u64> {
        let idx: usize = ty
            .parse()
            .map_err(|_| Error::parse(path, line, format!("invalid type index '{ty}'")))?;
        table
            .get(idx)
            .copied()
            .ok_or_else(|| Error::parse(path, line, format!("type {idx} has no cost")))
    };

    let mut graph = TaskGraph::new();
    let mut arcs = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        match tokens.first() {
            Some(&"TASK") => {
                let ty = field(&tokens, 3, path, line)?;
                graph.add_task(lookup(ty, line)?);
            }
            Some(&"ARC") => {
                let source = task_number(field(&tokens, 3, path, line)?, path, line)?;
                let target = task_number(field(&tokens, 5, path, line)?, path, line)?;
                let comm = lookup(field(&tokens, 7, path, line)?, line)?;
                arcs.push((line, source, target, comm));
            }
            _ => {}
        }
    }

    for (line, source, target, comm) in arcs {
        graph
            .add_dependency(source, target, comm)
            .map_err(|e| Error::parse(path, line, e.to_string()))?;
    }
    log::debug!(
        "{}: {} tasks, {} dependencies",
        path.display(),
        graph.task_count(),
        graph.dependency_count()
    );
    Ok(graph)
}

/// Collects the `type exec_time` table of the `@PE 5` block.
fn cost_table(text: &str, path: &Path) -> Result<Vec<u64>> {
    let mut table = Vec::new();
    let mut in_block = false;
    let mut in_table = false;
    for (i, raw) in text.lines().enumerate() {
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        match tokens.as_slice() {
            [] => {}
            ["}", ..] => {
                in_block = false;
                in_table = false;
            }
            [COST_BLOCK, COST_BLOCK_ID, ..] => in_block = true,
            [_, "type", "exec_time", ..] => in_table = true,
            [first, cost, ..] if in_block && in_table && !first.starts_with('#') => {
                let value: f64 = cost
                    .parse()
                    .map_err(|_| Error::parse(path, i + 1, format!("invalid cost '{cost}'")))?;
                table.push(value as u64);
            }
            _ => {}
        }
    }
    Ok(table)
}

fn field<'a>(tokens: &[&'a str], idx: usize, path: &Path, line: usize) -> Result<&'a str> {
    tokens
        .get(idx)
        .copied()
        .ok_or_else(|| Error::parse(path, line, format!("expected at least {} fields", idx + 1)))
}

/// `t0_12` -> 12
fn task_number(name: &str, path: &Path, line: usize) -> Result<usize> {
    name.get(3..)
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| Error::parse(path, line, format!("invalid task name '{name}'")))
}

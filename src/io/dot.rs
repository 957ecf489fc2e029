//! Graphviz `.dot` reader and writer.
//!
//! Only the subset produced by [`write_dot`] is understood, one statement
//! per line:
//!
//! ```text
//! strict digraph {
//! 0 [exec=3];
//! 1 [exec=4, ranku=4];
//! 0 -> 1 [comm=2];
//! }
//! ```
//!
//! Ids and values may be quoted. Lines that are neither a node nor an edge
//! statement (headers, braces, default attribute statements) are ignored.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use regex::Regex;

use crate::error::{Error, Result};
use crate::models::TaskGraph;

const EDGE_PATTERN: &str = r#"^\s*"?(\d+)"?\s*->\s*"?(\d+)"?\s*(?:\[(.*)\])?\s*;?\s*$"#;
const NODE_PATTERN: &str = r#"^\s*"?(\d+)"?\s*(?:\[(.*)\])?\s*;?\s*$"#;
const ATTR_PATTERN: &str = r#"(\w+)\s*=\s*"?([^",\]\s]+)"?"#;

struct DotSyntax {
    edge: Regex,
    node: Regex,
    attr: Regex,
}

impl DotSyntax {
    fn new() -> Result<Self> {
        Ok(Self {
            edge: Regex::new(EDGE_PATTERN)?,
            node: Regex::new(NODE_PATTERN)?,
            attr: Regex::new(ATTR_PATTERN)?,
        })
    }

    fn attrs<'t>(&self, list: Option<&'t str>) -> BTreeMap<&'t str, &'t str> {
        let Some(list) = list else {
            return BTreeMap::new();
        };
        self.attr
            .captures_iter(list)
            .filter_map(|c| {
                let key = c.get(1)?.as_str();
                let value = c.get(2)?.as_str();
                Some((key, value))
            })
            .collect()
    }
}

#[derive(Default)]
struct NodeStmt {
    exec: Option<u64>,
    rank: Option<u64>,
    is_virtual: bool,
    line: usize,
}

fn number<T: std::str::FromStr>(value: &str, what: &str, path: &Path, line: usize) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::parse(path, line, format!("invalid {what} '{value}'")))
}

/// Parses `.dot` text into a task graph. `path` is only used in errors.
///
/// # Errors
/// `Parse` when a node lacks `exec`, an edge lacks `comm`, ids are not
/// contiguous from 0, or an edge would close a cycle.
pub fn parse_dot(text: &str, path: &Path) -> Result<TaskGraph> {
    let syntax = DotSyntax::new()?;
    let mut nodes: BTreeMap<usize, NodeStmt> = BTreeMap::new();
    let mut edges = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        if let Some(caps) = syntax.edge.captures(raw) {
            let source: usize = number(&caps[1], "task id", path, line)?;
            let target: usize = number(&caps[2], "task id", path, line)?;
            let attrs = syntax.attrs(caps.get(3).map(|m| m.as_str()));
            let comm = attrs
                .get("comm")
                .ok_or_else(|| Error::parse(path, line, "edge has no comm attribute"))?;
            let comm: u64 = number(comm, "comm", path, line)?;
            edges.push((line, source, target, comm));
            // endpoints named only in edges still need an exec
            for id in [source, target] {
                nodes.entry(id).or_insert_with(|| NodeStmt {
                    line,
                    ..NodeStmt::default()
                });
            }
        } else if let Some(caps) = syntax.node.captures(raw) {
            let id: usize = number(&caps[1], "task id", path, line)?;
            let attrs = syntax.attrs(caps.get(2).map(|m| m.as_str()));
            let stmt = nodes.entry(id).or_default();
            stmt.line = line;
            if let Some(exec) = attrs.get("exec") {
                stmt.exec = Some(number(exec, "exec", path, line)?);
            }
            if let Some(rank) = attrs.get("ranku") {
                stmt.rank = Some(number(rank, "ranku", path, line)?);
            }
            if let Some(flag) = attrs.get("virtual") {
                stmt.is_virtual = flag.eq_ignore_ascii_case("true");
            }
        }
    }

    super::check_contiguous(nodes.keys().copied(), path)?;

    let mut graph = TaskGraph::new();
    for (id, stmt) in &nodes {
        let exec = stmt
            .exec
            .ok_or_else(|| Error::parse(path, stmt.line, format!("task {id} has no exec attribute")))?;
        let added = graph.add_task(exec);
        if let Some(task) = graph.task_mut(added) {
            task.rank = stmt.rank;
            task.is_virtual = stmt.is_virtual;
        }
    }
    for (line, source, target, comm) in edges {
        graph
            .add_dependency(source, target, comm)
            .map_err(|e| Error::parse(path, line, e.to_string()))?;
    }
    Ok(graph)
}

/// Renders a graph as `.dot` text.
pub fn to_dot_string(graph: &TaskGraph) -> String {
    let mut out = String::from("strict digraph {\n");
    for task in graph.tasks() {
        let _ = write!(out, "{} [exec={}", task.id, task.exec);
        if let Some(rank) = task.rank {
            let _ = write!(out, ", ranku={rank}");
        }
        if task.is_virtual {
            out.push_str(", virtual=true");
        }
        out.push_str("];\n");
    }
    for dep in graph.dependencies() {
        let _ = writeln!(out, "{} -> {} [comm={}];", dep.source, dep.target, dep.comm);
    }
    out.push_str("}\n");
    out
}

/// Writes a graph to a `.dot` file.
pub fn write_dot<P: AsRef<Path>>(graph: &TaskGraph, path: P) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    writer.write_all(to_dot_string(graph).as_bytes())?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p() -> &'static Path {
        Path::new("g.dot")
    }

    #[test]
    fn test_parse_pydot_style() {
        let text = "strict digraph  {\n\
                    \"0\" [exec=\"3\"];\n\
                    1 [exec=4];\n\
                    2 [exec=5];\n\
                    0 -> 1  [comm=2];\n\
                    \"0\" -> \"2\" [comm=\"7\"];\n\
                    \"\\n\";\n\
                    }\n";
        let g = parse_dot(text, p()).unwrap();
        assert_eq!(g.task_count(), 3);
        assert_eq!(g.exec(0).unwrap(), 3);
        assert_eq!(g.comm(0, 1), Some(2));
        assert_eq!(g.comm(0, 2), Some(7));
    }

    #[test]
    fn test_missing_attributes() {
        let no_exec = "digraph {\n0 [exec=1];\n0 -> 1 [comm=2];\n}\n";
        assert!(matches!(
            parse_dot(no_exec, p()),
            Err(Error::Parse { line: 3, .. })
        ));

        let no_comm = "digraph {\n0 [exec=1];\n1 [exec=1];\n0 -> 1;\n}\n";
        assert!(matches!(
            parse_dot(no_comm, p()),
            Err(Error::Parse { line: 4, .. })
        ));
    }

    #[test]
    fn test_sparse_ids_rejected() {
        let text = "digraph {\n0 [exec=1];\n2 [exec=1];\n}\n";
        assert!(matches!(parse_dot(text, p()), Err(Error::Parse { line: 0, .. })));
    }

    #[test]
    fn test_cycle_rejected() {
        let text = "digraph {\n0 [exec=1];\n1 [exec=1];\n0 -> 1 [comm=1];\n1 -> 0 [comm=1];\n}\n";
        assert!(matches!(parse_dot(text, p()), Err(Error::Parse { line: 5, .. })));
    }

    #[test]
    fn test_write_and_read_back() {
        let mut g = TaskGraph::from_costs(&[2, 3, 0], &[(0, 1, 4), (1, 2, 0)]).unwrap();
        if let Some(t) = g.task_mut(0) {
            t.rank = Some(9);
        }
        if let Some(t) = g.task_mut(2) {
            t.is_virtual = true;
        }

        let text = to_dot_string(&g);
        assert!(text.contains("0 [exec=2, ranku=9];"));
        assert!(text.contains("2 [exec=0, virtual=true];"));
        assert!(text.contains("0 -> 1 [comm=4];"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.dot");
        write_dot(&g, &path).unwrap();
        let back = crate::io::read_dag(&path).unwrap();
        assert_eq!(back, g);
    }
}

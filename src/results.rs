//! Result file maintenance.
//!
//! Result files start with a header row followed by one row per evaluated
//! graph, the first column being the graph's file name
//! `<prefix>_<index>.<ext>`. Appending from concurrent or out-of-order runs
//! leaves the rows unordered; [`sort_result_file`] restores ascending
//! numeric index order.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};

/// Sorts result rows by the numeric index at the end of their graph name.
///
/// The header row is kept first. When several rows carry the same index
/// the last one wins. Blank lines are dropped.
///
/// # Errors
/// `Parse` for a missing header or a graph name without a numeric
/// `_<index>` suffix.
pub fn sort_result_lines(text: &str, path: &Path) -> Result<String> {
    let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());
    let (_, header) = lines
        .next()
        .ok_or_else(|| Error::parse(path, 1, "result file has no header"))?;

    let mut rows: BTreeMap<u64, &str> = BTreeMap::new();
    for (i, row) in lines {
        let name = row.split(',').next().unwrap_or_default();
        let index = dag_index(name).ok_or_else(|| {
            Error::parse(path, i + 1, format!("'{name}' does not end in _<index>"))
        })?;
        rows.insert(index, row);
    }

    let mut out = String::with_capacity(text.len());
    out.push_str(header);
    out.push('\n');
    for row in rows.values() {
        out.push_str(row);
        out.push('\n');
    }
    Ok(out)
}

/// Rewrites a result file with its rows sorted by graph index.
pub fn sort_result_file<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let sorted = sort_result_lines(&text, path)?;
    std::fs::write(path, sorted)?;
    log::info!("sorted {}", path.display());
    Ok(())
}

/// `random_dag_12.tgff` -> 12
fn dag_index(name: &str) -> Option<u64> {
    let (_, last) = name.rsplit_once('_')?;
    let stem = last.split_once('.').map_or(last, |(stem, _)| stem);
    stem.parse().ok()
}

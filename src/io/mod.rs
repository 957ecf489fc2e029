//! Graph file input and output.
//!
//! [`read_dag`] dispatches on the file extension:
//!
//! | Extension | Reader |
//! |-----------|--------|
//! | `.tgff` | [`tgff::parse_tgff`] |
//! | `.dot` | [`dot::parse_dot`] |
//! | `.yaml`, `.yml`, `.json`, other | `Error::UnsupportedFormat` |
//!
//! Graphs are written back as `.dot` by [`write_dot`].

pub mod dot;
pub mod tgff;

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::TaskGraph;

pub use dot::{to_dot_string, write_dot};

/// Reads a task graph, choosing the parser from the file extension.
///
/// # Errors
/// - `UnsupportedFormat` for an unknown or unimplemented extension
/// - `Parse` for malformed content or non-contiguous task ids
/// - `Io` when the file cannot be read
pub fn read_dag<P: AsRef<Path>>(path: P) -> Result<TaskGraph> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "tgff" => {
            let text = std::fs::read_to_string(path)?;
            tgff::parse_tgff(&text, path)
        }
        "dot" => {
            let text = std::fs::read_to_string(path)?;
            dot::parse_dot(&text, path)
        }
        "yaml" | "yml" | "json" => Err(Error::UnsupportedFormat(format!(
            "reading .{ext} graphs is not implemented"
        ))),
        "" => Err(Error::UnsupportedFormat(format!(
            "{} has no extension",
            path.display()
        ))),
        other => Err(Error::UnsupportedFormat(format!(".{other}"))),
    }
}

/// Multiplies every execution cost by `exec_factor` and every
/// communication cost by `comm_factor` (truncating), then writes the
/// graph to `<dir>/<stem>.dot` next to the input.
///
/// Returns the written path. A `.dot` input is overwritten in place.
pub fn scale_costs_file<P: AsRef<Path>>(
    path: P,
    exec_factor: f64,
    comm_factor: f64,
) -> Result<PathBuf> {
    let path = path.as_ref();
    let mut graph = read_dag(path)?;
    graph.scale_costs(exec_factor, comm_factor);

    let stem = path
        .file_stem()
        .ok_or_else(|| Error::UnsupportedFormat(format!("{} has no file name", path.display())))?;
    let mut dest = path.parent().map(Path::to_path_buf).unwrap_or_default();
    dest.push(stem);
    dest.set_extension("dot");

    write_dot(&graph, &dest)?;
    log::info!(
        "scaled costs of {} (exec x{exec_factor}, comm x{comm_factor}) into {}",
        path.display(),
        dest.display()
    );
    Ok(dest)
}

/// Checks that the parsed ids cover `0..count` exactly.
pub(crate) fn check_contiguous(ids: impl Iterator<Item = usize>, path: &Path) -> Result<usize> {
    let mut count = 0;
    for (expected, id) in ids.enumerate() {
        if id != expected {
            return Err(Error::parse(
                path,
                0,
                format!("task ids must be contiguous from 0, missing {expected}"),
            ));
        }
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_dag_dispatch() {
        let dot = write_temp(".dot", "digraph {\n0 [exec=3];\n1 [exec=4];\n0 -> 1 [comm=2];\n}\n");
        let g = read_dag(dot.path()).unwrap();
        assert_eq!(g.task_count(), 2);
        assert_eq!(g.comm(0, 1), Some(2));

        for suffix in [".json", ".yaml", ".txt"] {
            let f = write_temp(suffix, "{}");
            assert!(matches!(read_dag(f.path()), Err(Error::UnsupportedFormat(_))));
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.tgff");
        assert!(matches!(read_dag(missing), Err(Error::Io(_))));
    }

    #[test]
    fn test_scale_costs_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("dag_3.tgff");
        std::fs::write(
            &src,
            "@PE 5 {\n# type exec_time\n0 10.0\n1 5.0\n}\n\
             @TASK_GRAPH 0 {\nTASK t0_0 TYPE 0\nTASK t0_1 TYPE 0\n\
             ARC a0_0 FROM t0_0 TO t0_1 TYPE 1\n}\n",
        )
        .unwrap();

        let dest = scale_costs_file(&src, 1.5, 0.5).unwrap();
        assert_eq!(dest, dir.path().join("dag_3.dot"));

        let g = read_dag(&dest).unwrap();
        assert_eq!(g.exec(0).unwrap(), 15);
        assert_eq!(g.exec(1).unwrap(), 15);
        // 5 * 0.5 truncated
        assert_eq!(g.comm(0, 1), Some(2));
    }

    #[test]
    fn test_check_contiguous() {
        let p = Path::new("g.dot");
        assert_eq!(check_contiguous([0, 1, 2].into_iter(), p).unwrap(), 3);
        assert!(matches!(
            check_contiguous([0, 2].into_iter(), p),
            Err(Error::Parse { line: 0, .. })
        ));
    }
}

//! Text-log visualization output (`spec.md` §6 "Persisted state": "a text
//! log of (edge-start, edge-end, kind)"). This is the only thing the core
//! ever writes to disk; everything else lives in memory for the run's
//! duration (`spec.md` §1 Non-goals: no persistence).

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use nalgebra::DVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VizKind {
    Trajectory,
    Collision,
}

impl VizKind {
    fn as_str(&self) -> &'static str {
        match self {
            VizKind::Trajectory => "trajectory",
            VizKind::Collision => "collision",
        }
    }
}

fn fmt_point(p: &DVector<f64>) -> String {
    let coords: Vec<String> = p.iter().map(|c| format!("{:.6}", c)).collect();
    coords.join(",")
}

/// Appends one `(edge_start, edge_end, kind)` record per call; flushed
/// immediately so a viewer tailing the file sees the run live.
pub struct VizLog {
    writer: BufWriter<File>,
}

impl VizLog {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(VizLog {
            writer: BufWriter::new(File::create(path)?),
        })
    }

    pub fn log_edge(&mut self, start: &DVector<f64>, end: &DVector<f64>, kind: VizKind) -> io::Result<()> {
        writeln!(self.writer, "{}|{}|{}", fmt_point(start), fmt_point(end), kind.as_str())?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;

    #[test]
    fn logged_edges_round_trip_as_plain_text_lines() {
        let dir = std::env::temp_dir().join(format!("rrtx_viz_test_{:?}", std::thread::current().id()));
        let mut log = VizLog::create(&dir).unwrap();
        let a = DVector::from_vec(vec![0.0, 0.0]);
        let b = DVector::from_vec(vec![1.0, 2.0]);
        log.log_edge(&a, &b, VizKind::Trajectory).unwrap();
        log.log_edge(&a, &b, VizKind::Collision).unwrap();
        drop(log);

        let lines: Vec<String> = io::BufReader::new(File::open(&dir).unwrap()).lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("trajectory"));
        assert!(lines[1].ends_with("collision"));
        std::fs::remove_file(&dir).ok();
    }
}

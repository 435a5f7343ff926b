// src/logging.rs
//
// Lightweight JSONL event sinks for simulation runs.
//
// One JSON object per line, one line per step or episode. Sinks never
// propagate I/O errors into the simulation loop: a sink that fails to
// open or write disables itself silently for the remainder of the run.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::json;

use crate::metrics::EpisodeResult;
use crate::types::Experience;

/// Schema version stamped on every record.
pub const SCHEMA_VERSION: i64 = 1;

/// Destination for step and episode records.
pub trait EventSink: Send {
    fn log_step(&mut self, episode: u64, step: u64, experience: &Experience);
    fn log_episode(&mut self, result: &EpisodeResult);
}

/// Sink that drops everything.
#[derive(Debug, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn log_step(&mut self, _episode: u64, _step: u64, _experience: &Experience) {}
    fn log_episode(&mut self, _result: &EpisodeResult) {}
}

/// JSONL file sink. The file is opened lazily on first write; open or
/// write failures disable the sink.
pub struct FileSink {
    path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            writer: None,
        }
    }

    fn ensure_writer(&mut self) -> Option<&mut BufWriter<File>> {
        if self.writer.is_none() {
            let path = self.path.take()?;

            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }

            let file = match OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)
            {
                Ok(f) => f,
                // Cannot open: stay disabled, path already consumed.
                Err(_) => return None,
            };

            self.writer = Some(BufWriter::new(file));
        }

        self.writer.as_mut()
    }

    fn write_record<T: Serialize>(&mut self, record: &T) {
        let line = match serde_json::to_string(record) {
            Ok(s) => s,
            Err(_) => return,
        };

        if let Some(writer) = self.ensure_writer() {
            let failed = writeln!(writer, "{}", line).is_err() || writer.flush().is_err();
            if failed {
                self.writer = None;
            }
        }
    }
}

impl EventSink for FileSink {
    fn log_step(&mut self, episode: u64, step: u64, experience: &Experience) {
        self.write_record(&json!({
            "schema_version": SCHEMA_VERSION,
            "kind": "step",
            "episode": episode,
            "step": step,
            "action_id": experience.action.id,
            "reward": experience.reward.value,
            "terminal": experience.terminal,
            "timestamp_ms": experience.timestamp_ms,
        }));
    }

    fn log_episode(&mut self, result: &EpisodeResult) {
        self.write_record(&json!({
            "schema_version": SCHEMA_VERSION,
            "kind": "episode",
            "episode": result.episode,
            "steps": result.steps,
            "total_reward": result.total_reward,
            "mean_reward": result.mean_reward,
            "reason": result.reason.as_str(),
            "success": result.success,
            "failed": result.failed,
            "patients_treated": result.patients_treated,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::EpisodeEndReason;
    use std::io::Read;

    fn sample_result() -> EpisodeResult {
        EpisodeResult {
            episode: 7,
            steps: 12,
            total_reward: 34.5,
            mean_reward: 2.875,
            reason: EpisodeEndReason::Terminal,
            success: true,
            failed: false,
            error: None,
            patients_treated: 4,
            wall_time_ms: 10,
        }
    }

    #[test]
    fn test_file_sink_writes_episode_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");

        let mut sink = FileSink::new(&path);
        sink.log_episode(&sample_result());
        sink.log_episode(&sample_result());
        drop(sink);

        let mut contents = String::new();
        std::fs::File::open(&path)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();

        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(record["schema_version"], 1);
        assert_eq!(record["kind"], "episode");
        assert_eq!(record["episode"], 7);
        assert_eq!(record["reason"], "terminal");
    }

    #[test]
    fn test_file_sink_unwritable_path_is_silent() {
        let mut sink = FileSink::new("/nonexistent-root-dir/deep/run.jsonl");
        // Must not panic or error.
        sink.log_episode(&sample_result());
        sink.log_episode(&sample_result());
    }
}

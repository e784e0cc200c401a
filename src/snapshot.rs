use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::world::{World, WorldSnapshot};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to write snapshot {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize snapshot")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct SnapshotFile<'a> {
    written_at: DateTime<Utc>,
    #[serde(flatten)]
    state: &'a WorldSnapshot,
}

/// Writes `<dir>/<scenario>/tick_NNNNNN.json` every `interval` ticks. An
/// interval of zero disables writing.
pub struct SnapshotWriter {
    dir: PathBuf,
    interval: u64,
}

impl SnapshotWriter {
    pub fn new(dir: impl AsRef<Path>, interval: u64) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            interval,
        }
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn maybe_write(
        &self,
        world: &World,
        scenario: &str,
    ) -> Result<Option<PathBuf>, SnapshotError> {
        let tick = world.tick();
        if self.interval == 0 || tick == 0 || tick % self.interval != 0 {
            return Ok(None);
        }
        let state = world.snapshot(scenario);
        self.write(&state).map(Some)
    }

    pub fn write(&self, state: &WorldSnapshot) -> Result<PathBuf, SnapshotError> {
        let dir = self.dir.join(&state.scenario);
        fs::create_dir_all(&dir).map_err(|source| SnapshotError::Io {
            path: dir.clone(),
            source,
        })?;
        let path = dir.join(format!("tick_{:06}.json", state.tick));
        let file = SnapshotFile {
            written_at: Utc::now(),
            state,
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(&path, json).map_err(|source| SnapshotError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::GridMap;
    use crate::world::WorldSettings;

    #[test]
    fn writes_only_on_interval() {
        let temp = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(temp.path(), 3);
        let mut world = World::new(GridMap::new(4, 4, 32.0), WorldSettings::default());

        assert!(writer.maybe_write(&world, "tiny").unwrap().is_none());
        for _ in 0..3 {
            world.advance_time();
        }
        let path = writer.maybe_write(&world, "tiny").unwrap().unwrap();
        assert_eq!(path, temp.path().join("tiny").join("tick_000003.json"));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["tick"], 3);
        assert!(json["written_at"].is_string());
    }

    #[test]
    fn zero_interval_disables_writing() {
        let temp = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(temp.path(), 0);
        let mut world = World::new(GridMap::new(4, 4, 32.0), WorldSettings::default());
        world.advance_time();
        assert!(writer.maybe_write(&world, "tiny").unwrap().is_none());
    }
}

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use chrono::Local;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};
use crate::error::{Result, SpellerError};
/// One persisted extraction: the raw `[channels..., timestamp]` rows of a window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowArtifact {
    pub name: String,
    pub columns: usize,
    pub rows: Vec<Vec<f64>>,
}
#[derive(Serialize)]
struct ArtifactRef<'a> {
    name: &'a str,
    columns: usize,
    rows: &'a [Vec<f64>],
}
/// Result of one durable artifact write.
#[derive(Clone, Debug)]
pub struct WrittenArtifact {
    pub path: PathBuf,
    pub elapsed: Duration,
    /// Persisting took longer than the store's slow-write threshold.
    pub slow: bool,
}
/// Writes window artifacts into a directory and folds them into zip archives.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
    slow_write_warning: Duration,
}
impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, slow_write_warning: Duration) -> Self {
        Self {
            dir: dir.into(),
            slow_write_warning,
        }
    }
    pub fn dir(&self) -> &Path {
        &self.dir
    }
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
    /// Where `consolidate` packs a batch whose first artifact is `name`.
    pub fn archive_path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.zip"))
    }
    /// Picks an artifact name that is neither indexed in `taken` nor present on disk,
    /// either as an artifact or as an archive it would be consolidated into.
    pub fn unique_name(&self, prefix: &str, timestamp_suffix: bool, taken: &[String]) -> String {
        let mut stem = prefix.to_string();
        if timestamp_suffix {
            stem.push_str(&Local::now().format("%y%m%d_%H%M%S%6f").to_string());
        }
        let free = |candidate: &str| {
            !taken.iter().any(|t| t == candidate)
                && !self.path_for(candidate).exists()
                && !self.archive_path_for(candidate).exists()
        };
        if free(&stem) {
            return stem;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{stem}_{n}");
            if free(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
    /// Synchronously writes and fsyncs one artifact. Returns only once the data is durable.
    pub fn write(&self, name: &str, columns: usize, rows: &[Vec<f64>]) -> Result<PathBuf> {
        self.write_timed(name, columns, rows).map(|written| written.path)
    }
    /// Like `write`, also reporting how long persisting took and whether that
    /// crossed the slow-write threshold.
    pub fn write_timed(
        &self,
        name: &str,
        columns: usize,
        rows: &[Vec<f64>],
    ) -> Result<WrittenArtifact> {
        let path = self.path_for(name);
        let persistence = |source: std::io::Error| SpellerError::Persistence {
            path: path.clone(),
            source,
        };
        let started = Instant::now();
        fs::create_dir_all(&self.dir).map_err(persistence)?;
        let file = File::create(&path).map_err(persistence)?;
        let mut writer = BufWriter::new(file);
        let payload = ArtifactRef {
            name,
            columns,
            rows,
        };
        serde_json::to_writer(&mut writer, &payload).map_err(|e| {
            if e.is_io() {
                persistence(e.into())
            } else {
                SpellerError::Encode {
                    name: name.to_string(),
                    source: e,
                }
            }
        })?;
        writer.flush().map_err(persistence)?;
        let file = writer.into_inner().map_err(|e| persistence(e.into_error()))?;
        file.sync_all().map_err(persistence)?;
        let elapsed = started.elapsed();
        let slow = elapsed > self.slow_write_warning;
        if slow {
            warn!(
                "artifact {name} took {:.1} ms to persist ({} rows); stimulus timing is delayed",
                elapsed.as_secs_f64() * 1000.0,
                rows.len()
            );
        } else {
            debug!("persisted {name} ({} rows) in {elapsed:?}", rows.len());
        }
        Ok(WrittenArtifact {
            path,
            elapsed,
            slow,
        })
    }
    /// Folds the named artifacts into `<first>.zip`, one entry per artifact, then
    /// deletes the originals. Every artifact must exist before anything is written,
    /// and an existing archive of that name is never replaced.
    pub fn consolidate(&self, names: &[String], compress: bool) -> Result<Option<PathBuf>> {
        let Some(first) = names.first() else {
            return Ok(None);
        };
        for name in names {
            let path = self.path_for(name);
            if !path.exists() {
                return Err(SpellerError::MissingArtifact {
                    name: name.clone(),
                    path,
                });
            }
        }
        let archive_path = self.archive_path_for(first);
        let archive_file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&archive_path)
            .map_err(|source| SpellerError::Persistence {
                path: archive_path.clone(),
                source,
            })?;
        let method = if compress {
            CompressionMethod::Deflated
        } else {
            CompressionMethod::Stored
        };
        let options = SimpleFileOptions::default().compression_method(method);
        let mut zip = ZipWriter::new(archive_file);
        for name in names {
            zip.start_file(format!("{name}.json"), options)?;
            let mut original = File::open(self.path_for(name))?;
            std::io::copy(&mut original, &mut zip)?;
        }
        let archive_file = zip.finish()?;
        archive_file.sync_all()?;
        for name in names {
            fs::remove_file(self.path_for(name))?;
        }
        info!(
            "consolidated {} artifacts into {}",
            names.len(),
            archive_path.display()
        );
        Ok(Some(archive_path))
    }
}
pub fn read_artifact(path: &Path) -> Result<WindowArtifact> {
    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader).map_err(|source| SpellerError::Encode {
        name: path.display().to_string(),
        source,
    })
}
/// Loads every artifact stored in a consolidated archive, in extraction order.
pub fn read_archive(path: &Path) -> Result<Vec<WindowArtifact>> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut artifacts = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        let artifact = serde_json::from_reader(entry)
            .map_err(|source| SpellerError::Encode { name, source })?;
        artifacts.push(artifact);
    }
    Ok(artifacts)
}
#[cfg(test)]
mod tests {
    use super::*;
    fn store(dir: &Path) -> ArtifactStore {
        ArtifactStore::new(dir, Duration::from_secs(5))
    }
    #[test]
    fn names_are_unique_without_timestamp_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let first = store.unique_name("voltages_t1_s1_", false, &[]);
        assert_eq!(first, "voltages_t1_s1_");
        let second = store.unique_name("voltages_t1_s1_", false, &[first.clone()]);
        assert_eq!(second, "voltages_t1_s1__1");
        store.write(&second, 2, &[vec![1.0, 0.5]]).unwrap();
        let third = store.unique_name("voltages_t1_s1_", false, &[first]);
        assert_eq!(third, "voltages_t1_s1__2");
    }
    #[test]
    fn consolidate_packs_and_removes_originals() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let names = vec!["a".to_string(), "b".to_string()];
        store.write("a", 2, &[vec![1.0, 0.0]]).unwrap();
        store.write("b", 2, &[vec![2.0, 0.1], vec![3.0, 0.2]]).unwrap();
        let archive = store.consolidate(&names, true).unwrap().unwrap();
        assert_eq!(archive, dir.path().join("a.zip"));
        assert!(!store.path_for("a").exists());
        assert!(!store.path_for("b").exists());
        let restored = read_archive(&archive).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored[0].name, "a");
        assert_eq!(restored[1].rows, vec![vec![2.0, 0.1], vec![3.0, 0.2]]);
    }
    #[test]
    fn consolidate_fails_on_missing_artifact_and_keeps_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store.write("present", 1, &[vec![0.0]]).unwrap();
        let names = vec!["present".to_string(), "gone".to_string()];
        let err = store.consolidate(&names, false).unwrap_err();
        assert!(matches!(err, SpellerError::MissingArtifact { ref name, .. } if name == "gone"));
        assert!(store.path_for("present").exists());
    }
    #[test]
    fn consolidated_names_are_not_handed_out_again() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store.write("buffered_", 2, &[vec![1.0, 0.0]]).unwrap();
        let archive = store
            .consolidate(&["buffered_".to_string()], false)
            .unwrap()
            .unwrap();
        assert_eq!(store.unique_name("buffered_", false, &[]), "buffered__1");
        store.write("buffered_", 2, &[vec![9.0, 1.0]]).unwrap();
        let err = store.consolidate(&["buffered_".to_string()], false).unwrap_err();
        assert!(matches!(err, SpellerError::Persistence { .. }));
        assert!(store.path_for("buffered_").exists());
        assert_eq!(read_archive(&archive).unwrap()[0].rows, vec![vec![1.0, 0.0]]);
    }
    #[test]
    fn slow_writes_are_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let strict = ArtifactStore::new(dir.path(), Duration::ZERO);
        let written = strict.write_timed("late", 2, &[vec![0.5, 0.0]]).unwrap();
        assert!(written.slow);
        assert!(written.elapsed > Duration::ZERO);
        let relaxed = store(dir.path());
        let written = relaxed.write_timed("on_time", 2, &[vec![0.5, 0.0]]).unwrap();
        assert!(!written.slow);
        assert_eq!(written.path, relaxed.path_for("on_time"));
    }
    #[test]
    fn nothing_to_consolidate() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store(dir.path()).consolidate(&[], false).unwrap().is_none());
    }
}

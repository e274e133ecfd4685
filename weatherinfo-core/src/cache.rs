//! Storage for the single most recent successful reading.

use std::{
    ffi::OsString,
    fmt::Debug,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt};

use crate::{
    error::StorageError,
    model::{CachedWeatherRecord, WeatherReading},
};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Holds at most one record; every write replaces it.
#[async_trait]
pub trait WeatherCache: Send + Sync + Debug {
    /// Replace the stored record. All-or-nothing.
    async fn write(&self, reading: &WeatherReading, icon: &[u8]) -> Result<(), StorageError>;

    /// The stored record, or `None` when there is none or it cannot be used.
    async fn read(&self) -> Option<CachedWeatherRecord>;
}

/// JSON file cache. Writes go to a temp file in the same directory and are
/// renamed over the record, so readers see the old record or the new one.
#[derive(Debug, Clone)]
pub struct FileWeatherCache {
    path: PathBuf,
}

impl FileWeatherCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Like [`WeatherCache::read`] but reports why a record is unusable.
    pub async fn try_read(&self) -> Result<Option<CachedWeatherRecord>, StorageError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StorageError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    /// Remove the stored record. Removing a missing record is not an error.
    pub async fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.write_error(source)),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("weather_record"));
        name.push(format!(".{}.{}.tmp", std::process::id(), n));
        self.path.with_file_name(name)
    }

    fn write_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Write {
            path: self.path.clone(),
            source,
        }
    }

    async fn write_temp(&self, temp: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = fs::File::create(temp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await
    }
}

#[async_trait]
impl WeatherCache for FileWeatherCache {
    async fn write(&self, reading: &WeatherReading, icon: &[u8]) -> Result<(), StorageError> {
        let record = CachedWeatherRecord {
            reading: reading.clone(),
            icon: icon.to_vec(),
        };
        let bytes =
            serde_json::to_vec(&record).map_err(|e| self.write_error(std::io::Error::other(e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_error(e))?;
        }

        let temp = self.temp_path();
        if let Err(e) = self.write_temp(&temp, &bytes).await {
            let _ = fs::remove_file(&temp).await;
            return Err(self.write_error(e));
        }

        if let Err(e) = fs::rename(&temp, &self.path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(self.write_error(e));
        }

        tracing::debug!(path = %self.path.display(), location = %reading.location_name, "Cached weather record");
        Ok(())
    }

    async fn read(&self) -> Option<CachedWeatherRecord> {
        match self.try_read().await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unusable weather cache");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn reading(name: &str, temperature: f64) -> WeatherReading {
        WeatherReading {
            location_name: name.into(),
            temperature,
            feels_like: temperature + 1.0,
            min_temperature: temperature - 1.0,
            max_temperature: temperature + 2.0,
            description: "haze".into(),
            icon_id: "50d".into(),
            pressure: 1008,
            humidity: 70,
            visibility: 5,
            wind_speed: 8.0,
            observed_at: None,
        }
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempdir().expect("temp dir");
        let cache = FileWeatherCache::new(dir.path().join("record.json"));

        assert!(cache.read().await.is_none());
        assert!(cache.try_read().await.expect("no error").is_none());
    }

    #[tokio::test]
    async fn write_then_read_returns_exact_record() {
        let dir = tempdir().expect("temp dir");
        let cache = FileWeatherCache::new(dir.path().join("record.json"));
        let r = reading("Dhaka", 30.2);

        cache.write(&r, b"icon-bytes").await.expect("write");

        let record = cache.read().await.expect("record present");
        assert_eq!(record.reading, r);
        assert_eq!(record.icon, b"icon-bytes");
    }

    #[tokio::test]
    async fn icon_is_stored_as_base64_text() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("record.json");
        let cache = FileWeatherCache::new(&path);

        cache.write(&reading("Dhaka", 30.2), &[0x89, b'P', b'N', b'G']).await.expect("write");

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).expect("file written")).expect("json");
        assert_eq!(raw["icon"], "iVBORw==");
    }

    #[tokio::test]
    async fn writing_twice_equals_writing_once() {
        let dir = tempdir().expect("temp dir");
        let cache = FileWeatherCache::new(dir.path().join("record.json"));
        let r = reading("Dhaka", 30.2);

        cache.write(&r, b"B").await.expect("first write");
        let once = cache.read().await;
        cache.write(&r, b"B").await.expect("second write");
        let twice = cache.read().await;

        assert!(once.is_some());
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn last_write_wins() {
        let dir = tempdir().expect("temp dir");
        let cache = FileWeatherCache::new(dir.path().join("record.json"));

        cache.write(&reading("Dhaka", 30.2), b"A").await.expect("write");
        cache.write(&reading("Oslo", -3.0), b"B").await.expect("write");

        let record = cache.read().await.expect("record present");
        assert_eq!(record.reading.location_name, "Oslo");
        assert_eq!(record.icon, b"B");
    }

    #[tokio::test]
    async fn creates_missing_parent_directories() {
        let dir = tempdir().expect("temp dir");
        let cache = FileWeatherCache::new(dir.path().join("nested/deeper/record.json"));

        cache.write(&reading("Dhaka", 30.2), b"A").await.expect("write");
        assert!(cache.read().await.is_some());
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_empty() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("record.json");
        std::fs::write(&path, b"{\"reading\": {\"location_name\": ").expect("seed file");
        let cache = FileWeatherCache::new(&path);

        assert!(cache.read().await.is_none());
        assert!(matches!(
            cache.try_read().await,
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn unreadable_path_reads_as_empty() {
        let dir = tempdir().expect("temp dir");
        // A directory where the record file should be.
        let path = dir.path().join("record.json");
        std::fs::create_dir(&path).expect("seed dir");
        let cache = FileWeatherCache::new(&path);

        assert!(cache.read().await.is_none());
        assert!(cache.try_read().await.is_err());
    }

    #[tokio::test]
    async fn write_failure_is_reported_and_keeps_old_record() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("record.json");
        let cache = FileWeatherCache::new(&path);
        cache.write(&reading("Dhaka", 30.2), b"A").await.expect("write");

        // Parent of the target is a regular file, so nothing can be written there.
        let blocked = FileWeatherCache::new(path.join("child.json"));
        let err = blocked.write(&reading("Oslo", 1.0), b"B").await.unwrap_err();
        assert!(matches!(err, StorageError::Write { .. }));

        let record = cache.read().await.expect("old record intact");
        assert_eq!(record.reading.location_name, "Dhaka");
    }

    #[tokio::test]
    async fn no_temp_files_left_behind() {
        let dir = tempdir().expect("temp dir");
        let cache = FileWeatherCache::new(dir.path().join("record.json"));

        cache.write(&reading("Dhaka", 30.2), b"A").await.expect("write");
        cache.write(&reading("Dhaka", 31.0), b"A").await.expect("write");

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .expect("list dir")
            .map(|e| e.expect("entry").file_name())
            .collect();
        assert_eq!(names, vec![OsString::from("record.json")]);
    }

    #[tokio::test]
    async fn clear_removes_record_and_tolerates_missing() {
        let dir = tempdir().expect("temp dir");
        let cache = FileWeatherCache::new(dir.path().join("record.json"));

        cache.clear().await.expect("clear on empty");
        cache.write(&reading("Dhaka", 30.2), b"A").await.expect("write");
        cache.clear().await.expect("clear");
        assert!(cache.read().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn readers_never_observe_partial_records() {
        let dir = tempdir().expect("temp dir");
        let cache = FileWeatherCache::new(dir.path().join("record.json"));
        let first = reading("Dhaka", 30.2);
        let second = reading("Oslo", -3.0);
        let big_icon = vec![7u8; 64 * 1024];

        cache.write(&first, &big_icon).await.expect("seed");

        let writer = tokio::spawn({
            let cache = cache.clone();
            let (first, second, icon) = (first.clone(), second.clone(), big_icon.clone());
            async move {
                for i in 0..50 {
                    let r = if i % 2 == 0 { &second } else { &first };
                    cache.write(r, &icon).await.expect("write");
                }
            }
        });

        for _ in 0..200 {
            let record = cache
                .try_read()
                .await
                .expect("never corrupt")
                .expect("never missing");
            assert!(record.reading == first || record.reading == second);
            assert_eq!(record.icon.len(), big_icon.len());
        }

        writer.await.expect("writer finished");
    }
}

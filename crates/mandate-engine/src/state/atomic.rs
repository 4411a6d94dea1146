use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Locks older than this are assumed abandoned by a dead process.
const STALE_AFTER_SECS: i64 = 60;

/// Write content atomically: temp file in the same directory, fsync, rename.
pub fn atomic_write(path: &str, content: &[u8]) -> Result<()> {
    let dir = Path::new(path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let temp_path = dir.join(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));

    let mut file = std::fs::File::create(&temp_path)
        .with_context(|| format!("cannot create temp file for {path}"))?;
    file.write_all(content)?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&temp_path, path).with_context(|| format!("cannot rename temp to {path}"))?;
    Ok(())
}

/// Cross-process advisory lock on a file: `<path>.lock` holding PID and
/// acquisition time.
pub struct AdvisoryLock {
    lock_path: String,
}

impl AdvisoryLock {
    /// Take the lock or fail at once if a live holder has it.
    pub fn acquire(path: &str) -> Result<Self> {
        let lock_path = format!("{path}.lock");

        if let Ok(content) = std::fs::read_to_string(&lock_path) {
            // A holder that died before writing leaves an unreadable lock;
            // age it by its mtime instead.
            let taken_at = content
                .lines()
                .nth(1)
                .and_then(|ts| ts.parse::<i64>().ok())
                .or_else(|| modified_at(&lock_path));
            match taken_at {
                Some(ts) if chrono::Utc::now().timestamp() - ts > STALE_AFTER_SECS => {
                    tracing::warn!(lock = %lock_path, "removing stale lock");
                    let _ = std::fs::remove_file(&lock_path);
                }
                _ => bail!("{path} is locked by another process (lock: {lock_path})"),
            }
        }

        let content = format!("{}\n{}\n", std::process::id(), chrono::Utc::now().timestamp());
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .with_context(|| format!("cannot acquire lock {lock_path}"))?;
        file.write_all(content.as_bytes())?;

        Ok(Self { lock_path })
    }

    /// Retry `acquire` until it succeeds or `attempts` run out.
    pub fn acquire_with_retry(path: &str, attempts: u32, pause: Duration) -> Result<Self> {
        let mut last = None;
        for _ in 0..attempts.max(1) {
            match Self::acquire(path) {
                Ok(lock) => return Ok(lock),
                Err(e) => {
                    last = Some(e);
                    std::thread::sleep(pause);
                }
            }
        }
        Err(last.unwrap_or_else(|| anyhow::anyhow!("cannot lock {path}")))
    }

    pub fn release(self) -> Result<()> {
        if Path::new(&self.lock_path).exists() {
            std::fs::remove_file(&self.lock_path)
                .with_context(|| format!("cannot release lock {}", self.lock_path))?;
        }
        Ok(())
    }
}

fn modified_at(path: &str) -> Option<i64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(chrono::DateTime::<chrono::Utc>::from(modified).timestamp())
}

impl Drop for AdvisoryLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.lock_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn atomic_write_replaces_content() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        atomic_write(path, b"route v1").unwrap();
        atomic_write(path, b"route v2").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "route v2");
    }

    #[test]
    fn atomic_write_into_bare_filename_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("route.json");
        atomic_write(path.to_str().unwrap(), b"{}").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn lock_blocks_second_holder() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();

        let lock = AdvisoryLock::acquire(path).unwrap();
        assert!(Path::new(&format!("{path}.lock")).exists());
        assert!(AdvisoryLock::acquire(path).is_err());

        lock.release().unwrap();
        assert!(!Path::new(&format!("{path}.lock")).exists());
        let _again = AdvisoryLock::acquire(path).unwrap();
    }

    #[test]
    fn drop_releases() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        {
            let _lock = AdvisoryLock::acquire(&path).unwrap();
        }
        assert!(!Path::new(&format!("{path}.lock")).exists());
    }

    #[test]
    fn stale_lock_is_taken_over() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        let old = chrono::Utc::now().timestamp() - STALE_AFTER_SECS - 5;
        std::fs::write(format!("{path}.lock"), format!("99999\n{old}\n")).unwrap();
        assert!(AdvisoryLock::acquire(path).is_ok());
    }

    #[test]
    fn empty_lock_blocks_until_stale() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        let lock_path = format!("{path}.lock");
        std::fs::write(&lock_path, "").unwrap();
        assert!(AdvisoryLock::acquire(path).is_err());

        let old = std::time::SystemTime::now() - Duration::from_secs(STALE_AFTER_SECS as u64 + 5);
        std::fs::File::options()
            .write(true)
            .open(&lock_path)
            .unwrap()
            .set_modified(old)
            .unwrap();
        let lock = AdvisoryLock::acquire(path).unwrap();
        let content = std::fs::read_to_string(&lock_path).unwrap();
        assert_eq!(content.lines().count(), 2);
        lock.release().unwrap();
    }

    #[test]
    fn retry_waits_for_release() {
        use std::sync::{Arc, Barrier};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl").to_str().unwrap().to_string();
        let held = AdvisoryLock::acquire(&path).unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let b = Arc::clone(&barrier);
        let p = path.clone();
        let waiter = std::thread::spawn(move || {
            b.wait();
            AdvisoryLock::acquire_with_retry(&p, 200, Duration::from_millis(5)).is_ok()
        });
        barrier.wait();
        std::thread::sleep(Duration::from_millis(20));
        held.release().unwrap();
        assert!(waiter.join().unwrap());
    }
}

//! Run logging for the command-line tool
//!
//! Events go to stderr so stdout stays clean for the report or JSON. A
//! `--log-file` collects them across runs instead; that file is trimmed back
//! to its newest whole lines before each run once it grows too large.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use color_eyre::eyre::WrapErr;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const TRIM_MARKER: &[u8] = b"# nestegg: earlier runs trimmed from this log\n";

/// When a run log is trimmed and how much of its tail survives
#[derive(Debug, Clone, Copy)]
struct LogLimits {
    trim_above: u64,
    retain: u64,
}

impl Default for LogLimits {
    fn default() -> Self {
        Self {
            trim_above: 5 * 1024 * 1024,
            retain: 1024 * 1024,
        }
    }
}

/// Cut `path` down to the last `limits.retain` bytes, starting at a line
/// boundary. Returns whether anything was cut.
fn trim_run_log(path: &Path, limits: LogLimits) -> io::Result<bool> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    let len = file.metadata()?.len();
    if len <= limits.trim_above {
        return Ok(false);
    }

    file.seek(SeekFrom::Start(len.saturating_sub(limits.retain)))?;
    let mut tail = Vec::new();
    file.read_to_end(&mut tail)?;
    drop(file);

    let first_whole_line = tail
        .iter()
        .position(|&b| b == b'\n')
        .map_or(0, |i| i + 1);

    let mut file = File::create(path)?;
    file.write_all(TRIM_MARKER)?;
    file.write_all(&tail[first_whole_line..])?;
    Ok(true)
}

/// One open log file shared by every writer the subscriber asks for
#[derive(Clone)]
struct SharedFile(Arc<Mutex<File>>);

impl SharedFile {
    fn open(path: &Path) -> io::Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self(Arc::new(Mutex::new(file))))
    }

    fn with_file<T>(&self, f: impl FnOnce(&mut File) -> io::Result<T>) -> io::Result<T> {
        // A panic mid-write leaves at worst a torn line; keep logging
        let mut guard = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

impl Write for SharedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_file(|file| file.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_file(|file| file.flush())
    }
}

impl<'a> MakeWriter<'a> for SharedFile {
    type Writer = SharedFile;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("nestegg={level},nestegg_core=warn")))
}

/// Install the global subscriber.
///
/// `level` applies to this binary; engine events below `warn` stay hidden
/// unless `RUST_LOG` says otherwise.
pub fn init_logging(log_file: Option<&Path>, level: &str) -> color_eyre::Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(level));

    let Some(path) = log_file else {
        registry
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .init();
        return Ok(());
    };

    let trimmed = trim_run_log(path, LogLimits::default());
    let file = SharedFile::open(path)
        .wrap_err_with(|| format!("failed to open log file {}", path.display()))?;
    registry
        .with(
            fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    match trimmed {
        Ok(true) => tracing::info!(log = %path.display(), "trimmed run log"),
        Ok(false) => {}
        Err(e) => tracing::warn!(log = %path.display(), error = %e, "could not trim run log"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn limits(trim_above: u64, retain: u64) -> LogLimits {
        LogLimits { trim_above, retain }
    }

    #[test]
    fn test_small_log_is_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nestegg.log");
        fs::write(&path, "line one\nline two\n").unwrap();

        assert!(!trim_run_log(&path, limits(1024, 16)).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "line one\nline two\n");
    }

    #[test]
    fn test_trim_keeps_recent_whole_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nestegg.log");
        let content: String = (0..100).map(|i| format!("entry {i:03}\n")).collect();
        fs::write(&path, &content).unwrap();

        assert!(trim_run_log(&path, limits(500, 50)).unwrap());
        let trimmed = fs::read_to_string(&path).unwrap();
        let mut lines = trimmed.lines();
        assert_eq!(
            lines.next(),
            Some("# nestegg: earlier runs trimmed from this log")
        );
        let kept: Vec<&str> = lines.collect();
        assert!(!kept.is_empty());
        assert!(kept.iter().all(|l| l.starts_with("entry ")));
        assert_eq!(kept.last(), Some(&"entry 099"));
    }

    #[test]
    fn test_missing_log_is_fine() {
        let dir = tempdir().unwrap();
        assert!(!trim_run_log(&dir.path().join("absent.log"), limits(10, 5)).unwrap());
    }

    #[test]
    fn test_shared_file_appends_from_every_writer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("runs").join("nestegg.log");
        let shared = SharedFile::open(&path).unwrap();

        let mut first = shared.make_writer();
        let mut second = shared.make_writer();
        first.write_all(b"first\n").unwrap();
        second.write_all(b"second\n").unwrap();
        second.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}

//! Tracing setup for the CLI.
//!
//! Events go to stderr unless a log directory is given, in which case they are
//! appended to `rupture.log` there. The file is trimmed at startup when it has
//! grown past [`RotationPolicy::DEFAULT`]'s limit.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE_NAME: &str = "rupture.log";

const ROTATION_MARKER: &[u8] = b"--- Log rotated (older entries removed) ---\n";

/// When to trim the log file and how much of its tail survives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    pub max_size: u64,
    pub keep_size: u64,
}

impl RotationPolicy {
    /// Trim past 5 MB, keep the newest 1 MB
    pub const DEFAULT: RotationPolicy = RotationPolicy {
        max_size: 5 * 1024 * 1024,
        keep_size: 1024 * 1024,
    };

    /// Trim `path` in place if it is over the limit. Returns whether it was
    /// trimmed. The kept tail starts at a line boundary.
    pub fn apply(&self, path: &Path) -> io::Result<bool> {
        let size = match fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };
        if size <= self.max_size {
            return Ok(false);
        }

        let mut tail = Vec::new();
        {
            let mut file = File::open(path)?;
            file.seek(SeekFrom::Start(size.saturating_sub(self.keep_size)))?;
            file.read_to_end(&mut tail)?;
        }
        let first_line = tail
            .iter()
            .position(|&b| b == b'\n')
            .map_or(0, |i| i + 1);

        let mut file = File::create(path)?;
        file.write_all(ROTATION_MARKER)?;
        file.write_all(&tail[first_line..])?;
        Ok(true)
    }
}

/// Shares one open log file between every writer the subscriber asks for
#[derive(Clone)]
struct SharedFile(Arc<Mutex<File>>);

impl SharedFile {
    fn locked<T>(&self, f: impl FnOnce(&mut File) -> io::Result<T>) -> io::Result<T> {
        let mut file = self
            .0
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        f(&mut file)
    }
}

impl Write for SharedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.locked(|file| file.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.locked(|file| file.flush())
    }
}

impl<'a> MakeWriter<'a> for SharedFile {
    type Writer = SharedFile;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rupture={level},rupture_core=warn")))
}

/// Install the global subscriber at `level`; `RUST_LOG` takes precedence.
///
/// Returns the log file path when `log_dir` is set.
pub fn init_logging(log_dir: Option<&Path>, level: &str) -> color_eyre::Result<Option<PathBuf>> {
    let Some(dir) = log_dir else {
        tracing_subscriber::registry()
            .with(filter(level))
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .init();
        return Ok(None);
    };

    fs::create_dir_all(dir)?;
    let log_path = dir.join(LOG_FILE_NAME);
    let rotated = RotationPolicy::DEFAULT.apply(&log_path).unwrap_or_else(|e| {
        eprintln!("Warning: failed to rotate log file: {e}");
        false
    });

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    tracing_subscriber::registry()
        .with(filter(level))
        .with(
            fmt::layer()
                .with_writer(SharedFile(Arc::new(Mutex::new(file))))
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    tracing::info!(log_path = %log_path.display(), rotated, "logging initialized");
    Ok(Some(log_path))
}

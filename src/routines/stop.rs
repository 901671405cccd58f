use eyre::{Result, WrapErr};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Clonable handle used to ask a running fit to stop
///
/// The solvers only look at the flag between two steps, so a stop never leaves the
/// iterate half-updated.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Cooperative cancellation, either through a [StopHandle] or by creating a stop file
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    handle: StopHandle,
    file: Option<PathBuf>,
}

impl StopSignal {
    pub fn new(file: Option<PathBuf>) -> Self {
        Self {
            handle: StopHandle::default(),
            file,
        }
    }

    pub fn set_file(&mut self, file: Option<PathBuf>) {
        self.file = file;
    }

    pub fn handle(&self) -> StopHandle {
        self.handle.clone()
    }

    /// Forget earlier requests, including a stop file left over from a previous run
    pub fn clear(&self) -> Result<()> {
        self.handle.reset();
        if let Some(file) = &self.file {
            if file.exists() {
                tracing::info!("Removing existing stop file prior to run");
                fs::remove_file(file).wrap_err("Unable to remove previous stop file")?;
            }
        }
        Ok(())
    }

    pub fn requested(&self) -> bool {
        self.handle.is_stopped() || self.file.as_deref().map_or(false, Path::exists)
    }
}

use adsync_core::config::SyncConfig;
use adsync_core::{bias_announcement, BiasConfig, StoreError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Key under which the user bias is persisted.
pub const SYNC_BIAS_KEY: &str = "sync_bias_ms";

/// Persistence for the user's sync bias.
pub trait BiasStore: Send {
    /// `None` when nothing usable is stored.
    fn load(&self) -> Option<f64>;
    fn save(&mut self, sync_bias_ms: i64) -> Result<(), StoreError>;
}

/// Bias kept in a small TOML state file next to other keys it leaves alone.
pub struct FileBiasStore {
    path: PathBuf,
}

impl FileBiasStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> toml::Table {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|s| s.parse::<toml::Table>().ok())
            .unwrap_or_default()
    }
}

impl BiasStore for FileBiasStore {
    fn load(&self) -> Option<f64> {
        match self.read_table().get(SYNC_BIAS_KEY)? {
            toml::Value::Integer(i) => Some(*i as f64),
            toml::Value::Float(f) if f.is_finite() => Some(*f),
            other => {
                tracing::debug!(value = %other, "ignoring non-numeric stored bias");
                None
            }
        }
    }

    fn save(&mut self, sync_bias_ms: i64) -> Result<(), StoreError> {
        let mut table = self.read_table();
        table.insert(SYNC_BIAS_KEY.to_string(), toml::Value::Integer(sync_bias_ms));
        let contents = toml::to_string(&table)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

#[derive(Default)]
struct MemoryState {
    value: Option<f64>,
    writes: usize,
    fail_writes: bool,
}

/// In-process store. Clones share the stored value.
#[derive(Clone, Default)]
pub struct MemoryBiasStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBiasStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: f64) -> Self {
        let store = Self::new();
        store.lock().value = Some(value);
        store
    }

    /// Every subsequent save fails with an I/O error.
    pub fn failing() -> Self {
        let store = Self::new();
        store.lock().fail_writes = true;
        store
    }

    pub fn value(&self) -> Option<f64> {
        self.lock().value
    }

    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl BiasStore for MemoryBiasStore {
    fn load(&self) -> Option<f64> {
        self.lock().value
    }

    fn save(&mut self, sync_bias_ms: i64) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(StoreError::Write(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "store is read-only",
            )));
        }
        state.value = Some(sync_bias_ms as f64);
        state.writes += 1;
        Ok(())
    }
}

/// Result of one bias adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiasAdjustment {
    pub sync_bias_ms: i64,
    /// Position shift to apply to an active playback, in milliseconds.
    pub shift_ms: i64,
    pub announcement: String,
}

/// Owns the user-tunable sync bias and its persistence.
pub struct BiasController {
    store: Box<dyn BiasStore>,
    sync_bias_ms: i64,
    capture_bias_ms: f64,
    step_ms: i64,
}

impl BiasController {
    /// Restore the persisted bias, falling back to `default_sync_bias_ms`.
    pub fn new(store: Box<dyn BiasStore>, config: &SyncConfig) -> Self {
        let sync_bias_ms = store
            .load()
            .map(|v| v.round() as i64)
            .unwrap_or(config.default_sync_bias_ms);
        tracing::debug!(sync_bias_ms, "sync bias restored");
        Self {
            store,
            sync_bias_ms,
            capture_bias_ms: config.capture_bias_ms,
            step_ms: config.bias_step_ms,
        }
    }

    pub fn sync_bias_ms(&self) -> i64 {
        self.sync_bias_ms
    }

    pub fn step_ms(&self) -> i64 {
        self.step_ms
    }

    /// Biases to apply to the next playback attempt.
    pub fn bias_config(&self) -> BiasConfig {
        BiasConfig {
            sync_bias_ms: self.sync_bias_ms as f64,
            capture_bias_ms: self.capture_bias_ms,
        }
    }

    /// Change the bias by `delta_ms` and persist it.
    ///
    /// A zero delta only re-announces. Store failures are logged; the new
    /// value still applies for this run.
    pub fn adjust(&mut self, delta_ms: i64) -> BiasAdjustment {
        if delta_ms != 0 {
            self.sync_bias_ms += delta_ms;
            if let Err(e) = self.store.save(self.sync_bias_ms) {
                tracing::warn!("failed to persist sync bias: {e}");
            }
            tracing::info!(sync_bias_ms = self.sync_bias_ms, delta_ms, "sync bias adjusted");
        }
        BiasAdjustment {
            sync_bias_ms: self.sync_bias_ms,
            shift_ms: delta_ms,
            announcement: bias_announcement(self.sync_bias_ms),
        }
    }
}

use crate::error::ConfigError;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub listen: ListenConfig,

    #[serde(default)]
    pub matcher: MatcherConfig,

    #[serde(default)]
    pub player: PlayerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Tuning for the offset, seek and drift stages.
#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_capture_bias_ms")]
    pub capture_bias_ms: f64,

    #[serde(default = "default_sync_bias_ms")]
    pub default_sync_bias_ms: i64,

    #[serde(default = "default_bias_step_ms")]
    pub bias_step_ms: i64,

    #[serde(default = "default_drift_threshold_sec")]
    pub drift_threshold_sec: f64,

    #[serde(default = "default_correction_gain")]
    pub correction_gain: f64,

    #[serde(default = "default_max_rate_correction")]
    pub max_rate_correction: f64,

    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,

    #[serde(default = "default_playing_timeout_ms")]
    pub playing_timeout_ms: u64,

    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

impl SyncConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn playing_timeout(&self) -> Duration {
        Duration::from_millis(self.playing_timeout_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            capture_bias_ms: default_capture_bias_ms(),
            default_sync_bias_ms: default_sync_bias_ms(),
            bias_step_ms: default_bias_step_ms(),
            drift_threshold_sec: default_drift_threshold_sec(),
            correction_gain: default_correction_gain(),
            max_rate_correction: default_max_rate_correction(),
            sample_interval_ms: default_sample_interval_ms(),
            playing_timeout_ms: default_playing_timeout_ms(),
            state_file: default_state_file(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListenConfig {
    #[serde(default = "default_device_name")]
    pub device_name: String,

    #[serde(default = "default_listen_duration_ms")]
    pub duration_ms: u64,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_channels")]
    pub channels: u16,

    #[serde(default = "default_buffer_size")]
    pub buffer_size: u32,
}

impl ListenConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            duration_ms: default_listen_duration_ms(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            buffer_size: default_buffer_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MatcherConfig {
    #[serde(default = "default_matcher_engine")]
    pub engine: String,

    /// Matches below this confidence do not start playback.
    #[serde(default)]
    pub min_confidence: f64,

    #[serde(default)]
    pub clip_hint: Option<String>,

    #[serde(default = "default_lang")]
    pub lang: String,

    /// Engine-specific settings, handed to the matcher as-is.
    #[serde(flatten)]
    pub extra: toml::Value,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            engine: default_matcher_engine(),
            min_confidence: 0.0,
            clip_hint: None,
            lang: default_lang(),
            extra: toml::Value::Table(Default::default()),
        }
    }
}

/// Behaviour of the simulated playback element.
#[derive(Debug, Deserialize, Clone)]
pub struct PlayerConfig {
    #[serde(default = "default_ready_delay_ms")]
    pub ready_delay_ms: u64,

    #[serde(default = "default_start_latency_ms")]
    pub start_latency_ms: u64,

    /// Fractional speed error of the element's clock, e.g. `0.001` runs 0.1% fast.
    #[serde(default)]
    pub clock_skew: f64,

    #[serde(default = "default_true")]
    pub autoplay_allowed: bool,

    #[serde(default = "default_duration_sec")]
    pub duration_sec: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            ready_delay_ms: default_ready_delay_ms(),
            start_latency_ms: default_start_latency_ms(),
            clock_skew: 0.0,
            autoplay_allowed: default_true(),
            duration_sec: default_duration_sec(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_capture_bias_ms() -> f64 {
    crate::CAPTURE_BIAS_MS
}

fn default_sync_bias_ms() -> i64 {
    crate::DEFAULT_SYNC_BIAS_MS
}

fn default_bias_step_ms() -> i64 {
    25
}

fn default_drift_threshold_sec() -> f64 {
    0.25
}

fn default_correction_gain() -> f64 {
    0.5
}

fn default_max_rate_correction() -> f64 {
    0.02
}

fn default_sample_interval_ms() -> u64 {
    1000
}

fn default_playing_timeout_ms() -> u64 {
    500
}

fn default_state_file() -> PathBuf {
    PathBuf::from("adsync-state.toml")
}

fn default_device_name() -> String {
    "default".to_string()
}

fn default_listen_duration_ms() -> u64 {
    5000
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_channels() -> u16 {
    1
}

fn default_buffer_size() -> u32 {
    1024
}

fn default_matcher_engine() -> String {
    "fixed".to_string()
}

fn default_lang() -> String {
    "E".to_string()
}

fn default_ready_delay_ms() -> u64 {
    150
}

fn default_start_latency_ms() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

fn default_duration_sec() -> f64 {
    3600.0
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}]+)\}").expect("static regex");
    let mut result = input.to_string();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let val = std::env::var(var_name)
            .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
        result = result.replace(&cap[0], &val);
    }

    Ok(result)
}

impl AppConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parse_valid_toml() {
        let toml_str = r#"
[general]
log_level = "debug"

[sync]
capture_bias_ms = 90
default_sync_bias_ms = 50
bias_step_ms = 10
drift_threshold_sec = 0.3
sample_interval_ms = 500
state_file = "/tmp/adsync.toml"

[listen]
device_name = "USB Microphone"
duration_ms = 4000
sample_rate = 48000

[matcher]
engine = "http"
min_confidence = 0.2
clip_hint = "pub-mwbv_202501_1_VIDEO"
lang = "S"
base_url = "http://localhost:8000"

[player]
ready_delay_ms = 10
start_latency_ms = 300
clock_skew = 0.002
autoplay_allowed = false
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.sync.capture_bias_ms, 90.0);
        assert_eq!(config.sync.default_sync_bias_ms, 50);
        assert_eq!(config.sync.bias_step_ms, 10);
        assert_eq!(config.sync.drift_threshold_sec, 0.3);
        assert_eq!(config.sync.sample_interval(), Duration::from_millis(500));
        assert_eq!(config.sync.state_file, PathBuf::from("/tmp/adsync.toml"));
        assert_eq!(config.listen.device_name, "USB Microphone");
        assert_eq!(config.listen.duration(), Duration::from_millis(4000));
        assert_eq!(config.listen.sample_rate, 48000);
        assert_eq!(config.matcher.engine, "http");
        assert_eq!(config.matcher.min_confidence, 0.2);
        assert_eq!(
            config.matcher.clip_hint.as_deref(),
            Some("pub-mwbv_202501_1_VIDEO")
        );
        assert_eq!(config.matcher.lang, "S");
        assert_eq!(config.player.ready_delay_ms, 10);
        assert_eq!(config.player.start_latency_ms, 300);
        assert_eq!(config.player.clock_skew, 0.002);
        assert!(!config.player.autoplay_allowed);
    }

    #[test]
    fn test_config_default_values() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.sync.capture_bias_ms, 80.0);
        assert_eq!(config.sync.default_sync_bias_ms, 75);
        assert_eq!(config.sync.bias_step_ms, 25);
        assert_eq!(config.sync.drift_threshold_sec, 0.25);
        assert_eq!(config.sync.correction_gain, 0.5);
        assert_eq!(config.sync.max_rate_correction, 0.02);
        assert_eq!(config.sync.sample_interval(), Duration::from_secs(1));
        assert_eq!(config.sync.playing_timeout(), Duration::from_millis(500));
        assert_eq!(config.listen.device_name, "default");
        assert_eq!(config.listen.sample_rate, 16000);
        assert_eq!(config.listen.channels, 1);
        assert_eq!(config.matcher.engine, "fixed");
        assert_eq!(config.matcher.min_confidence, 0.0);
        assert!(config.matcher.clip_hint.is_none());
        assert_eq!(config.matcher.lang, "E");
        assert!(config.player.autoplay_allowed);
        assert_eq!(config.player.clock_skew, 0.0);
    }

    #[test]
    fn test_config_env_var_interpolation() {
        std::env::set_var("ADSYNC_TEST_MATCHER_URL", "http://matcher.local");
        let toml_str = r#"
[matcher]
engine = "http"
base_url = "${ADSYNC_TEST_MATCHER_URL}"
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(
            config.matcher.extra.get("base_url").and_then(|v| v.as_str()),
            Some("http://matcher.local")
        );
        std::env::remove_var("ADSYNC_TEST_MATCHER_URL");
    }

    #[test]
    fn test_config_missing_env_var_error() {
        let toml_str = r#"
[general]
log_level = "${DEFINITELY_DOES_NOT_EXIST_12345}"
"#;
        let err = AppConfig::from_toml_str(toml_str).unwrap_err();
        assert!(err.to_string().contains("DEFINITELY_DOES_NOT_EXIST_12345"));
    }

    #[test]
    fn test_config_invalid_toml_error() {
        let result = AppConfig::from_toml_str("this is not valid toml [[[");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_config_matcher_extra_fields() {
        let toml_str = r#"
[matcher]
engine = "fixed"
clip_id = "custom:demo"
offset_ms = 15000
confidence = 0.8
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        let extra = &config.matcher.extra;
        assert_eq!(extra.get("clip_id").and_then(|v| v.as_str()), Some("custom:demo"));
        assert_eq!(extra.get("offset_ms").and_then(|v| v.as_integer()), Some(15000));
        assert_eq!(extra.get("confidence").and_then(|v| v.as_float()), Some(0.8));
    }

    #[test]
    fn test_config_load_from_file() {
        let dir = std::env::temp_dir().join("adsync_test_config");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.toml");
        std::fs::write(
            &path,
            r#"
[general]
log_level = "warn"

[sync]
bias_step_ms = 50
"#,
        )
        .unwrap();

        let config = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.sync.bias_step_ms, 50);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_config_load_from_file_not_found() {
        let result = AppConfig::load_from_file(Path::new("/nonexistent/path.toml"));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("failed to read config file"));
    }
}

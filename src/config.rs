use serde::{Deserialize, Serialize};
use clap::{ArgAction, Parser, ValueEnum, ValueHint};
use dirs_next::home_dir;
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration. Every field is optional so files and the
/// command line can be layered; consumers apply their own defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    #[serde(rename = "loop")]
    pub timing: Option<LoopConfig>,
    pub audio: Option<AudioConfig>,
    pub classifier: Option<ClassifierConfig>,
    pub recognizer: Option<RecognizerConfig>,
    /// absent means no weather, the idle view shows the placeholder
    pub weather: Option<WeatherConfig>,
    pub display: Option<DisplayConfig>,
    pub push: Option<PushConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoopConfig {
    pub sample_secs: Option<u64>,
    pub min_delay_secs: Option<u64>,
    pub delay_override_secs: Option<u64>,
    pub retry_secs: Option<u64>,
    pub idle_grace_secs: Option<u64>,
    pub weather_stale_mins: Option<u64>,
    pub refresh_threshold: Option<u32>,
    pub identify_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AudioConfig {
    pub device_name: Option<String>,   // substring match, e.g. "USB"
    pub target_rate_hz: Option<u32>,
    pub gain: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClassifierConfig {
    pub floor_dbfs: Option<f32>,
    pub max_flatness: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecognizerConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub musicbrainz: Option<bool>,
    pub musicbrainz_url: Option<String>,
    /// cap on the MusicBrainz length lookup
    pub lookup_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub units: Option<TempUnits>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TempUnits {
    Metric,
    #[default]
    Imperial,
}

impl TempUnits {
    pub fn as_query(&self) -> &'static str {
        match self {
            TempUnits::Metric => "metric",
            TempUnits::Imperial => "imperial",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TempUnits::Metric => "°C",
            TempUnits::Imperial => "°F",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub rotate_deg: Option<u16>,
    pub invert: Option<bool>,
    pub brightness: Option<u8>,     // 0-255
    pub driver: Option<PanelKind>,  // <- strongly-typed panel selection
    pub bus: Option<BusConfig>,     // <- hardware panels only
    pub snapshot_path: Option<PathBuf>,
    pub clean_passes: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PushConfig {
    pub enabled: Option<bool>,
    pub bind: Option<String>,
    pub port: Option<u16>,
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "earshot", about = "Shows what is playing in the room, or the weather when nothing is")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// seconds of audio per tick
    #[arg(long)]
    pub sample_secs: Option<u64>,
    #[arg(long)]
    pub min_delay_secs: Option<u64>,
    /// fixed re-identification delay, replaces the computed one
    #[arg(long)]
    pub delay_override_secs: Option<u64>,
    /// renders between full panel cleans
    #[arg(long)]
    pub refresh_threshold: Option<u32>,
    #[arg(long)]
    pub device_name: Option<String>,
    #[arg(long, value_enum)]
    pub display_driver: Option<PanelKind>,
    #[arg(long)]
    pub display_width: Option<u32>,
    #[arg(long)]
    pub display_height: Option<u32>,
    #[arg(long)]
    pub display_rotate_deg: Option<u16>,
    #[arg(long, action = ArgAction::Set)]
    pub display_invert: Option<bool>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub snapshot_path: Option<PathBuf>,
    #[arg(long, action = ArgAction::Set)]
    pub push: Option<bool>,
    #[arg(long)]
    pub push_port: Option<u16>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();
    let cfg = load_with(&cli, find_config_file())?;

    if cli.dump_config {
        // Pretty YAML of effective config (nice for debugging)
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

/// Layer defaults, the YAML file (explicit path first, else `found`) and
/// the CLI, then validate.
pub fn load_with(cli: &Cli, found: Option<PathBuf>) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = found {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;
    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/earshot/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/earshot/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/earshot.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["earshot.yaml", "config.yaml", "config/earshot.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(s: &str) -> Result<Config, ConfigError> {
    let cfg: Config = serde_yaml::from_str(s)?;
    Ok(cfg)
}

/// Copy every `Some` field of `$src` over `$dst`.
macro_rules! take_some {
    ($dst:ident, $src:ident, $($field:ident),+ $(,)?) => {
        $( if $src.$field.is_some() { $dst.$field = $src.$field; } )+
    };
}

/// Install `src` when `dst` is empty, else merge field by field.
fn merge_group<T>(dst: &mut Option<T>, src: Option<T>, merge_fields: impl FnOnce(&mut T, T)) {
    if let Some(s) = src {
        match dst {
            Some(d) => merge_fields(d, s),
            None => *dst = Some(s),
        }
    }
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    // top-level
    if src.log_level.is_some()      { dst.log_level = src.log_level; }

    merge_group(&mut dst.timing, src.timing, |d, s| {
        take_some!(d, s, sample_secs, min_delay_secs, delay_override_secs, retry_secs,
            idle_grace_secs, weather_stale_mins, refresh_threshold, identify_timeout_secs);
    });
    merge_group(&mut dst.audio, src.audio, |d, s| {
        take_some!(d, s, device_name, target_rate_hz, gain);
    });
    merge_group(&mut dst.classifier, src.classifier, |d, s| {
        take_some!(d, s, floor_dbfs, max_flatness);
    });
    merge_group(&mut dst.recognizer, src.recognizer, |d, s| {
        take_some!(d, s, endpoint, api_key, musicbrainz, musicbrainz_url, lookup_timeout_secs);
    });
    merge_group(&mut dst.weather, src.weather, |d, s| {
        take_some!(d, s, api_key, lat, lng, units, base_url);
    });
    merge_group(&mut dst.display, src.display, |d, s| {
        take_some!(d, s, width, height, rotate_deg, invert, brightness, driver, bus,
            snapshot_path, clean_passes);
    });
    merge_group(&mut dst.push, src.push, |d, s| {
        take_some!(d, s, enabled, bind, port);
    });
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()       { cfg.log_level = cli.log_level.clone(); }

    let any_loop = cli.sample_secs.is_some()
        || cli.min_delay_secs.is_some()
        || cli.delay_override_secs.is_some()
        || cli.refresh_threshold.is_some();
    if any_loop {
        let timing = cfg.timing.get_or_insert_with(LoopConfig::default);
        if cli.sample_secs.is_some()          { timing.sample_secs = cli.sample_secs; }
        if cli.min_delay_secs.is_some()       { timing.min_delay_secs = cli.min_delay_secs; }
        if cli.delay_override_secs.is_some()  { timing.delay_override_secs = cli.delay_override_secs; }
        if cli.refresh_threshold.is_some()    { timing.refresh_threshold = cli.refresh_threshold; }
    }

    if cli.device_name.is_some() {
        cfg.audio.get_or_insert_with(AudioConfig::default).device_name = cli.device_name.clone();
    }

    let any_display = cli.display_driver.is_some()
        || cli.display_width.is_some()
        || cli.display_height.is_some()
        || cli.display_rotate_deg.is_some()
        || cli.display_invert.is_some()
        || cli.snapshot_path.is_some();
    if any_display {
        let display = cfg.display.get_or_insert_with(DisplayConfig::default);
        if cli.display_driver.is_some()      { display.driver = cli.display_driver; }
        if cli.display_width.is_some()       { display.width = cli.display_width; }
        if cli.display_height.is_some()      { display.height = cli.display_height; }
        if cli.display_rotate_deg.is_some()  { display.rotate_deg = cli.display_rotate_deg; }
        if cli.display_invert.is_some()      { display.invert = cli.display_invert; }
        if cli.snapshot_path.is_some()       { display.snapshot_path = cli.snapshot_path.clone(); }
    }

    if cli.push.is_some() || cli.push_port.is_some() {
        let push = cfg.push.get_or_insert_with(PushConfig::default);
        if cli.push.is_some()       { push.enabled = cli.push; }
        if cli.push_port.is_some()  { push.port = cli.push_port; }
    }
}

fn invalid(msg: impl Into<String>) -> Result<(), ConfigError> {
    Err(ConfigError::Validation(msg.into()))
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(timing) = cfg.timing.as_ref() {
        if timing.sample_secs == Some(0) {
            return invalid("loop sample_secs must be > 0");
        }
        if timing.min_delay_secs == Some(0) {
            return invalid("loop min_delay_secs must be > 0");
        }
        if timing.weather_stale_mins == Some(0) {
            return invalid("loop weather_stale_mins must be > 0");
        }
        if timing.identify_timeout_secs == Some(0) {
            return invalid("loop identify_timeout_secs must be > 0");
        }
    }
    if let Some(recognizer) = cfg.recognizer.as_ref() {
        if recognizer.lookup_timeout_secs == Some(0) {
            return invalid("recognizer lookup_timeout_secs must be > 0");
        }
    }
    if let Some(audio) = cfg.audio.as_ref() {
        if audio.target_rate_hz == Some(0) {
            return invalid("audio target_rate_hz must be > 0");
        }
        if let Some(g) = audio.gain {
            if !(g.is_finite() && g > 0.0) {
                return invalid("audio gain must be a positive number");
            }
        }
    }
    if let Some(weather) = cfg.weather.as_ref() {
        if weather.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            return invalid("weather api_key is required when weather is configured");
        }
        match weather.lat {
            Some(lat) if (-90.0..=90.0).contains(&lat) => {}
            _ => return invalid("weather lat must be within -90..=90"),
        }
        match weather.lng {
            Some(lng) if (-180.0..=180.0).contains(&lng) => {}
            _ => return invalid("weather lng must be within -180..=180"),
        }
    }
    if let Some(display) = cfg.display.as_ref() {
        if let (Some(w), Some(h)) = (display.width, display.height) {
            if w == 0 || h == 0 {
                return invalid("display width/height must be > 0");
            }
        }
        if let Some(rot) = display.rotate_deg {
            match rot {
                0 | 90 | 180 | 270 => {},
                _ => return invalid("display rotate_deg must be 0|90|180|270"),
            }
        }
        if display.clean_passes == Some(0) {
            return invalid("display clean_passes must be >= 1");
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BusConfig {
    I2c {
        bus: String,        // e.g. "/dev/i2c-1"
        address: u8,        // e.g. 0x3C (I2C addresses are 7-bit, stored in u8)
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum PanelKind {
    /// headless, logs what would be drawn
    #[default]
    Log,
    /// writes each frame to a PBM file
    Snapshot,
    Ssd1306,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
log_level: debug
loop:
  sample_secs: 10
  delay_override_secs: 90
weather:
  api_key: abc123
  lat: 51.5
  lng: -0.12
  units: metric
display:
  driver: snapshot
  width: 128
  height: 64
  snapshot_path: /tmp/earshot.pbm
push:
  enabled: true
  port: 8000
"#;

    #[test]
    fn parses_all_groups() {
        let cfg = parse_yaml(SAMPLE).expect("yaml");
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
        assert_eq!(cfg.timing.as_ref().and_then(|t| t.delay_override_secs), Some(90));
        assert_eq!(cfg.weather.as_ref().and_then(|w| w.units), Some(TempUnits::Metric));
        assert_eq!(cfg.display.as_ref().and_then(|d| d.driver), Some(PanelKind::Snapshot));
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn merge_keeps_unset_fields() {
        let mut base = parse_yaml(SAMPLE).expect("yaml");
        let over = parse_yaml("loop:\n  min_delay_secs: 200\ndisplay:\n  invert: true\n").expect("yaml");
        merge(&mut base, over);
        let timing = base.timing.expect("loop group");
        assert_eq!(timing.min_delay_secs, Some(200));
        assert_eq!(timing.delay_override_secs, Some(90));
        let display = base.display.expect("display group");
        assert_eq!(display.invert, Some(true));
        assert_eq!(display.width, Some(128));
    }

    #[test]
    fn cli_overrides_win() {
        let mut cfg = parse_yaml(SAMPLE).expect("yaml");
        let cli = Cli {
            sample_secs: Some(5),
            display_driver: Some(PanelKind::Log),
            push: Some(false),
            ..Default::default()
        };
        apply_cli_overrides(&mut cfg, &cli);
        assert_eq!(cfg.timing.and_then(|t| t.sample_secs), Some(5));
        assert_eq!(cfg.display.and_then(|d| d.driver), Some(PanelKind::Log));
        assert_eq!(cfg.push.and_then(|p| p.enabled), Some(false));
    }

    #[test]
    fn rejects_bad_values() {
        let cases = [
            "loop:\n  sample_secs: 0\n",
            "loop:\n  min_delay_secs: 0\n",
            "display:\n  rotate_deg: 45\n",
            "weather:\n  lat: 10\n  lng: 10\n",
            "weather:\n  api_key: k\n  lat: 95\n  lng: 10\n",
            "weather:\n  api_key: k\n  lat: 10\n  lng: 200\n",
        ];
        for case in cases {
            let cfg = parse_yaml(case).expect("yaml");
            assert!(validate(&cfg).is_err(), "accepted: {case}");
        }
    }

    #[test]
    fn rejects_unknown_units() {
        assert!(parse_yaml("weather:\n  units: kelvin\n").is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/earshot.yaml")),
            ..Default::default()
        };
        assert!(matches!(load_with(&cli, None), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn empty_config_is_valid() {
        let cfg = load_with(&Cli::default(), None).expect("defaults");
        assert!(cfg.weather.is_none());
    }
}

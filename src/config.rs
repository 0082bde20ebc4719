use serde::Deserialize;
use std::{fs, path::Path, time::Duration};

use crate::error::ConfigError;
use crate::timer::Phase;

pub const DEFAULT_CONFIG_PATH: &str = "pomodoro.json";
/// One week.
pub const MAX_PHASE_MINUTES: f64 = 7.0 * 24.0 * 60.0;
/// One day.
pub const MAX_UPDATE_INTERVAL_SECS: f64 = 24.0 * 60.0 * 60.0;
const FALLBACK_TICK: Duration = Duration::from_secs(1);

/// Timer settings, loaded once at startup and never mutated afterwards.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Config {
    #[serde(rename = "work_time")]
    pub work_minutes: f64,
    #[serde(rename = "short_break")]
    pub short_break_minutes: f64,
    #[serde(rename = "long_break")]
    pub long_break_minutes: f64,
    /// Work phases before a long break.
    pub reps: u32,
    /// Seconds between ticks.
    pub update_interval: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_minutes: 25.0,
            short_break_minutes: 5.0,
            long_break_minutes: 15.0,
            reps: 4,
            update_interval: 1.0,
        }
    }
}

/// Values given on the command line that take precedence over the file.
#[derive(Clone, Copy, Debug, Default)]
pub struct Overrides {
    pub work_minutes: Option<f64>,
    pub short_break_minutes: Option<f64>,
    pub long_break_minutes: Option<f64>,
    pub reps: Option<u32>,
    pub update_interval: Option<f64>,
}

impl Config {
    pub fn minutes_for(&self, phase: Phase) -> f64 {
        match phase {
            Phase::Work => self.work_minutes,
            Phase::ShortBreak => self.short_break_minutes,
            Phase::LongBreak => self.long_break_minutes,
            Phase::Paused => 0.0,
        }
    }

    /// Falls back to one second for values `validate` would have rejected.
    pub fn tick_interval(&self) -> Duration {
        match Duration::try_from_secs_f64(self.update_interval) {
            Ok(tick) if !tick.is_zero() => tick,
            _ => {
                log::warn!("Unusable update interval {}; ticking every second", self.update_interval);
                FALLBACK_TICK
            }
        }
    }

    pub fn apply(mut self, overrides: &Overrides) -> Self {
        if let Some(w) = overrides.work_minutes { self.work_minutes = w; }
        if let Some(s) = overrides.short_break_minutes { self.short_break_minutes = s; }
        if let Some(l) = overrides.long_break_minutes { self.long_break_minutes = l; }
        if let Some(r) = overrides.reps { self.reps = r; }
        if let Some(i) = overrides.update_interval { self.update_interval = i; }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value, max, unit) in [
            ("work_time", self.work_minutes, MAX_PHASE_MINUTES, "minutes"),
            ("short_break", self.short_break_minutes, MAX_PHASE_MINUTES, "minutes"),
            ("long_break", self.long_break_minutes, MAX_PHASE_MINUTES, "minutes"),
            ("update_interval", self.update_interval, MAX_UPDATE_INTERVAL_SECS, "seconds"),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be a positive number, got {}", value),
                });
            }
            if value > max {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be at most {} {}, got {}", max, unit, value),
                });
            }
        }
        if self.reps == 0 {
            return Err(ConfigError::Invalid {
                field: "reps",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

pub fn parse_config(path: &Path, text: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(path, &text)
}

/// Parses `25`, `25m`, `1h30m`, `90s` or `0.5` into minutes.
pub fn parse_minutes(s: &str) -> Result<f64, String> {
    let s = s.trim().to_lowercase();
    if let Ok(bare) = s.parse::<f64>() {
        return if bare > 0.0 { Ok(bare) } else { Err("Duration must be > 0".into()) };
    }

    let mut total = 0.0;
    let mut num = String::new();

    for c in s.chars() {
        match c {
            '0'..='9' | '.' => num.push(c),
            'h' => { total += num.parse::<f64>().map_err(|_| "Invalid hours")? * 60.0; num.clear(); }
            'm' => { total += num.parse::<f64>().map_err(|_| "Invalid minutes")?; num.clear(); }
            's' => { total += num.parse::<f64>().map_err(|_| "Invalid seconds")? / 60.0; num.clear(); }
            _ => return Err("Invalid format".into()),
        }
    }
    if !num.is_empty() {
        return Err("Missing unit after number".into());
    }

    if total > 0.0 { Ok(total) } else { Err("Duration must be > 0".into()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "work_time": 25,
        "short_break": 5,
        "long_break": 15.5,
        "reps": 4,
        "update_interval": 1
    }"#;

    #[test]
    fn parses_ints_and_floats() {
        let config = parse_config(Path::new("p.json"), SAMPLE).unwrap();
        assert_eq!(config.work_minutes, 25.0);
        assert_eq!(config.short_break_minutes, 5.0);
        assert_eq!(config.long_break_minutes, 15.5);
        assert_eq!(config.reps, 4);
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn missing_field_is_a_parse_error() {
        let text = r#"{"work_time": 25, "short_break": 5, "reps": 4, "update_interval": 1}"#;
        let err = parse_config(Path::new("p.json"), text).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("long_break"));
    }

    #[test]
    fn non_positive_durations_are_rejected() {
        let text = SAMPLE.replace("\"short_break\": 5", "\"short_break\": 0");
        match parse_config(Path::new("p.json"), &text) {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "short_break"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn oversized_values_are_rejected() {
        for (from, to, expected) in [
            ("\"work_time\": 25", "\"work_time\": 1e12", "work_time"),
            ("\"long_break\": 15.5", "\"long_break\": 10081", "long_break"),
            ("\"update_interval\": 1", "\"update_interval\": 1e20", "update_interval"),
        ] {
            let text = SAMPLE.replace(from, to);
            match parse_config(Path::new("p.json"), &text) {
                Err(ConfigError::Invalid { field, reason }) => {
                    assert_eq!(field, expected);
                    assert!(reason.contains("at most"), "{reason}");
                }
                other => panic!("unexpected for {to}: {other:?}"),
            }
        }

        let week = SAMPLE.replace("\"work_time\": 25", "\"work_time\": 10080");
        assert_eq!(parse_config(Path::new("p.json"), &week).unwrap().work_minutes, MAX_PHASE_MINUTES);
    }

    #[test]
    fn tick_interval_never_panics() {
        let huge = Config { update_interval: 1e20, ..Config::default() };
        assert_eq!(huge.tick_interval(), Duration::from_secs(1));
        let nan = Config { update_interval: f64::NAN, ..Config::default() };
        assert_eq!(nan.tick_interval(), Duration::from_secs(1));
        let half = Config { update_interval: 0.5, ..Config::default() };
        assert_eq!(half.tick_interval(), Duration::from_millis(500));
    }

    #[test]
    fn zero_reps_rejected() {
        let text = SAMPLE.replace("\"reps\": 4", "\"reps\": 0");
        match parse_config(Path::new("p.json"), &text) {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "reps"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.long_break_minutes, 15.5);
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn overrides_take_precedence() {
        let config = Config::default().apply(&Overrides {
            work_minutes: Some(50.0),
            reps: Some(2),
            ..Default::default()
        });
        assert_eq!(config.work_minutes, 50.0);
        assert_eq!(config.reps, 2);
        assert_eq!(config.short_break_minutes, 5.0);
        assert_eq!(config.minutes_for(Phase::Work), 50.0);
        assert_eq!(config.minutes_for(Phase::LongBreak), 15.0);
    }

    #[test]
    fn minute_parser() {
        assert_eq!(parse_minutes("25").unwrap(), 25.0);
        assert_eq!(parse_minutes("25m").unwrap(), 25.0);
        assert_eq!(parse_minutes("1h30m").unwrap(), 90.0);
        assert_eq!(parse_minutes("90s").unwrap(), 1.5);
        assert_eq!(parse_minutes("0.5").unwrap(), 0.5);
        assert!(parse_minutes("0").is_err());
        assert!(parse_minutes("ten").is_err());
        assert!(parse_minutes("1h30").is_err());
    }
}

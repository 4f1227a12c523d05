use crate::domain::models::TimelineConfig;
use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const TIMELINE_JSON: &str = "timeline.json";

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigBundle {
    pub app: serde_json::Value,
    pub timeline: serde_json::Value,
}

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    HashMap::from([
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "appName": "Session Planner",
                "timezone": "UTC"
            }),
        ),
        (
            TIMELINE_JSON,
            serde_json::json!({
                "schema": 1,
                "windowStart": "08:00",
                "windowEnd": "20:00",
                "pixelsPerMinute": 2.0,
                "quantizationStepMinutes": 5,
                "minBlockDurationMinutes": 15,
                "creationThresholdPixels": 10.0,
                "createExtent": "track_pointer",
                "newBlockTitle": "New group",
                "newBlockColor": "gray",
                "defaultPasteTime": "10:00",
                "importPalette": ["amber", "violet", "pink", "blue"]
            }),
        ),
    ])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_configs(config_dir: &Path) -> Result<ConfigBundle, InfraError> {
    Ok(ConfigBundle {
        app: read_config(&config_dir.join(APP_JSON))?,
        timeline: read_config(&config_dir.join(TIMELINE_JSON))?,
    })
}

pub fn load_timeline_config(config_dir: &Path) -> Result<TimelineConfig, InfraError> {
    let path = config_dir.join(TIMELINE_JSON);
    let raw = read_config(&path)?;
    let config: TimelineConfig = serde_json::from_value(raw).map_err(|error| {
        InfraError::InvalidConfig(format!("invalid timeline config in {}: {error}", path.display()))
    })?;
    config.validate().map_err(|message| {
        InfraError::InvalidConfig(format!("{message} in {}", path.display()))
    })?;
    Ok(config)
}

/// The team's wall-clock zone; UTC when the file leaves it blank.
pub fn read_timezone(config_dir: &Path) -> Result<Tz, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    let Some(name) = app
        .get("timezone")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
    else {
        return Ok(Tz::UTC);
    };
    name.parse::<Tz>()
        .map_err(|error| InfraError::InvalidConfig(format!("invalid timezone '{name}': {error}")))
}

pub fn read_app_name(config_dir: &Path) -> Result<String, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    let name = app
        .get("appName")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("Session Planner");
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ClockTime, CreateExtent};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    static NEXT_TEMP_DIR: AtomicU64 = AtomicU64::new(1);

    struct TempConfigDir {
        path: PathBuf,
    }

    impl TempConfigDir {
        fn new() -> Self {
            let sequence = NEXT_TEMP_DIR.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "session-planner-config-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp config dir");
            Self { path }
        }

        fn write(&self, name: &str, value: serde_json::Value) {
            fs::write(self.path.join(name), value.to_string()).expect("write config");
        }
    }

    impl Drop for TempConfigDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn defaults_are_written_once_and_load_cleanly() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");
        let config = load_timeline_config(&dir.path).expect("load timeline");
        assert_eq!(config, TimelineConfig::default());
        assert_eq!(read_timezone(&dir.path).expect("timezone"), Tz::UTC);
        assert_eq!(read_app_name(&dir.path).expect("app name"), "Session Planner");

        dir.write(
            APP_JSON,
            serde_json::json!({"schema": 1, "appName": "Club", "timezone": "Europe/Paris"}),
        );
        ensure_default_configs(&dir.path).expect("keep existing");
        assert_eq!(read_app_name(&dir.path).expect("app name"), "Club");
        assert_eq!(read_timezone(&dir.path).expect("timezone"), Tz::Europe__Paris);
    }

    #[test]
    fn schema_must_be_present_and_supported() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");

        dir.write(TIMELINE_JSON, serde_json::json!({"windowStart": "08:00"}));
        assert!(matches!(
            load_timeline_config(&dir.path),
            Err(InfraError::InvalidConfig(message)) if message.contains("missing schema")
        ));

        dir.write(APP_JSON, serde_json::json!({"schema": 2, "timezone": "UTC"}));
        assert!(matches!(
            load_configs(&dir.path),
            Err(InfraError::InvalidConfig(message)) if message.contains("unsupported schema 2")
        ));
    }

    #[test]
    fn timeline_values_are_validated() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");
        let mut raw = default_files()[TIMELINE_JSON].clone();
        raw["windowEnd"] = serde_json::json!("07:00");
        dir.write(TIMELINE_JSON, raw);
        assert!(matches!(
            load_timeline_config(&dir.path),
            Err(InfraError::InvalidConfig(message)) if message.contains("window_end")
        ));
    }

    #[test]
    fn custom_timeline_overrides_defaults() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");
        let mut raw = default_files()[TIMELINE_JSON].clone();
        raw["windowStart"] = serde_json::json!("07:00");
        raw["createExtent"] = serde_json::json!("minimum_plus_delta");
        dir.write(TIMELINE_JSON, raw);

        let config = load_timeline_config(&dir.path).expect("load timeline");
        assert_eq!(config.window_start, ClockTime::from_hm(7, 0).expect("time"));
        assert_eq!(config.create_extent, CreateExtent::MinimumPlusDelta);
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let dir = TempConfigDir::new();
        dir.write(APP_JSON, serde_json::json!({"schema": 1, "timezone": "Mars/Olympus"}));
        assert!(matches!(
            read_timezone(&dir.path),
            Err(InfraError::InvalidConfig(message)) if message.contains("Mars/Olympus")
        ));
    }
}

use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const COMMANDS_LOG: &str = "commands.log";

/// Appends one JSON line per session command to `logs/commands.log`.
///
/// Writes are best-effort: a failure to log never fails the command.
#[derive(Debug)]
pub struct ActivityLog {
    path: Option<PathBuf>,
    guard: Mutex<()>,
}

impl ActivityLog {
    pub fn new(logs_dir: &Path) -> Self {
        Self {
            path: Some(logs_dir.join(COMMANDS_LOG)),
            guard: Mutex::new(()),
        }
    }

    /// A log that only forwards to the `log` facade.
    pub fn disabled() -> Self {
        Self {
            path: None,
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn info(&self, command: &str, message: &str) {
        log::info!("{command}: {message}");
        self.append("info", command, message);
    }

    pub fn warn(&self, command: &str, message: &str) {
        log::warn!("{command}: {message}");
        self.append("warn", command, message);
    }

    pub fn error(&self, command: &str, message: &str) {
        log::error!("{command}: {message}");
        self.append("error", command, message);
    }

    fn append(&self, level: &str, command: &str, message: &str) {
        let Some(path) = self.path.as_ref() else {
            return;
        };
        let Ok(_guard) = self.guard.lock() else {
            return;
        };
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn entries_are_appended_as_json_lines() {
        let dir = std::env::temp_dir().join(format!(
            "session-planner-activity-log-{}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).expect("create logs dir");
        let log = ActivityLog::new(&dir);
        log.info("assign_person", "p1 -> seq-1");
        log.error("save_day", "disk full");

        let raw = fs::read_to_string(dir.join(COMMANDS_LOG)).expect("read log");
        let lines = raw
            .lines()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).expect("json line"))
            .collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["level"], "info");
        assert_eq!(lines[0]["command"], "assign_person");
        assert_eq!(lines[1]["message"], "disk full");
        assert!(lines[1]["timestamp"].as_str().is_some());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn disabled_log_writes_nothing() {
        let log = ActivityLog::disabled();
        log.warn("noop", "nothing to see");
        assert!(log.path().is_none());
    }
}

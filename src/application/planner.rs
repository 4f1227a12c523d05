use crate::application::activity_log::ActivityLog;
use crate::application::bootstrap::{BootstrapResult, bootstrap_workspace};
use crate::application::seeding::{SeedInput, seed_day};
use crate::application::session::{SaveOutcome, TimelineSession};
use crate::domain::models::{ClockTime, RosterEntry, TimelineConfig};
use crate::domain::time_grid::TimeGrid;
use crate::infrastructure::config::{load_timeline_config, read_app_name, read_timezone};
use crate::infrastructure::day_plan_repository::{DayPlanRepository, SqliteDayPlanRepository};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_mapper::ImportedEvent;
use chrono::NaiveDate;
use chrono_tz::Tz;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Entry point for a planner workspace: configuration, storage and the
/// command log, shared by every day opened from it.
pub struct Planner {
    workspace_root: PathBuf,
    app_name: String,
    timeline: TimelineConfig,
    timezone: Tz,
    repository: Arc<dyn DayPlanRepository>,
    activity: Arc<ActivityLog>,
}

impl Planner {
    pub fn open(workspace_root: impl Into<PathBuf>) -> Result<Self, InfraError> {
        let workspace_root = workspace_root.into();
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let repository = Arc::new(SqliteDayPlanRepository::new(&bootstrap.database_path));
        Self::from_bootstrap(bootstrap, repository)
    }

    /// Same workspace layout, but days are stored through `repository`.
    pub fn with_repository(
        workspace_root: impl Into<PathBuf>,
        repository: Arc<dyn DayPlanRepository>,
    ) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root.into())?;
        Self::from_bootstrap(bootstrap, repository)
    }

    fn from_bootstrap(
        bootstrap: BootstrapResult,
        repository: Arc<dyn DayPlanRepository>,
    ) -> Result<Self, InfraError> {
        let timeline = load_timeline_config(&bootstrap.config_dir)?;
        let timezone = read_timezone(&bootstrap.config_dir)?;
        let app_name = read_app_name(&bootstrap.config_dir)?;
        let activity = Arc::new(ActivityLog::new(&bootstrap.logs_dir));
        activity.info(
            "open_workspace",
            &format!("{app_name} at {} ({timezone})", bootstrap.workspace_root.display()),
        );

        Ok(Self {
            workspace_root: bootstrap.workspace_root,
            app_name,
            timeline,
            timezone,
            repository,
            activity,
        })
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn timeline_config(&self) -> &TimelineConfig {
        &self.timeline
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn activity_log(&self) -> &ActivityLog {
        &self.activity
    }

    /// Loads the stored day, migrates it and falls back to `imported_events`
    /// when the day holds no readable block. Only a storage failure is an
    /// error; damaged documents are counted as dropped.
    pub async fn open_day(
        &self,
        date: NaiveDate,
        imported_events: &[ImportedEvent],
        roster: Vec<RosterEntry>,
        initial_time: Option<ClockTime>,
    ) -> Result<TimelineSession, InfraError> {
        let persisted = match self.repository.load_day(date).await {
            Ok(persisted) => persisted,
            Err(error) => {
                self.activity
                    .error("open_day", &format!("{date}: {error}"));
                return Err(error);
            }
        };
        let grid = TimeGrid::from_config(&self.timeline);
        let seeded = seed_day(SeedInput {
            grid: &grid,
            palette: &self.timeline.import_palette,
            timezone: self.timezone,
            date,
            persisted,
            imported: imported_events,
        });
        self.activity.info(
            "open_day",
            &format!(
                "{date}: {} blocks from {:?}, {} dropped",
                seeded.blocks.len(),
                seeded.source,
                seeded.dropped
            ),
        );

        Ok(TimelineSession::new(
            date,
            self.timeline.clone(),
            seeded,
            roster,
            initial_time,
            Arc::clone(&self.activity),
        ))
    }

    pub async fn save_day(&self, session: &mut TimelineSession) -> SaveOutcome {
        session.save(self.repository.as_ref()).await
    }
}

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::planner::Planner;
pub use application::seeding::{SeedSource, SeededDay};
pub use application::session::{
    AssignmentOutcome, EditOutcome, RosterAvailability, SaveOutcome, TimelineSession,
};
pub use domain::clipboard::ClipboardPayload;
pub use domain::conflict::{Conflict, DoubleBooking};
pub use domain::interaction::{DraftBlock, InteractionOutcome, PointerEvent, PointerTarget};
pub use domain::layout::{BlockPlacement, ColumnSlot, PlacementTarget};
pub use domain::models::{
    BlockPatch, ClockTime, CreateExtent, MediaItem, MediaKind, RosterEntry, SequenceBlock,
    TimelineConfig,
};
pub use domain::store::SequenceBlockStore;
pub use domain::time_grid::TimeGrid;
pub use infrastructure::day_plan_repository::{
    DayPlanRepository, InMemoryDayPlanRepository, SqliteDayPlanRepository, StoredDay,
};
pub use infrastructure::error::InfraError;
pub use infrastructure::event_mapper::ImportedEvent;

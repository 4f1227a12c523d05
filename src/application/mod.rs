pub mod activity_log;
pub mod bootstrap;
pub mod planner;
pub mod seeding;
pub mod session;

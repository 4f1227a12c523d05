pub mod config;
pub mod day_plan_repository;
pub mod error;
pub mod event_mapper;
pub mod storage;

pub mod clipboard;
pub mod conflict;
pub mod interaction;
pub mod layout;
pub mod migration;
pub mod models;
pub mod store;
pub mod time_grid;

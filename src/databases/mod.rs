
pub mod database;
pub mod wrappers;

pub use database::{Database, DBEntry, DB};
pub use wrappers::*;

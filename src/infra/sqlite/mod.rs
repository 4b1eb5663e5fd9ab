//! SQLite journal storage

mod journal;

pub use journal::*;

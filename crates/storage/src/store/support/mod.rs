#![forbid(unsafe_code)]

mod events;
mod json;
mod rows;
mod schema;
mod time;

pub(super) use events::*;
pub(super) use json::*;
pub(super) use rows::*;
pub(super) use schema::migrate_sqlite_schema;
pub(super) use time::now_ms;

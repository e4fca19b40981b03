//! Imports geonames postal codes into a SQLite database.
//!
//! Each import replaces the stored postal codes of the countries it covers
//! (its scope) and leaves every other country alone.

pub mod cli;
pub mod commands;
pub mod data;
pub mod db;
pub mod distance;
pub mod fixtures;

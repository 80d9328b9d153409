pub mod builder;
pub mod config;
pub mod error;
pub mod geo;
pub mod matcher;
pub mod model;
pub mod output;
pub mod parser;
pub mod reducer;
pub mod speed;
pub mod stats;
pub mod timetable;

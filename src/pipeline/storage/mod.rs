// Line-oriented canonical store and JSON dataset writers

pub mod canonical_log;
pub mod json_output;

pub mod config;
pub mod eval;
pub mod languages;
pub mod run;

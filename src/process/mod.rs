// src/process/mod.rs
pub mod clean;
pub mod derive;
pub mod segment;
pub mod trimming;
pub mod utils;

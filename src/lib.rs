// src/lib.rs
pub mod clustering;
pub mod data;
pub mod matching;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod utils;

pub mod canonical;
pub mod merge;
pub mod overrides;

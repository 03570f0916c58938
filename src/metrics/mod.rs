//! Sampling core: two external sources, their parsers, rolling history,
//! and the aggregate model the UI reads.

pub mod error;
pub mod gpu;
pub mod history;
pub mod info;
pub mod model;
pub mod platform;
pub mod power;
pub mod sample;
pub mod sampler;
pub mod source;

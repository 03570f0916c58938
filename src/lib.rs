//! agxtop: a terminal dashboard for Apple Silicon GPU and Neural Engine
//! utilization.
//!
//! Two external tools are polled on independent cadences: the device
//! registry for GPU driver statistics and the power profiler for ANE and
//! CPU cluster activity. Their output is parsed into typed snapshots,
//! rolled into bounded history buffers, and published to the UI through
//! watch channels so a render never observes half a tick.

pub mod action;
pub mod app;
pub mod config;
pub mod event;
pub mod format;
pub mod metrics;
pub mod report;
pub mod ui;

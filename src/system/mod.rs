//! System utilities and monitoring
//!
//! Prometheus metrics for the worker pool.

pub mod metrics;

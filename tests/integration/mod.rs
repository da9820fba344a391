//! Integration Tests Module
//!
//! End-to-end pipeline runs against a scripted model: single-file and
//! project generation, fix chaining, fallbacks, the event stream and
//! configuration loading.

mod support;

// Single-file runs, fix chaining and fallbacks
mod pipeline_test;

// Planning and bundle guards
mod multi_file_test;

// Event ordering and SSE framing
mod streaming_test;

// Config file and environment loading
mod config_test;

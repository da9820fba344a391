//! Uber Code Generator Core
//!
//! Foundational data model, error types and stream types shared by every crate
//! in the Uber Code Generator workspace. This crate has no dependency on HTTP,
//! the async runtime, or any LLM provider.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `settings` - Model gateway settings and credential rules (`GatewaySettings`, `ProxyConfig`)
//! - `streaming` - Provider-agnostic stream chunks and the adapter trait
//! - `models` - Stage results, fix records, findings and severity
//! - `artifact` - Code artifacts and the `<!-- path -->` multi-file bundle format
//! - `plan` - Project plans, file specs and language detection
//!
//! ## Design Principles
//!
//! 1. **Plain data only** - everything here is serde-serializable and cheap to clone
//! 2. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod artifact;
pub mod error;
pub mod models;
pub mod plan;
pub mod settings;
pub mod streaming;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Gateway Settings ───────────────────────────────────────────────────
pub use settings::{is_valid_key, GatewaySettings, ProxyConfig};

// ── Streaming Types ────────────────────────────────────────────────────
pub use streaming::{AdapterError, StreamAdapter, StreamChunk};

// ── Stage Data Model ───────────────────────────────────────────────────
pub use models::{Finding, FixRecord, PipelineMode, Severity, StageKind, StageResult};

// ── Artifacts & Plans ──────────────────────────────────────────────────
pub use artifact::{CodeArtifact, FileBundle};
pub use plan::{detect_language, is_executable_source, FileSpec, ProjectPlan};

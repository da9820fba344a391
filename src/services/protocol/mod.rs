//! Event Protocol
//!
//! AG-UI event types, the per-run encoder with SSE framing, and the
//! optional-channel emitter the pipeline writes to.

pub mod emitter;
pub mod encoder;
pub mod events;

pub use emitter::EventEmitter;
pub use encoder::{new_id, to_sse, EventEncoder};
pub use events::{custom, EventBody, PatchOp, PatchOpKind, ProtocolEvent};

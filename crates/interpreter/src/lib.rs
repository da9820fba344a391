//! Uber Code Generator Interpreter
//!
//! Pure functions that turn raw model text into something the pipeline can use:
//!
//! - `response` - layered JSON recovery (`parse`), never fails, returns `None`
//!   when nothing useful survives
//! - `fences` - markdown code-fence stripping for generated source
//!
//! Every strategy reads the original text; no strategy feeds a mutated
//! accumulator into the next.

pub mod fences;
pub mod response;

pub use fences::strip_markdown_fences;
pub use response::{parse, parse_with_strategy, JsonMap, Strategy};

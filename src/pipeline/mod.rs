//! Pipeline stages for webpage evaluation.
//!
//! Each submodule implements exactly one step, so each can be tested without
//! the others.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ (prompt) ──▶ llm ──▶ json ──▶ repair
//! (URL→text)            (model)  (span)   (lenient parse)
//! ```
//!
//! 1. [`fetch`]  — GET the page and keep the text of `p`/`span`/`li`
//! 2. [`llm`]    — submit the rendered prompt once; the only stage besides
//!    `fetch` with network I/O
//! 3. [`json`]   — greedy `{…}` span in the raw response
//! 4. [`repair`] — tolerant JSON parsing of that span

pub mod fetch;
pub mod json;
pub mod llm;
pub mod repair;

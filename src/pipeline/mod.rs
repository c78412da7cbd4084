//! Pipeline stages for a code-transformation request.
//!
//! Each submodule implements one step; the HTTP layer only wires them together.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ prompts::compose_prompt ──▶ llm
//! (form)    (PDF text)   (pure)                     (completion service)
//! ```
//!
//! 1. [`input`]: validate required fields, default the options
//! 2. [`extract`]: turn the optional coding-standard PDF into text; runs in
//!    `spawn_blocking` and never fails the request
//! 3. [`crate::prompts`]: build the prompt
//! 4. [`llm`]: the only stage with network I/O

pub mod extract;
pub mod input;
pub mod llm;

//! Prompt assembly.
//!
//! The prompt sent to the model has three parts, always in this order:
//!
//! | Part | Source | Trim Strategy |
//! |------|--------|---------------|
//! | 1. System | Persona profile | Never trimmed |
//! | 2. Conversation History | Stored turns | Oldest turns dropped beyond the window |
//! | 3. New message | The request | Never trimmed |

pub mod assembler;

pub use assembler::ContextAssembler;

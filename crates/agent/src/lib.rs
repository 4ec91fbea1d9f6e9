//! The conversation engine for Doppel.
//!
//! Every chat message follows the same path:
//!
//! 1. **Load** the conversation's history from the store
//! 2. **Assemble** a prompt: persona system block, recent history window, new message
//! 3. **Infer** the reply through the configured gateway
//! 4. **Persist** the user turn and the reply together
//!
//! Nothing is written unless step 3 succeeds.

pub mod context;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use context::ContextAssembler;
pub use session::{SessionCoordinator, SessionOptions, SessionStage};

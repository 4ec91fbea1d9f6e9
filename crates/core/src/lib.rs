//! # Doppel Core
//!
//! Domain types, traits, and error definitions for the Doppel persona chat
//! runtime. This crate has **zero framework dependencies**: it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The two seams of the system are defined as traits here:
//! - [`ConversationStore`]: where conversation history lives
//! - [`InferenceGateway`]: how a prompt becomes a reply
//!
//! Implementations live in their respective crates (`doppel-memory`,
//! `doppel-providers`), so the session logic can be tested against stubs.

pub mod error;
pub mod message;
pub mod persona;
pub mod provider;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use error::{
    Disposition, Error, InferenceError, InferenceFailure, PersonaError, Result, SessionError,
    StoreError,
};
pub use message::{ConversationHistory, ConversationId, Role, Turn};
pub use persona::PersonaProfile;
pub use provider::{InferenceGateway, PromptBlock, PromptPayload, PromptRole};
pub use store::{ConversationStore, StorageKind};

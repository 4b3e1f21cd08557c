//! Translation between the generic chat-completion schema and the
//! Anthropic Messages API.
//!
//! The core of the crate: converts requests, completed responses, and
//! streaming events between the two formats. All translation functions are
//! pure (no I/O).

pub mod anthropic_types;
pub mod chat_types;
pub mod request;
pub mod response;
pub mod streaming;

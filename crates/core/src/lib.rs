//! Data model and collaborator contracts for the idiom polisher.
//!
//! This crate owns the types every other crate agrees on:
//! - `PolishResult`: the transient outcome of one polish request
//! - `PolishRecord`: a persisted history entry keyed by the original text
//! - `RemotePolisher`: the request/response contract with the polishing service
//! - `HostHandoff`: the caller context that consumes the chosen phrase
//!
//! # Example
//!
//! ```ignore
//! use polisher_core::{is_blank, RemotePolisher};
//!
//! if !is_blank(&text) {
//!     let result = polisher.polish(&text).await?;
//!     println!("{} -> {}", result.original, result.idiom);
//! }
//! ```

mod handoff;
mod remote;
mod result;

pub use handoff::{HandoffError, HostHandoff, HostHandoffRef};
pub use remote::{RemoteError, RemotePolisher, RemotePolisherRef};
pub use result::{PolishRecord, PolishRequest, PolishResponse, PolishResult};

/// Whether `text` contains nothing but whitespace.
///
/// Blank text is never submitted to the polishing service.
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

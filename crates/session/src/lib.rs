//! Polishing session state machine.
//!
//! A session takes raw text (typed or seeded by the caller), sends it to the
//! polishing service, records successful results in history, and hands the
//! phrase the user picks to the host.
//!
//! ```text
//!            submit (non-blank)          ok
//!   Input ─────────────────────▶ Loading ─────▶ Result ──select──▶ Finished
//!     ▲ ▲                           │             │
//!     │ └──────── dismiss ─── Error ◀┘ err        │
//!     └──────────────────── reset ────────────────┘
//! ```
//!
//! All methods that may start a remote call must run inside a tokio runtime.

mod error;
mod session;
mod state;

pub use error::{SessionError, SessionResult};
pub use session::{PolishingSession, SessionDeps, SubmitOutcome, Transition};
pub use state::SessionState;

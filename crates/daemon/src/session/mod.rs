//! Browser sessions.
//!
//! A session is identified by a server-issued cookie and holds exactly one
//! anti-forgery token until it expires.

pub mod store;
pub mod token;

pub use store::{SessionId, SessionStore, DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL};
pub use token::AntiForgeryToken;

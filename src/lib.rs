//! Artisan: conversational intake for a home-repair marketplace.
//!
//! A client describes what they need in free text; the intake pipeline tags
//! each message with a hosted language model, geocodes the address, fills a
//! structured form and, once the client confirms, persists a service request.
//!
//! See `DESIGN.md` for the module map.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod chat;
pub mod config;
pub mod credentials;
pub mod geocoding;
pub mod intake;
pub mod logging;
pub mod providers;
pub mod types;

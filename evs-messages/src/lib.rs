//! evs-messages
//!
//! Centralized user-facing message templates for the vcf-evs CLI and the
//! `migrate-vm` script, plus the builder that fills in their variables.

pub mod builder;
pub mod messages;

pub use builder::MessageBuilder;
pub use messages::{Messages, MESSAGES};

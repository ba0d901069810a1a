//! Shared plumbing for the `vcf-evs` CLI and the `migrate-vm` script:
//! logging and configuration bootstrap, spinners and status tables.

pub mod bootstrap;
pub mod progress;
pub mod table;

pub mod error;
pub mod output_macros;
pub mod wait;

pub use wait::{poll_until, Backoff, CancellationToken, PollConfig, PollOutcome, WaitError};

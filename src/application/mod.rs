//! Application layer orchestrating the earning and payout workflows.
//!
//! [`engine::Engine`] is the entry point: it decodes each inbound event into an
//! action and drives the challenge, withdrawal and approval state machines over
//! the store and transport ports. Each workflow lives in its own module as an
//! `impl Engine` block.

pub mod approval;
pub mod challenge;
pub mod engine;
pub mod messages;
pub mod withdrawal;

#[cfg(test)]
pub(crate) mod testing;

//! Domain layer: ledger records, challenges, payout rails, withdrawal records,
//! decoded actions and the ports the application layer talks through.

pub mod account;
pub mod action;
pub mod challenge;
pub mod payment_method;
pub mod ports;
pub mod withdrawal;

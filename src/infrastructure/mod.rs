//! Storage backends implementing the domain ports.

pub mod in_memory;

//! Outbound delivery abstractions (Discord today).

pub mod port;

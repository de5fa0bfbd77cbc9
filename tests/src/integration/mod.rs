//! Cross-crate flows.

#[cfg(test)]
mod fixtures;

pub mod e2e_agent;
pub mod flows;
pub mod reconnect;

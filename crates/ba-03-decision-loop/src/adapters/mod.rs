//! Adapters binding the loop's ports to concrete services.

pub mod broker;

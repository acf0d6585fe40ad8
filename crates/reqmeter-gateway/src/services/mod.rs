//! Built-in demo handlers served by the gateway binary.

pub mod users;

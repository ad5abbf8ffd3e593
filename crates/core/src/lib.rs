//! Core logic for hollow-rs: hot ranking, comment caching, commenter names,
//! push fan-out and email rendering.

pub mod services;

pub use services::*;

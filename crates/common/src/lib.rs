//! Common utilities and shared types for hollow-rs.
//!
//! This crate provides foundational components used across all hollow-rs crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Fast store**: The [`FastStore`] abstraction over Redis, with
//!   [`RedisStore`] for production and [`MemoryStore`] for tests
//! - **Host load**: Load average sampling via [`SystemLoad`]
//!
//! # Example
//!
//! ```no_run
//! use hollow_common::{AppResult, Config, Keyspace};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let keys = Keyspace::new(config.redis.prefix);
//!     println!("Hot list lives at {}", keys.hot_list());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod load;
pub mod memory_store;
pub mod redis_store;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use load::{FixedLoad, LoadAverage, SystemLoad};
pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;
pub use store::{FastStore, Keyspace, StoreCommand};

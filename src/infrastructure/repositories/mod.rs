//! Repository Implementations
//!
//! Typed access to records in the key-value store. Repositories never open
//! transactions themselves; callers pass the transaction they are running in.
//!
//! ## Available Repositories
//!
//! - **KvMessageRepository** - outgoing message state
//! - **KvDisappearingConfigRepository** - per-thread expiration policy

pub mod disappearing_config_repository;
pub mod message_repository;

pub use disappearing_config_repository::KvDisappearingConfigRepository;
pub use message_repository::KvMessageRepository;

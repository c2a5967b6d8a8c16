/// Recovery engine: filtering, shard resolution and the copy pass
pub mod engine;
pub mod naming;

pub use engine::{ExtensionFilter, RecoveryEngine, RecoveryError, RecoveryProgress};
pub use naming::{resolve_destination, shard_relative_path};

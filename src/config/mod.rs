mod loader;

pub use loader::{default_worker_count, CacheConfig, Config, TypeScriptConfig};

pub mod redis_cache;
pub mod error;

pub use redis_cache::{
    Cache, CacheConfig,
    permission_cache_key, rate_limit_key, user_cache_key,
};
pub use error::{CacheError, Result};

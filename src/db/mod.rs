pub mod movies;
pub mod postgres;
pub mod redis;

pub use movies::{require_movie, InMemoryMovieStore, MovieStore};
pub use postgres::{create_pool, run_migrations, PgMovieStore};
pub use self::redis::create_redis_client;
pub use self::redis::Cache;
pub use self::redis::CacheKey;
pub use self::redis::CacheWriterHandle;

/// Returns a cached value, or computes, caches and returns it.
///
/// A failed cache read is logged and treated as a miss, so Redis being down
/// only costs the computation. Errors from the computation propagate with `?`.
///
/// # Arguments
/// * `$cache`: anything with `get_from_cache` and `set_in_background`.
/// * `$key`: the `CacheKey` to read and write.
/// * `$ttl`: seconds the computed value stays cached.
/// * `$block`: future computing the value on a miss.
///
/// # Example
/// ```rust,ignore
/// let titles: Vec<String> = cached!(cache, key, 3600, async { rank(query) })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let hit = match $cache.get_from_cache(&$key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(error = %e, key = %$key, "Cache read failed, computing value");
                None
            }
        };
        match hit {
            Some(cached) => {
                tracing::debug!(key = %$key, "Cache hit");
                Ok(cached)
            }
            None => match $block.await {
                Ok(value) => {
                    $cache.set_in_background(&$key, &value, $ttl);
                    Ok(value)
                }
                Err(e) => Err(e),
            },
        }
    }};
}

/// Read-through caching around an async computation.
///
/// Returns the cached value for `$key` when present. Otherwise awaits `$block`,
/// queues the result for a background cache write with `$ttl` seconds to live,
/// and returns it. A failed cache read is logged and treated as a miss.
/// Errors from the block are propagated with `?`, so failed computations are
/// never cached.
///
/// ```rust,ignore
/// cached!(self.cache, CacheKey::UserList(name.to_string()), 300, async move {
///     fetch_list(name).await
/// })
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        let hit = match $cache.get_from_cache(&key).await {
            Ok(hit) => hit,
            Err(e) => {
                ::tracing::warn!(error = %e, key = %key, "Cache read failed, treating as miss");
                None
            }
        };

        if let Some(cached) = hit {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&key, &value, $ttl);
            Ok(value)
        }
    }};
}

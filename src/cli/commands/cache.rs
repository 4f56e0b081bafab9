use anyhow::Result;

use crate::cache::OperationCache;

/// Reports cache statistics, clearing the cache first when `clean` is set.
pub fn run(cache: &OperationCache, clean: bool) -> Result<()> {
    if clean {
        cache.clear()?;
        println!("cache cleared");
    } else {
        println!("{}", cache.stats());
    }
    Ok(())
}

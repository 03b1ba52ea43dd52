use anyhow::{Context, Result};
use picstore_core::Config;
use picstore_storage::{ReplicatedStorage, S3Storage, Storage};
use std::sync::Arc;

/// One S3 client per datacenter; the first datacenter is the primary and
/// the rest receive mirrored writes.
pub fn build_storage(config: &Config) -> Result<Arc<ReplicatedStorage>> {
    let mut spaces = Vec::with_capacity(config.datacenters.len());
    for datacenter in &config.datacenters {
        let bucket = config.bucket_for(datacenter);
        let endpoint = config.endpoint_for(datacenter);
        let space = S3Storage::new(bucket.clone(), datacenter.clone(), &endpoint)
            .with_context(|| format!("building S3 client for {bucket}"))?;
        tracing::info!(bucket, endpoint, "space configured");
        spaces.push(Arc::new(space) as Arc<dyn Storage>);
    }

    let mut spaces = spaces.into_iter();
    let primary = spaces
        .next()
        .context("at least one datacenter is required")?;
    Ok(Arc::new(ReplicatedStorage::new(primary, spaces.collect())))
}

//! Image transformation providers.
//!
//! Each provider takes an uploaded original and a list of size variants to
//! produce. Depending on the provider, a variant resolves to raw bytes, a
//! URL to download, or an async job id that completes through a webhook.

pub mod cloudflare;
pub mod download;
pub mod kraken;
pub mod traits;

pub use cloudflare::CloudflareProvider;
pub use download::Downloader;
pub use kraken::KrakenProvider;
pub use traits::{TransformError, TransformOutput, TransformProvider, VariantOutcome};

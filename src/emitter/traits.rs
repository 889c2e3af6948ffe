//! Emitter trait

use crate::error::Result;
use crate::types::{EmitResult, Owner, Record};
use async_trait::async_trait;
use std::path::Path;

/// Writes the output bundle for one enriched record
///
/// Implementations decide the layout. The batch coordinator calls `emit`
/// once per record that survived enrichment and drops the record (with a
/// log line) when it returns an error.
#[async_trait]
pub trait ArtifactEmitter: Send + Sync {
    /// Emit the bundle for `record`
    ///
    /// # Arguments
    ///
    /// * `record` - Enriched record; its id is non-blank
    /// * `image` - Cached poster, if one was found
    /// * `owner` - Author or actress the batch was generated for
    ///
    /// # Errors
    ///
    /// Returns an error when the primary artifact cannot be written.
    async fn emit(
        &self,
        record: &Record,
        image: Option<&Path>,
        owner: Option<&Owner>,
    ) -> Result<EmitResult>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

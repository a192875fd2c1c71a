//! Deployment environment resolution
//!
//! Uploads land in buckets named `<app>-<env>-<suffix>`, so the environment is
//! historically read from the second hyphen-delimited token of the bucket name.
//! That convention breaks as soon as an app name contains a hyphen, so an
//! explicit `bucket=env` mapping is consulted first and the name split is only
//! a fallback.

use std::collections::HashMap;

use crate::{PipelineError, Result};

/// Resolves the environment tag for a bucket
#[derive(Debug, Clone, Default)]
pub struct EnvResolver {
    overrides: HashMap<String, String>,
}

impl EnvResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an explicit bucket mapping
    pub fn with_mapping(mut self, bucket: impl Into<String>, env: impl Into<String>) -> Self {
        self.overrides.insert(bucket.into(), env.into());
        self
    }

    /// Parse a mapping list of the form `bucket=env,other-bucket=env2`
    ///
    /// Blank entries are ignored; an entry without `=` or with an empty side is
    /// rejected.
    pub fn parse_mappings(mappings: &str) -> Result<Self> {
        let mut resolver = Self::new();

        for entry in mappings.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (bucket, env) = entry.split_once('=').ok_or_else(|| {
                PipelineError::config(format!("invalid bucket mapping '{}'", entry))
            })?;
            let (bucket, env) = (bucket.trim(), env.trim());

            if bucket.is_empty() || env.is_empty() {
                return Err(PipelineError::config(format!(
                    "invalid bucket mapping '{}'",
                    entry
                )));
            }

            resolver = resolver.with_mapping(bucket, env);
        }

        Ok(resolver)
    }

    /// Resolve the environment for `bucket`
    pub fn resolve(&self, bucket: &str) -> Result<String> {
        if let Some(env) = self.overrides.get(bucket) {
            return Ok(env.clone());
        }

        env_from_bucket_name(bucket)
            .map(str::to_string)
            .ok_or_else(|| PipelineError::UnknownEnvironment(bucket.to_string()))
    }
}

/// Second hyphen-delimited token of a bucket name, e.g. `app-dev-uploads` -> `dev`
pub fn env_from_bucket_name(bucket: &str) -> Option<&str> {
    bucket.split('-').nth(1).filter(|token| !token.is_empty())
}

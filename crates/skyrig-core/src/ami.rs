//! Base image lookup used when a generator is asked for the latest AMI.
//!
//! Real lookups (SSM parameters, `DescribeImages`) live outside this crate;
//! generators only see the [`AmiResolver`] trait.

use std::collections::HashMap;

use crate::error::{ConfigError, ConfigResult};

/// Resolves the latest base machine image for a region.
pub trait AmiResolver {
    fn latest_ami(&self, region: &str) -> ConfigResult<String>;
}

/// Resolver backed by a fixed region → AMI table.
#[derive(Debug, Clone, Default)]
pub struct StaticAmiResolver {
    by_region: HashMap<String, String>,
    fallback: Option<String>,
}

impl StaticAmiResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every region to the same image.
    pub fn any_region(ami: impl Into<String>) -> Self {
        Self {
            by_region: HashMap::new(),
            fallback: Some(ami.into()),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>, ami: impl Into<String>) -> Self {
        self.by_region.insert(region.into(), ami.into());
        self
    }
}

impl AmiResolver for StaticAmiResolver {
    fn latest_ami(&self, region: &str) -> ConfigResult<String> {
        self.by_region
            .get(region)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| ConfigError::AmiLookup(format!("no image known for region {region}")))
    }
}

impl<F> AmiResolver for F
where
    F: Fn(&str) -> ConfigResult<String>,
{
    fn latest_ami(&self, region: &str) -> ConfigResult<String> {
        self(region)
    }
}

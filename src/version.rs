//! Generator tag written into the NZB comment

use crate::error::Result;

/// Supplies the generator tag embedded in each NZB's leading comment
///
/// The tag is cosmetic. A failing provider never fails a release; the
/// pipeline logs the failure and writes an empty tag instead.
pub trait VersionProvider: Send + Sync {
    /// Human-readable generator tag, e.g. `v0.1.0`
    fn generator_tag(&self) -> Result<String>;
}

/// Tags NZBs with this crate's package version
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageVersion;

impl VersionProvider for PackageVersion {
    fn generator_tag(&self) -> Result<String> {
        Ok(format!("v{}", env!("CARGO_PKG_VERSION")))
    }
}

/// Tags NZBs with a fixed string, e.g. a deployment's git tag
#[derive(Debug, Clone, Default)]
pub struct StaticVersion(pub String);

impl VersionProvider for StaticVersion {
    fn generator_tag(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Fetch the generator tag, falling back to an empty tag on failure
pub(crate) fn generator_tag_or_empty(provider: &dyn VersionProvider) -> String {
    match provider.generator_tag() {
        Ok(tag) => tag,
        Err(e) => {
            tracing::warn!(error = %e, "could not determine generator tag, using empty tag");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct BrokenVersion;

    impl VersionProvider for BrokenVersion {
        fn generator_tag(&self) -> Result<String> {
            Err(Error::Other("no git checkout".into()))
        }
    }

    #[test]
    fn package_version_is_prefixed_with_v() {
        let tag = generator_tag_or_empty(&PackageVersion);
        assert_eq!(tag, format!("v{}", env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn static_version_returns_its_tag() {
        let tag = generator_tag_or_empty(&StaticVersion("v2.4.1-3-gdeadbee".into()));
        assert_eq!(tag, "v2.4.1-3-gdeadbee");
    }

    #[test]
    fn failing_provider_yields_empty_tag() {
        assert_eq!(generator_tag_or_empty(&BrokenVersion), "");
    }
}

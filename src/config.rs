//! Volume configuration.

use crate::tree::DuplicatePolicy;
use std::path::{Path, PathBuf};

/// Default suffix appended to the origin path to name the volume's mount
/// location.
pub const DEFAULT_LOCATION_SUFFIX: &str = "-shadow";

/// Configuration for a [`crate::ShadowVolume`].
///
/// # Example
///
/// ```
/// use shadowfs::config::VolumeConfig;
/// use shadowfs::tree::DuplicatePolicy;
///
/// let config = VolumeConfig::new("/data/origin")
///     .with_duplicate_policy(DuplicatePolicy::Reject);
/// assert_eq!(config.location().to_str(), Some("/data/origin-shadow"));
/// ```
#[derive(Debug, Clone)]
pub struct VolumeConfig {
    origin: PathBuf,
    duplicate_policy: DuplicatePolicy,
    location_suffix: String,
}

impl VolumeConfig {
    /// Create a configuration for a volume shadowing `origin`.
    pub fn new(origin: impl Into<PathBuf>) -> Self {
        Self {
            origin: origin.into(),
            duplicate_policy: DuplicatePolicy::default(),
            location_suffix: DEFAULT_LOCATION_SUFFIX.to_string(),
        }
    }

    /// Set the policy for inserting over an existing name.
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Set the suffix used to derive the mount location from the origin.
    pub fn with_location_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.location_suffix = suffix.into();
        self
    }

    /// The backing directory the volume shadows.
    pub fn origin(&self) -> &Path {
        &self.origin
    }

    /// The duplicate-insert policy.
    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicate_policy
    }

    /// Where the external mount lifecycle (out of scope here) would place
    /// the mount point: the origin path with the location suffix appended.
    pub fn location(&self) -> PathBuf {
        PathBuf::from(format!("{}{}", self.origin.display(), self.location_suffix))
    }
}

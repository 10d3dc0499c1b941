use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Logical storage buckets used by the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketKind {
    Avatars,
    RequestImages,
    Portfolio,
    Documents,
}

impl BucketKind {
    pub const ALL: [BucketKind; 4] = [
        BucketKind::Avatars,
        BucketKind::RequestImages,
        BucketKind::Portfolio,
        BucketKind::Documents,
    ];

    fn default_name(self) -> &'static str {
        match self {
            Self::Avatars => "avatars",
            Self::RequestImages => "request-images",
            Self::Portfolio => "portfolio",
            Self::Documents => "documents",
        }
    }
}

#[derive(Debug, Deserialize)]
struct BucketsFile {
    #[serde(default)]
    buckets: HashMap<BucketKind, String>,
}

/// Bucket names per [`BucketKind`], constructed explicitly and handed to the
/// components that build storage URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketRegistry {
    names: HashMap<BucketKind, String>,
}

impl Default for BucketRegistry {
    fn default() -> Self {
        Self {
            names: BucketKind::ALL
                .iter()
                .map(|kind| (*kind, kind.default_name().to_string()))
                .collect(),
        }
    }
}

impl BucketRegistry {
    /// Defaults overridden by the `buckets:` map of a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        let file: BucketsFile = serde_yaml::from_str(text)?;
        let mut registry = Self::default();
        for (kind, name) in file.buckets {
            registry.update(kind, name);
        }
        Ok(registry)
    }

    pub fn load_yaml(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn name(&self, kind: BucketKind) -> &str {
        self.names
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_name())
    }

    /// Blank names are ignored.
    pub fn update(&mut self, kind: BucketKind, name: impl Into<String>) {
        let name = name.into();
        let name = name.trim();
        if !name.is_empty() {
            self.names.insert(kind, name.to_string());
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn public_object_url(&self, base_url: &str, kind: BucketKind, object_path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            base_url.trim_end_matches('/'),
            self.name(kind),
            object_path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn update_then_reset_restores_defaults() {
        let mut registry = BucketRegistry::default();
        registry.update(BucketKind::Avatars, "pro-photos");
        registry.update(BucketKind::Documents, "   ");
        assert_eq!(registry.name(BucketKind::Avatars), "pro-photos");
        assert_eq!(registry.name(BucketKind::Documents), "documents");

        registry.reset();
        assert_eq!(registry, BucketRegistry::default());
    }

    #[test]
    fn yaml_overrides_only_listed_buckets() {
        let registry =
            BucketRegistry::from_yaml_str("buckets:\n  request_images: job-photos\n").unwrap();
        assert_eq!(registry.name(BucketKind::RequestImages), "job-photos");
        assert_eq!(registry.name(BucketKind::Portfolio), "portfolio");
    }

    #[test]
    fn load_yaml_reads_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("buckets.yaml");
        std::fs::write(&path, "buckets:\n  avatars: faces\n").unwrap();
        let registry = BucketRegistry::load_yaml(&path).unwrap();
        assert_eq!(registry.name(BucketKind::Avatars), "faces");
    }

    #[test]
    fn public_url_joins_without_double_slashes() {
        let registry = BucketRegistry::default();
        assert_eq!(
            registry.public_object_url("https://x.supabase.co/", BucketKind::Avatars, "/p/1.png"),
            "https://x.supabase.co/storage/v1/object/public/avatars/p/1.png"
        );
    }
}

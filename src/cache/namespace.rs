//! Namespace Naming Module
//!
//! Namespaces are named `{product}-{version}-{partition}`. Bumping the
//! version is the only migration mechanism: activation retires every
//! product namespace that does not carry the current version.

use std::fmt;

/// Storage partition inside one cache version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Static,
    Dynamic,
    Api,
}

impl Partition {
    pub const ALL: [Partition; 3] = [Partition::Static, Partition::Dynamic, Partition::Api];

    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Static => "static",
            Partition::Dynamic => "dynamic",
            Partition::Api => "api",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds and recognizes namespace names for one product/version pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceNames {
    product: String,
    version: String,
}

impl NamespaceNames {
    pub fn new(product: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            version: version.into(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Full name of the current-version namespace for `partition`.
    pub fn name(&self, partition: Partition) -> String {
        format!("{}-{}-{}", self.product, self.version, partition)
    }

    /// Every current-version namespace name.
    pub fn current(&self) -> Vec<String> {
        Partition::ALL.iter().map(|p| self.name(*p)).collect()
    }

    /// True for any namespace carrying this product's prefix, any version.
    pub fn is_owned(&self, name: &str) -> bool {
        name.strip_prefix(&self.product)
            .is_some_and(|rest| rest.starts_with('-'))
    }

    /// True for an owned namespace that is not one of the current ones.
    pub fn is_retired(&self, name: &str) -> bool {
        self.is_owned(name) && !Partition::ALL.iter().any(|p| self.name(*p) == name)
    }
}

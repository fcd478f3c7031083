//! Resolution of `package:group:file` resource names and `package:path`
//! directory names into filesystem paths.
use std::fs;
use std::path::{Path, PathBuf};

use crate::kernel::constants::APP_PACKAGE;
use crate::kernel::error::{Error, Result};
use crate::storage::error::StorageSystemError;

/// Maps package names to their root directories.
#[derive(Debug, Clone, Default)]
pub struct ResourceLocator {
    packages: Vec<(String, PathBuf)>,
}

impl ResourceLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a locator from `(name, root)` pairs, keeping their order.
    pub fn with_packages<I, S, P>(packages: I) -> Self
    where
        I: IntoIterator<Item = (S, P)>,
        S: Into<String>,
        P: Into<PathBuf>,
    {
        let mut locator = Self::new();
        for (name, root) in packages {
            locator.add_package(name, root);
        }
        locator
    }

    /// Register a package root. A later registration of the same name replaces the earlier one.
    pub fn add_package(&mut self, name: impl Into<String>, root: impl Into<PathBuf>) {
        let name = name.into();
        let root = root.into();
        match self.packages.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = root,
            None => self.packages.push((name, root)),
        }
    }

    /// Registered package names in registration order.
    pub fn package_names(&self) -> impl Iterator<Item = &str> {
        self.packages.iter().map(|(name, _)| name.as_str())
    }

    /// Root directory of the named package. An empty name means `app`.
    pub fn package_path(&self, name: &str) -> Option<&Path> {
        let name = if name.is_empty() { APP_PACKAGE } else { name };
        let found = self
            .packages
            .iter()
            .find(|(package, _)| package == name)
            .map(|(_, root)| root.as_path());
        if found.is_none() {
            log::warn!("Failed to find package: {}", name);
        }
        found
    }

    /// Turn `package:path` (e.g. `example:/cache`) into a directory below the
    /// package root, creating it if it does not exist. Absolute paths and
    /// names without a `:` are returned unchanged.
    pub fn find_path(&self, name: &str) -> Result<PathBuf> {
        if name.starts_with('/') {
            return Ok(PathBuf::from(name));
        }

        let mut parts = name.rsplitn(2, ':');
        let (Some(rest), Some(package)) = (parts.next(), parts.next()) else {
            return Ok(PathBuf::from(name));
        };
        if rest.is_empty() {
            return Ok(PathBuf::from(name));
        }

        let root = self.package_path(package).ok_or_else(|| Error::ResourceNotFound {
            name: name.to_string(),
            kind: "path".to_string(),
            package: package.to_string(),
            path: PathBuf::new(),
        })?;
        let path = root.join(rest.trim_start_matches('/'));

        if !path.is_dir() {
            log::debug!("Creating directory '{}'", path.display());
            fs::create_dir_all(&path).map_err(|e| StorageSystemError::io(e, "create_dir", path.clone()))?;
        }
        Ok(path)
    }

    /// Resolve `package:group:file` to `<package root>/resources/<kind>/<group>/<file>`.
    ///
    /// An empty package means `app` and an empty group is left out of the
    /// path. Absolute paths are used as they are. Fails with
    /// [`Error::ResourceNotFound`] when the resulting file does not exist.
    pub fn find_resource(&self, name: &str, kind: &str) -> Result<PathBuf> {
        let (package, path) = if name.starts_with('/') {
            (String::new(), PathBuf::from(name))
        } else {
            let mut parts = name.rsplitn(3, ':');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(file), Some(group), Some(package)) if !file.is_empty() => {
                    let path = self.package_path(package).map(|root| {
                        let mut path = root.join("resources").join(kind);
                        if !group.is_empty() {
                            path.push(group);
                        }
                        path.join(file)
                    });
                    (package.to_string(), path.unwrap_or_default())
                }
                _ => (String::new(), PathBuf::new()),
            }
        };

        if path.as_os_str().is_empty() || !path.exists() {
            log::error!(
                "find_resource failed to find a file. Generated filename is '{}' (name '{}', type '{}')",
                path.display(),
                name,
                kind
            );
            return Err(Error::ResourceNotFound {
                name: name.to_string(),
                kind: kind.to_string(),
                package,
                path,
            });
        }
        Ok(path)
    }
}

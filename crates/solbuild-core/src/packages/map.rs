//! Remapped package map.
//!
//! Discovers the packages reachable from a project root, assigns each a
//! canonical source-name root, parses and rewrites every
//! `remappings.txt` in the tree, and records installation edges between
//! packages. Construction drives a FIFO work queue seeded with the
//! project package: resolving one package's remappings may load further
//! dependencies, which are enqueued and processed in turn.

use crate::error::Bug;
use crate::fsutil::{self, NODE_MODULES};
use crate::packages::package::{
    npm_root_source_name, parse_module_name, read_manifest, Package, LOCAL_VERSION_SENTINEL,
    NPM_SOURCE_NAME_PREFIX, PROJECT_ROOT_SOURCE_NAME,
};
use crate::remappings::{
    parse_remapping_line, NpmRemappingTarget, Remapping, UserRemapping, UserRemappingError,
};
use crate::source_name;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// File name remappings are read from.
pub const REMAPPINGS_FILE_NAME: &str = "remappings.txt";

/// Why the map could not be constructed.
#[derive(Error, Debug)]
pub enum PackageMapError {
    /// One or more `remappings.txt` lines were rejected. Carries every
    /// error collected across the whole tree, in file-traversal order
    /// within a package and work-queue order across packages.
    #[error("workspace has {} invalid remapping line(s)", .0.len())]
    Remappings(Vec<UserRemappingError>),

    #[error(transparent)]
    Bug(#[from] Bug),
}

/// Result of resolving a dependency by its installation name.
#[derive(Debug, Clone)]
pub struct DependencyResolution {
    pub package: Arc<Package>,
    /// The edge's generated remapping, created once per edge.
    pub generated_remapping: Remapping,
    /// Remapping errors recorded for the dependency package itself.
    pub remapping_errors: Vec<UserRemappingError>,
}

/// A directed owner → installation-name → dependency edge.
struct InstallationEdge {
    package: Arc<Package>,
    generated_remapping: Remapping,
}

enum LineOutcome {
    Resolved(UserRemapping),
    Noop,
    Invalid(UserRemappingError),
}

/// Canonical set of packages plus their remappings.
///
/// Has no locking of its own; the resolver serializes access.
pub struct RemappedPackageMap {
    project_root: PathBuf,
    project_manifest_path: PathBuf,
    project: Arc<Package>,
    /// Canonical package per source-name root (invariant: one package
    /// per root, ever).
    by_source_name: FxHashMap<String, Arc<Package>>,
    /// owner root source name → installation name → edge.
    installations: FxHashMap<String, FxHashMap<String, InstallationEdge>>,
    /// package root source name → resolved remappings, in parse order.
    user_remappings: FxHashMap<String, Vec<Arc<UserRemapping>>>,
    /// package root source name → rejected lines of that package.
    remapping_errors: FxHashMap<String, Vec<UserRemappingError>>,
    queue: VecDeque<Arc<Package>>,
}

impl RemappedPackageMap {
    /// Build the map for the project at `project_root`.
    ///
    /// Loads the project package, discovers its remappings, and drains
    /// the dependency queue those remappings induce. Yields the
    /// assembled map or every remapping error found, never both.
    pub fn load(project_root: &Path) -> Result<Self, PackageMapError> {
        let project_root =
            std::fs::canonicalize(project_root).map_err(|e| Bug::io(project_root, &e))?;
        let project_manifest_path = project_root.join("package.json");
        let manifest = read_manifest(&project_manifest_path)?;

        let project = Arc::new(Package {
            name: manifest.name.unwrap_or_default(),
            version: manifest.version.unwrap_or_default(),
            root_fs_path: project_root.clone(),
            root_source_name: PROJECT_ROOT_SOURCE_NAME.to_string(),
            exports: manifest.exports,
        });
        debug!(root = %project_root.display(), "Loading workspace package map");

        let mut map = Self {
            project_root,
            project_manifest_path,
            project: project.clone(),
            by_source_name: FxHashMap::default(),
            installations: FxHashMap::default(),
            user_remappings: FxHashMap::default(),
            remapping_errors: FxHashMap::default(),
            queue: VecDeque::new(),
        };
        map.by_source_name
            .insert(PROJECT_ROOT_SOURCE_NAME.to_string(), project.clone());
        map.queue.push_back(project);

        let errors = map.drain_queue()?;
        if errors.is_empty() {
            Ok(map)
        } else {
            Err(PackageMapError::Remappings(errors))
        }
    }

    /// The root package of the workspace.
    #[must_use]
    pub fn project_package(&self) -> &Arc<Package> {
        &self.project
    }

    /// The package's resolved user remappings, in parse order: nested
    /// remapping files first, the package-root file last.
    #[must_use]
    pub fn user_remappings(&self, package: &Package) -> &[Arc<UserRemapping>] {
        self.user_remappings
            .get(&package.root_source_name)
            .map_or(&[], Vec::as_slice)
    }

    /// Find the package whose source-name root prefixes `source_name`.
    #[must_use]
    pub fn package_for_source_name(&self, source_name: &str) -> Option<Arc<Package>> {
        let mut best: Option<&Arc<Package>> = None;
        for (root, package) in &self.by_source_name {
            let matches = source_name == root
                || (source_name.starts_with(root.as_str())
                    && source_name.as_bytes().get(root.len()) == Some(&b'/'));
            if matches && best.is_none_or(|b| root.len() > b.root_source_name.len()) {
                best = Some(package);
            }
        }
        best.cloned()
    }

    /// Resolve (loading if necessary) the dependency installed under
    /// `installation_name` as seen from `from`, then drain any packages
    /// the load enqueued so their remappings are ready before imports
    /// into them are served.
    ///
    /// `Ok(None)` means no such installation exists.
    pub fn resolve_dependency_by_installation_name(
        &mut self,
        from: &Arc<Package>,
        installation_name: &str,
    ) -> Result<Option<DependencyResolution>, Bug> {
        let Some((package, generated_remapping)) =
            self.resolve_installed_dependency(from, installation_name)?
        else {
            return Ok(None);
        };

        self.drain_queue()?;

        let remapping_errors = self
            .remapping_errors
            .get(&package.root_source_name)
            .cloned()
            .unwrap_or_default();
        Ok(Some(DependencyResolution {
            package,
            generated_remapping,
            remapping_errors,
        }))
    }

    /// A remapping targeting one exact file of an npm package. Used
    /// when exports rewriting changed the subpath, so the edge's
    /// generic installation remapping would not describe the result.
    #[must_use]
    pub fn generate_remapping_into_npm_file(
        from: &Package,
        direct_import: &str,
        source_name: &str,
    ) -> Remapping {
        Remapping {
            context: format!("{}/", from.root_source_name),
            prefix: direct_import.to_string(),
            target: source_name.to_string(),
        }
    }

    /// Process queued packages FIFO until none remain, recording each
    /// package's remappings and returning every error in order.
    fn drain_queue(&mut self) -> Result<Vec<UserRemappingError>, Bug> {
        let mut all_errors = Vec::new();
        while let Some(package) = self.queue.pop_front() {
            let errors = self.load_package_remappings(&package)?;
            all_errors.extend_from_slice(&errors);
            self.remapping_errors
                .insert(package.root_source_name.clone(), errors);
        }
        Ok(all_errors)
    }

    fn load_package_remappings(
        &mut self,
        package: &Arc<Package>,
    ) -> Result<Vec<UserRemappingError>, Bug> {
        let files = find_remapping_files(&package.root_fs_path)?;
        let mut resolved = Vec::new();
        let mut errors = Vec::new();

        for file in files {
            debug!(file = %file.display(), package = %package.root_source_name, "Reading remappings");
            let text = std::fs::read_to_string(&file).map_err(|e| Bug::io(&file, &e))?;

            for raw_line in text.split('\n') {
                let line = raw_line.trim_matches(|c| c == ' ' || c == '\t' || c == '\r');
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                match self.validate_and_resolve_line(package, &file, line)? {
                    LineOutcome::Resolved(remapping) => resolved.push(Arc::new(remapping)),
                    LineOutcome::Noop => {}
                    LineOutcome::Invalid(error) => errors.push(error),
                }
            }
        }

        self.user_remappings
            .insert(package.root_source_name.clone(), resolved);
        Ok(errors)
    }

    /// Validate one trimmed, non-comment line and rewrite it to
    /// canonical source-name prefixes.
    fn validate_and_resolve_line(
        &mut self,
        package: &Arc<Package>,
        file: &Path,
        line: &str,
    ) -> Result<LineOutcome, Bug> {
        let Some(raw) = parse_remapping_line(line) else {
            return Ok(LineOutcome::Invalid(UserRemappingError::InvalidSyntax {
                path: file.to_path_buf(),
                remapping: line.to_string(),
            }));
        };

        if !raw.prefix.ends_with('/')
            || !raw.target.ends_with('/')
            || (!raw.context.is_empty() && !raw.context.ends_with('/'))
        {
            return Ok(LineOutcome::Invalid(
                UserRemappingError::WithoutSlashEndings {
                    path: file.to_path_buf(),
                    remapping: line.to_string(),
                },
            ));
        }

        // Source-name prefix of the directory the remappings file
        // lives in, always slash-terminated.
        let subdir = file
            .parent()
            .and_then(|parent| parent.strip_prefix(&package.root_fs_path).ok())
            .ok_or_else(|| {
                Bug::new(format!(
                    "remappings file {} outside its package {}",
                    file.display(),
                    package.root_fs_path.display()
                ))
            })?;
        let subdir_fragment = source_name::fs_path_to_source_name(subdir);
        let context_path = format!(
            "{}/",
            source_name::join([package.root_source_name.as_str(), subdir_fragment.as_str()])
        );

        // Fragments that already use a canonical npm prefix are kept
        // verbatim; everything else is anchored at the file's context.
        let rewrite = |fragment: &str| -> String {
            if fragment.starts_with(NPM_SOURCE_NAME_PREFIX) {
                fragment.to_string()
            } else {
                format!("{context_path}{fragment}")
            }
        };

        let Some(stripped) = raw.target.strip_prefix("node_modules/") else {
            return Ok(LineOutcome::Resolved(UserRemapping {
                context: rewrite(&raw.context),
                prefix: raw.prefix,
                target: rewrite(&raw.target),
                original_format: line.to_string(),
                source: file.to_path_buf(),
                target_npm_package: None,
            }));
        };

        let Some((installation_name, rest)) = parse_module_name(stripped) else {
            return Ok(LineOutcome::Invalid(UserRemappingError::InvalidSyntax {
                path: file.to_path_buf(),
                remapping: line.to_string(),
            }));
        };
        let remainder = rest.trim_start_matches('/');

        // `foo/=node_modules/foo/` restates the generic installation
        // remapping; dropped before any installation lookup.
        let generic_form = format!("{installation_name}/");
        if raw.prefix == generic_form && stripped == generic_form {
            return Ok(LineOutcome::Noop);
        }

        let Some((dependency, _)) = self.resolve_installed_dependency(package, installation_name)?
        else {
            return Ok(LineOutcome::Invalid(
                UserRemappingError::ToUninstalledPackage {
                    path: file.to_path_buf(),
                    remapping: line.to_string(),
                    installation_name: installation_name.to_string(),
                },
            ));
        };

        let target = format!("{}/{remainder}", dependency.root_source_name);
        Ok(LineOutcome::Resolved(UserRemapping {
            context: rewrite(&raw.context),
            prefix: raw.prefix,
            target,
            original_format: line.to_string(),
            source: file.to_path_buf(),
            target_npm_package: Some(NpmRemappingTarget {
                installation_name: installation_name.to_string(),
                package: dependency,
            }),
        }))
    }

    /// Locate (or reuse) the dependency installed under
    /// `installation_name` and record the installation edge.
    fn resolve_installed_dependency(
        &mut self,
        from: &Arc<Package>,
        installation_name: &str,
    ) -> Result<Option<(Arc<Package>, Remapping)>, Bug> {
        if let Some(edge) = self
            .installations
            .get(&from.root_source_name)
            .and_then(|edges| edges.get(installation_name))
        {
            return Ok(Some((
                edge.package.clone(),
                edge.generated_remapping.clone(),
            )));
        }

        let Some(manifest_path) = find_dependency_manifest(&from.root_fs_path, installation_name)
        else {
            return Ok(None);
        };
        // Symlinked installs (monorepo workspaces) resolve to their
        // real location so every installation path of one physical
        // package yields the same identity.
        let manifest_path =
            std::fs::canonicalize(&manifest_path).map_err(|e| Bug::io(&manifest_path, &e))?;
        let package = self.package_for_manifest(&manifest_path, installation_name)?;

        let generated_remapping = Remapping {
            context: format!("{}/", from.root_source_name),
            prefix: format!("{installation_name}/"),
            target: format!("{}/", package.root_source_name),
        };
        self.installations
            .entry(from.root_source_name.clone())
            .or_default()
            .insert(
                installation_name.to_string(),
                InstallationEdge {
                    package: package.clone(),
                    generated_remapping: generated_remapping.clone(),
                },
            );

        Ok(Some((package, generated_remapping)))
    }

    /// Canonical package for a (real) manifest path, creating and
    /// enqueueing it on first sight.
    fn package_for_manifest(
        &mut self,
        manifest_path: &Path,
        installation_name: &str,
    ) -> Result<Arc<Package>, Bug> {
        if manifest_path == self.project_manifest_path {
            return Ok(self.project.clone());
        }

        let root_fs_path = manifest_path
            .parent()
            .ok_or_else(|| Bug::new(format!("manifest without parent: {}", manifest_path.display())))?
            .to_path_buf();
        let manifest = read_manifest(manifest_path)?;

        // A package that is neither installed under node_modules nor
        // part of the project tree lives in the surrounding monorepo.
        let is_local = !fsutil::contains_node_modules(manifest_path)
            && !manifest_path.starts_with(&self.project_root);
        let name = manifest
            .name
            .unwrap_or_else(|| installation_name.to_string());
        let version = if is_local {
            LOCAL_VERSION_SENTINEL.to_string()
        } else {
            manifest.version.ok_or_else(|| {
                Bug::new(format!(
                    "package.json without version at {}",
                    manifest_path.display()
                ))
            })?
        };

        let root_source_name = npm_root_source_name(&name, &version);
        if let Some(existing) = self.by_source_name.get(&root_source_name) {
            return Ok(existing.clone());
        }

        let package = Arc::new(Package {
            name,
            version,
            root_fs_path,
            root_source_name: root_source_name.clone(),
            exports: manifest.exports,
        });
        debug!(
            package = %package.root_source_name,
            path = %package.root_fs_path.display(),
            "Loaded dependency package"
        );
        self.by_source_name.insert(root_source_name, package.clone());
        self.queue.push_back(package.clone());
        Ok(package)
    }
}

/// Every `remappings.txt` of a package outside `node_modules`,
/// deterministically ordered: nested files first (sorted walk order),
/// the package-root file last.
fn find_remapping_files(root: &Path) -> Result<Vec<PathBuf>, Bug> {
    let mut nested = Vec::new();
    let mut top_level = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !(entry.file_type().is_dir() && entry.file_name() == NODE_MODULES));

    for entry in walker {
        let entry =
            entry.map_err(|e| Bug::new(format!("walk failed under {}: {e}", root.display())))?;
        if entry.file_type().is_file() && entry.file_name() == REMAPPINGS_FILE_NAME {
            if entry.depth() == 1 {
                top_level.push(entry.into_path());
            } else {
                nested.push(entry.into_path());
            }
        }
    }

    nested.extend(top_level);
    Ok(nested)
}

/// Standard node-module lookup: walk ancestor directories probing
/// `node_modules/<installation name>/package.json`.
fn find_dependency_manifest(start: &Path, installation_name: &str) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir
            .join(NODE_MODULES)
            .join(source_name::source_name_to_fs_path(installation_name))
            .join("package.json");
        if candidate.is_file() {
            return Some(candidate);
        }
        current = dir.parent();
    }
    None
}

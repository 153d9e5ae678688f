//! Import resolver.
//!
//! Owns the package map and the `sourceName → ResolvedFile` intern
//! table. Classifies imports (relative, direct-local, npm), applies the
//! best user remapping, validates paths on disk with their true casing,
//! and returns resolved-file records or structured errors. A single
//! async mutex serializes every public operation: resolving one file
//! may load new packages whose remappings must settle before any other
//! resolution observes the map.

use crate::analyzer::{analyze_source, FileContent};
use crate::error::Bug;
use crate::fsutil::{self, TrueCase};
use crate::packages::{
    parse_module_name, resolve_exports, Package, PackageMapError, RemappedPackageMap,
    PROJECT_ROOT_SOURCE_NAME,
};
use crate::remappings::{select_remapping, Remapping};
use crate::resolver::errors::{ImportError, NpmRootError, ProjectRootError};
use crate::source_name;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Import that always gets a targeted remapping, so tooling sees an
/// exact source name for the console-logging shim.
const CONSOLE_LOG_IMPORT: &str = "hardhat/console.sol";

/// Name of the in-memory stand-in file used when a compilation root is
/// a bare npm module string. Never written to disk, never interned.
const NPM_ROOT_IMPORTER_FILE: &str = "__npm-module-root__.sol";

/// A successfully resolved source file.
///
/// Interned by source name on first resolution and never mutated; the
/// owning package tells project files from npm package files.
#[derive(Debug)]
pub struct ResolvedFile {
    /// Canonical `/`-separated identifier.
    pub source_name: String,
    /// Absolute on-disk path, true-cased.
    pub fs_path: PathBuf,
    pub content: FileContent,
    pub package: Arc<Package>,
}

impl ResolvedFile {
    #[must_use]
    pub fn is_project_file(&self) -> bool {
        self.package.is_project()
    }
}

/// A resolved import or npm-root module, with the remapping that
/// downstream tooling needs to reproduce the resolution.
#[derive(Debug)]
pub struct ResolvedImport {
    pub file: Arc<ResolvedFile>,
    pub remapping: Option<Remapping>,
}

struct ResolverState {
    map: RemappedPackageMap,
    files: FxHashMap<String, Arc<ResolvedFile>>,
}

/// Resolves Solidity files to canonical source names.
pub struct Resolver {
    state: Mutex<ResolverState>,
}

impl Resolver {
    /// Build a resolver over the workspace rooted at `project_root`.
    ///
    /// Fails with the full list of remapping errors when any
    /// `remappings.txt` in the tree is invalid.
    pub fn new(project_root: &Path) -> Result<Self, PackageMapError> {
        let map = RemappedPackageMap::load(project_root)?;
        Ok(Self {
            state: Mutex::new(ResolverState {
                map,
                files: FxHashMap::default(),
            }),
        })
    }

    /// Resolve an absolute path inside the project as a compilation
    /// root.
    pub async fn resolve_project_file(
        &self,
        fs_path: &Path,
    ) -> Result<Arc<ResolvedFile>, ProjectRootError> {
        let mut state = self.state.lock().await;
        let project = state.map.project_package().clone();
        let project_root = project.root_fs_path.clone();

        let Ok(relative) = fs_path.strip_prefix(&project_root) else {
            return Err(ProjectRootError::NotInProject {
                fs_path: fs_path.to_path_buf(),
            });
        };
        if fsutil::contains_node_modules(relative) {
            return Err(ProjectRootError::InNodeModules {
                fs_path: fs_path.to_path_buf(),
            });
        }

        // First cache probe with the caller's casing; a hit avoids the
        // true-case lookup entirely.
        let requested_fragment = source_name::fs_path_to_source_name(relative);
        let requested_source_name =
            source_name::join([PROJECT_ROOT_SOURCE_NAME, requested_fragment.as_str()]);
        if let Some(file) = state.files.get(&requested_source_name) {
            return Ok(file.clone());
        }

        match fsutil::true_case_relative(&project_root, relative).map_err(ProjectRootError::Bug)? {
            TrueCase::Missing | TrueCase::Found { is_file: false, .. } => {
                Err(ProjectRootError::DoesntExist {
                    fs_path: fs_path.to_path_buf(),
                })
            }
            TrueCase::Found { relative, .. } => {
                // Project roots are normalized to the true casing; no
                // casing error exists for them.
                let true_fragment = source_name::fs_path_to_source_name(&relative);
                let true_source_name =
                    source_name::join([PROJECT_ROOT_SOURCE_NAME, true_fragment.as_str()]);
                if let Some(file) = state.files.get(&true_source_name) {
                    return Ok(file.clone());
                }
                let fs_path = project_root.join(&relative);
                intern_file(&mut state, true_source_name, project, fs_path)
                    .map_err(ProjectRootError::Bug)
            }
        }
    }

    /// Resolve a bare npm module string (`@scope/pkg/path/File.sol`)
    /// as a compilation root.
    pub async fn resolve_npm_dependency_file_as_root(
        &self,
        npm_module: &str,
    ) -> Result<ResolvedImport, NpmRootError> {
        let mut state = self.state.lock().await;

        // Anything that classifies as relative or absolute can never be
        // an npm module.
        if npm_module.contains('\\')
            || npm_module.starts_with("./")
            || npm_module.starts_with("../")
            || npm_module.starts_with('/')
        {
            return Err(NpmRootError::NameWithInvalidFormat {
                module: npm_module.to_string(),
            });
        }

        let project = state.map.project_package().clone();
        let stand_in = Arc::new(ResolvedFile {
            source_name: source_name::join([PROJECT_ROOT_SOURCE_NAME, NPM_ROOT_IMPORTER_FILE]),
            fs_path: project.root_fs_path.join(NPM_ROOT_IMPORTER_FILE),
            content: FileContent {
                text: String::new(),
                import_paths: vec![npm_module.to_string()],
                version_pragmas: Vec::new(),
            },
            package: project,
        });

        match resolve_import_locked(&mut state, &stand_in, npm_module) {
            Ok(resolved) => {
                if resolved.file.is_project_file() {
                    // A user remapping steered the module back into the
                    // project.
                    Err(NpmRootError::ResolvesToProjectFile {
                        module: npm_module.to_string(),
                        source_name: resolved.file.source_name.clone(),
                    })
                } else {
                    Ok(resolved)
                }
            }
            Err(error) => Err(npm_root_error_from_import(npm_module, error)),
        }
    }

    /// Resolve an import string appearing in `from`.
    pub async fn resolve_import(
        &self,
        from: &Arc<ResolvedFile>,
        import_path: &str,
    ) -> Result<ResolvedImport, ImportError> {
        let mut state = self.state.lock().await;
        resolve_import_locked(&mut state, from, import_path)
    }
}

fn resolve_import_locked(
    state: &mut ResolverState,
    from: &Arc<ResolvedFile>,
    import_path: &str,
) -> Result<ResolvedImport, ImportError> {
    debug!(from = %from.source_name, import = import_path, "Resolving import");

    if import_path.contains('\\') {
        return Err(ImportError::WindowsPathSeparators {
            import_path: import_path.to_string(),
        });
    }

    let is_relative = import_path.starts_with("./") || import_path.starts_with("../");

    let direct_import = if is_relative {
        let package_prefix = format!("{}/", from.package.root_source_name);
        match source_name::apply_relative(source_name::dirname(&from.source_name), import_path) {
            Some(joined) if joined.starts_with(&package_prefix) => joined,
            _ => {
                return Err(ImportError::IllegalRelativeImport {
                    import_path: import_path.to_string(),
                    from_source_name: from.source_name.clone(),
                })
            }
        }
    } else {
        import_path.to_string()
    };

    let best = select_remapping(
        state.map.user_remappings(&from.package),
        &from.source_name,
        &direct_import,
    )
    .cloned();

    if let Some(user_remapping) = best {
        if is_relative {
            // A remapping that rewrites a relative import means the
            // remapping set is broken, not the import.
            return Err(ImportError::Bug(Bug::new(format!(
                "user remapping `{}` matched relative import `{import_path}`",
                user_remapping.original_format
            ))));
        }

        let remapped = user_remapping.as_remapping().apply(&direct_import);
        let package = match &user_remapping.target_npm_package {
            Some(npm_target) => npm_target.package.clone(),
            None => match state.map.package_for_source_name(&remapped) {
                Some(package) => package,
                None => {
                    return Err(ImportError::DoesntExist {
                        import_path: import_path.to_string(),
                        suggested_remapping: None,
                    })
                }
            },
        };
        return validate_and_intern(
            state,
            &remapped,
            package,
            Some(user_remapping.as_remapping()),
            import_path,
        );
    }

    if is_relative {
        return validate_and_intern(state, &direct_import, from.package.clone(), None, import_path);
    }

    match resolve_npm_import(state, from, import_path, &direct_import) {
        Err(
            error @ (ImportError::OfUninstalledPackage { .. }
            | ImportError::InvalidNpmSyntax { .. }),
        ) => {
            // The import may name a project-local file without `./`,
            // which is disallowed; report it with the remapping that
            // would make it work instead of the npm failure.
            match direct_local_suggestion(from, import_path) {
                Some(suggestion) => Err(ImportError::DoesntExist {
                    import_path: import_path.to_string(),
                    suggested_remapping: Some(suggestion),
                }),
                None => Err(error),
            }
        }
        other => other,
    }
}

/// Resolve a direct import through the npm dependency graph.
fn resolve_npm_import(
    state: &mut ResolverState,
    from: &Arc<ResolvedFile>,
    import_path: &str,
    direct_import: &str,
) -> Result<ResolvedImport, ImportError> {
    let Some((installation_name, rest)) = parse_module_name(direct_import) else {
        return Err(ImportError::InvalidNpmSyntax {
            import_path: import_path.to_string(),
        });
    };
    let subpath = rest.trim_start_matches('/');
    if subpath.is_empty() {
        // A bare package name is not a file.
        return Err(ImportError::InvalidNpmSyntax {
            import_path: import_path.to_string(),
        });
    }

    let Some(resolution) = state
        .map
        .resolve_dependency_by_installation_name(&from.package, installation_name)?
    else {
        return Err(ImportError::OfUninstalledPackage {
            import_path: import_path.to_string(),
            installation_name: installation_name.to_string(),
        });
    };
    if !resolution.remapping_errors.is_empty() {
        return Err(ImportError::OfNpmPackageWithRemappingErrors {
            import_path: import_path.to_string(),
            errors: resolution.remapping_errors,
        });
    }
    let dependency = resolution.package;

    let exports_subpath = match &dependency.exports {
        Some(exports) => match resolve_exports(exports, &format!("./{subpath}")) {
            Some(target) => Some(target.trim_start_matches("./").to_string()),
            None => {
                return Err(ImportError::OfNonExportedNpmFile {
                    import_path: import_path.to_string(),
                })
            }
        },
        None => None,
    };

    let subpath_changed = exports_subpath.as_deref().is_some_and(|mapped| mapped != subpath);
    let final_subpath = exports_subpath.unwrap_or_else(|| subpath.to_string());
    let source_name =
        source_name::join([dependency.root_source_name.as_str(), final_subpath.as_str()]);

    // The generic installation remapping only describes unchanged
    // subpaths; an exports rewrite (and console.sol) needs a remapping
    // targeting the exact file.
    let remapping = if subpath_changed || direct_import == CONSOLE_LOG_IMPORT {
        RemappedPackageMap::generate_remapping_into_npm_file(
            &from.package,
            direct_import,
            &source_name,
        )
    } else {
        resolution.generated_remapping
    };

    validate_and_intern(state, &source_name, dependency, Some(remapping), import_path)
}

/// True-case validate `source_name_str` under its package and intern
/// the file, reusing a cached resolution when present.
fn validate_and_intern(
    state: &mut ResolverState,
    source_name_str: &str,
    package: Arc<Package>,
    remapping: Option<Remapping>,
    import_path: &str,
) -> Result<ResolvedImport, ImportError> {
    if let Some(file) = state.files.get(source_name_str) {
        return Ok(ResolvedImport {
            file: file.clone(),
            remapping,
        });
    }

    let package_prefix = format!("{}/", package.root_source_name);
    let Some(relative_source_name) = source_name_str.strip_prefix(&package_prefix) else {
        return Err(ImportError::Bug(Bug::new(format!(
            "source name {source_name_str} outside package {}",
            package.root_source_name
        ))));
    };
    let requested = source_name::source_name_to_fs_path(relative_source_name);

    match fsutil::true_case_relative(&package.root_fs_path, &requested)? {
        TrueCase::Missing | TrueCase::Found { is_file: false, .. } => {
            Err(ImportError::DoesntExist {
                import_path: import_path.to_string(),
                suggested_remapping: None,
            })
        }
        TrueCase::Found {
            relative,
            casing_differs: true,
            ..
        } => Err(ImportError::InvalidCasing {
            import_path: import_path.to_string(),
            correct_casing: source_name::fs_path_to_source_name(&relative),
        }),
        TrueCase::Found { relative, .. } => {
            let fs_path = package.root_fs_path.join(&relative);
            let file = intern_file(state, source_name_str.to_string(), package, fs_path)?;
            Ok(ResolvedImport { file, remapping })
        }
    }
}

/// Read, analyze, and intern a validated file.
fn intern_file(
    state: &mut ResolverState,
    source_name: String,
    package: Arc<Package>,
    fs_path: PathBuf,
) -> Result<Arc<ResolvedFile>, Bug> {
    let text = std::fs::read_to_string(&fs_path).map_err(|e| Bug::io(&fs_path, &e))?;
    let content = analyze_source(text);
    debug!(source_name = %source_name, path = %fs_path.display(), "Resolved file");

    let file = Arc::new(ResolvedFile {
        source_name: source_name.clone(),
        fs_path,
        content,
        package,
    });
    state.files.insert(source_name, file.clone());
    Ok(file)
}

/// Look for the literal import path in the importing file's ancestor
/// directories (up to its package root). A hit means the user wrote a
/// project-local import without `./`; the returned line is the
/// remapping that would make it resolve.
fn direct_local_suggestion(from: &Arc<ResolvedFile>, import_path: &str) -> Option<String> {
    let package_root = &from.package.root_fs_path;
    let import_relative = source_name::source_name_to_fs_path(import_path);

    let mut dir = from.fs_path.parent();
    while let Some(current) = dir {
        let candidate = current.join(&import_relative);
        if candidate.is_file() {
            let relative = candidate.strip_prefix(package_root).ok()?;
            let relative_fragment = source_name::fs_path_to_source_name(relative);
            let target = source_name::join([
                from.package.root_source_name.as_str(),
                relative_fragment.as_str(),
            ]);
            let remapping = Remapping {
                context: format!("{}/", from.package.root_source_name),
                prefix: import_path.to_string(),
                target,
            };
            return Some(remapping.format());
        }
        if current == package_root {
            break;
        }
        dir = current.parent();
    }
    None
}

/// Map an import failure onto the npm-root taxonomy.
fn npm_root_error_from_import(module: &str, error: ImportError) -> NpmRootError {
    let module = module.to_string();
    match error {
        ImportError::InvalidNpmSyntax { .. } | ImportError::WindowsPathSeparators { .. } => {
            NpmRootError::NameWithInvalidFormat { module }
        }
        ImportError::OfUninstalledPackage {
            installation_name, ..
        } => NpmRootError::OfUninstalledPackage {
            module,
            installation_name,
        },
        ImportError::OfNpmPackageWithRemappingErrors { errors, .. } => {
            NpmRootError::OfPackageWithRemappingErrors { module, errors }
        }
        ImportError::DoesntExist { .. } => NpmRootError::DoesntExistWithinItsPackage { module },
        ImportError::InvalidCasing { correct_casing, .. } => NpmRootError::WithIncorrectCasing {
            module,
            correct_casing,
        },
        ImportError::OfNonExportedNpmFile { .. } => NpmRootError::NonExportedFile { module },
        // The stand-in importer never produces relative imports.
        ImportError::IllegalRelativeImport { .. } => NpmRootError::Bug(Bug::new(
            "relative import produced while resolving an npm root module",
        )),
        ImportError::Bug(bug) => NpmRootError::Bug(bug),
    }
}

//! Resolution error taxonomies.
//!
//! Every failure a public resolver operation can report is a variant of
//! one of these closed enums, each carrying the structured fields the
//! failure is about. The string codes are stable API.

use crate::error::Bug;
use crate::remappings::UserRemappingError;
use std::path::PathBuf;
use thiserror::Error;

/// Stable error codes for resolution failures.
pub mod codes {
    pub const PROJECT_ROOT_FILE_NOT_IN_PROJECT: &str = "PROJECT_ROOT_FILE_NOT_IN_PROJECT";
    pub const PROJECT_ROOT_FILE_DOESNT_EXIST: &str = "PROJECT_ROOT_FILE_DOESNT_EXIST";
    pub const PROJECT_ROOT_FILE_IN_NODE_MODULES: &str = "PROJECT_ROOT_FILE_IN_NODE_MODULES";

    pub const NPM_ROOT_FILE_NAME_WITH_INVALID_FORMAT: &str =
        "NPM_ROOT_FILE_NAME_WITH_INVALID_FORMAT";
    pub const NPM_ROOT_FILE_RESOLVES_TO_PROJECT_FILE: &str =
        "NPM_ROOT_FILE_RESOLVES_TO_PROJECT_FILE";
    pub const NPM_ROOT_FILE_OF_UNINSTALLED_PACKAGE: &str = "NPM_ROOT_FILE_OF_UNINSTALLED_PACKAGE";
    pub const NPM_ROOT_FILE_OF_PACKAGE_WITH_REMAPPING_ERRORS: &str =
        "NPM_ROOT_FILE_OF_PACKAGE_WITH_REMAPPING_ERRORS";
    pub const NPM_ROOT_FILE_DOESNT_EXIST_WITHIN_ITS_PACKAGE: &str =
        "NPM_ROOT_FILE_DOESNT_EXIST_WITHIN_ITS_PACKAGE";
    pub const NPM_ROOT_FILE_WITH_INCORRRECT_CASING: &str = "NPM_ROOT_FILE_WITH_INCORRRECT_CASING";
    pub const NPM_ROOT_FILE_NON_EXPORTED_FILE: &str = "NPM_ROOT_FILE_NON_EXPORTED_FILE";

    pub const IMPORT_WITH_WINDOWS_PATH_SEPARATORS: &str = "IMPORT_WITH_WINDOWS_PATH_SEPARATORS";
    pub const ILLEGAL_RELATIVE_IMPORT: &str = "ILLEGAL_RELATIVE_IMPORT";
    pub const IMPORT_DOESNT_EXIST: &str = "IMPORT_DOESNT_EXIST";
    pub const IMPORT_INVALID_CASING: &str = "IMPORT_INVALID_CASING";
    pub const IMPORT_WITH_INVALID_NPM_SYNTAX: &str = "IMPORT_WITH_INVALID_NPM_SYNTAX";
    pub const IMPORT_OF_UNINSTALLED_PACKAGE: &str = "IMPORT_OF_UNINSTALLED_PACKAGE";
    pub const IMPORT_OF_NPM_PACKAGE_WITH_REMAPPING_ERRORS: &str =
        "IMPORT_OF_NPM_PACKAGE_WITH_REMAPPING_ERRORS";
    pub const IMPORT_OF_NON_EXPORTED_NPM_FILE: &str = "IMPORT_OF_NON_EXPORTED_NPM_FILE";

    /// Code reported by the internal-invariant channel, outside the
    /// resolution taxonomies.
    pub const INVARIANT_VIOLATION: &str = "INVARIANT_VIOLATION";
}

/// Failure to resolve an absolute path as a compilation root.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectRootError {
    #[error("file {} is not inside the project", fs_path.display())]
    NotInProject { fs_path: PathBuf },

    #[error("file {} does not exist", fs_path.display())]
    DoesntExist { fs_path: PathBuf },

    #[error("file {} is inside node_modules", fs_path.display())]
    InNodeModules { fs_path: PathBuf },

    #[error(transparent)]
    Bug(#[from] Bug),
}

impl ProjectRootError {
    /// Stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotInProject { .. } => codes::PROJECT_ROOT_FILE_NOT_IN_PROJECT,
            Self::DoesntExist { .. } => codes::PROJECT_ROOT_FILE_DOESNT_EXIST,
            Self::InNodeModules { .. } => codes::PROJECT_ROOT_FILE_IN_NODE_MODULES,
            Self::Bug(_) => codes::INVARIANT_VIOLATION,
        }
    }
}

/// Failure to resolve a bare npm module string as a compilation root.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NpmRootError {
    #[error("`{module}` is not a valid npm module")]
    NameWithInvalidFormat { module: String },

    #[error("`{module}` resolves to project file {source_name}")]
    ResolvesToProjectFile { module: String, source_name: String },

    #[error("`{module}` names uninstalled package `{installation_name}`")]
    OfUninstalledPackage {
        module: String,
        installation_name: String,
    },

    #[error("`{module}` is in a package with {} invalid remapping line(s)", errors.len())]
    OfPackageWithRemappingErrors {
        module: String,
        errors: Vec<UserRemappingError>,
    },

    #[error("`{module}` does not exist within its package")]
    DoesntExistWithinItsPackage { module: String },

    #[error("`{module}` exists with different casing: {correct_casing}")]
    WithIncorrectCasing {
        module: String,
        correct_casing: String,
    },

    #[error("`{module}` is not exported by its package")]
    NonExportedFile { module: String },

    #[error(transparent)]
    Bug(#[from] Bug),
}

impl NpmRootError {
    /// Stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NameWithInvalidFormat { .. } => codes::NPM_ROOT_FILE_NAME_WITH_INVALID_FORMAT,
            Self::ResolvesToProjectFile { .. } => codes::NPM_ROOT_FILE_RESOLVES_TO_PROJECT_FILE,
            Self::OfUninstalledPackage { .. } => codes::NPM_ROOT_FILE_OF_UNINSTALLED_PACKAGE,
            Self::OfPackageWithRemappingErrors { .. } => {
                codes::NPM_ROOT_FILE_OF_PACKAGE_WITH_REMAPPING_ERRORS
            }
            Self::DoesntExistWithinItsPackage { .. } => {
                codes::NPM_ROOT_FILE_DOESNT_EXIST_WITHIN_ITS_PACKAGE
            }
            Self::WithIncorrectCasing { .. } => codes::NPM_ROOT_FILE_WITH_INCORRRECT_CASING,
            Self::NonExportedFile { .. } => codes::NPM_ROOT_FILE_NON_EXPORTED_FILE,
            Self::Bug(_) => codes::INVARIANT_VIOLATION,
        }
    }
}

/// Failure to resolve an import appearing in a resolved file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("import `{import_path}` uses windows path separators")]
    WindowsPathSeparators { import_path: String },

    #[error("relative import `{import_path}` escapes its package (from {from_source_name})")]
    IllegalRelativeImport {
        import_path: String,
        from_source_name: String,
    },

    #[error("import `{import_path}` does not exist")]
    DoesntExist {
        import_path: String,
        /// When the file exists locally but was imported without a
        /// `./` prefix, the `context:prefix=target` line that would
        /// make the import resolve.
        suggested_remapping: Option<String>,
    },

    #[error("import `{import_path}` exists with different casing: {correct_casing}")]
    InvalidCasing {
        import_path: String,
        correct_casing: String,
    },

    #[error("import `{import_path}` is not a valid npm module path")]
    InvalidNpmSyntax { import_path: String },

    #[error("import `{import_path}` names uninstalled package `{installation_name}`")]
    OfUninstalledPackage {
        import_path: String,
        installation_name: String,
    },

    #[error("import `{import_path}` is in a package with {} invalid remapping line(s)", errors.len())]
    OfNpmPackageWithRemappingErrors {
        import_path: String,
        errors: Vec<UserRemappingError>,
    },

    #[error("import `{import_path}` is not exported by its package")]
    OfNonExportedNpmFile { import_path: String },

    #[error(transparent)]
    Bug(#[from] Bug),
}

impl ImportError {
    /// Stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::WindowsPathSeparators { .. } => codes::IMPORT_WITH_WINDOWS_PATH_SEPARATORS,
            Self::IllegalRelativeImport { .. } => codes::ILLEGAL_RELATIVE_IMPORT,
            Self::DoesntExist { .. } => codes::IMPORT_DOESNT_EXIST,
            Self::InvalidCasing { .. } => codes::IMPORT_INVALID_CASING,
            Self::InvalidNpmSyntax { .. } => codes::IMPORT_WITH_INVALID_NPM_SYNTAX,
            Self::OfUninstalledPackage { .. } => codes::IMPORT_OF_UNINSTALLED_PACKAGE,
            Self::OfNpmPackageWithRemappingErrors { .. } => {
                codes::IMPORT_OF_NPM_PACKAGE_WITH_REMAPPING_ERRORS
            }
            Self::OfNonExportedNpmFile { .. } => codes::IMPORT_OF_NON_EXPORTED_NPM_FILE,
            Self::Bug(_) => codes::INVARIANT_VIOLATION,
        }
    }
}

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]

pub mod analyzer;
pub mod error;
pub mod fsutil;
pub mod packages;
pub mod remappings;
pub mod resolver;
pub mod source_name;

pub use analyzer::{analyze_source, FileContent};
pub use error::Bug;
pub use packages::{Package, PackageMapError, RemappedPackageMap};
pub use remappings::{Remapping, UserRemapping, UserRemappingError};
pub use resolver::{
    ImportError, NpmRootError, ProjectRootError, ResolvedFile, ResolvedImport, Resolver,
};

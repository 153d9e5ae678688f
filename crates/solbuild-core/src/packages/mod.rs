//! Package discovery and the remapped package map.

mod exports;
mod map;
mod package;

pub use exports::resolve_exports;
pub use map::{
    DependencyResolution, PackageMapError, RemappedPackageMap, REMAPPINGS_FILE_NAME,
};
pub use package::{
    npm_root_source_name, parse_module_name, read_manifest, Package, PackageManifest,
    LOCAL_VERSION_SENTINEL, NPM_SOURCE_NAME_PREFIX, PROJECT_ROOT_SOURCE_NAME,
};

//! Workspace-fixture tests for the remapped package map.

use solbuild_core::packages::RemappedPackageMap;
use solbuild_core::remappings::UserRemappingError;
use solbuild_core::{Package, PackageMapError};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

/// A project fixture rooted at a canonical temp path.
struct Project {
    _dir: TempDir,
    root: PathBuf,
}

impl Project {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        fs::write(
            root.join("package.json"),
            r#"{"name": "top-level-remappings", "version": "1.2.4"}"#,
        )
        .unwrap();
        Self { _dir: dir, root }
    }

    fn write(&self, relative: &str, content: &str) -> &Self {
        let path = self.root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        self
    }

    fn install(&self, installation_name: &str, name: &str, version: &str) -> &Self {
        let manifest = self
            .root
            .join("node_modules")
            .join(Path::new(installation_name))
            .join("package.json");
        fs::create_dir_all(manifest.parent().unwrap()).unwrap();
        fs::write(
            manifest,
            format!(r#"{{"name": "{name}", "version": "{version}"}}"#),
        )
        .unwrap();
        self
    }

    fn load(&self) -> Result<RemappedPackageMap, PackageMapError> {
        RemappedPackageMap::load(&self.root)
    }
}

#[test]
fn top_level_remappings_rewritten_to_project_prefixes() {
    let project = Project::new();
    project.write("remappings.txt", "foo/=bar/\n\n context/:prefix/=target/\n");

    let map = project.load().unwrap();
    let remappings = map.user_remappings(map.project_package());
    assert_eq!(remappings.len(), 2);

    assert_eq!(remappings[0].context, "project/");
    assert_eq!(remappings[0].prefix, "foo/");
    assert_eq!(remappings[0].target, "project/bar/");
    assert_eq!(remappings[0].original_format, "foo/=bar/");
    assert_eq!(remappings[0].source, project.root.join("remappings.txt"));
    assert!(remappings[0].target_npm_package.is_none());

    assert_eq!(remappings[1].context, "project/context/");
    assert_eq!(remappings[1].prefix, "prefix/");
    assert_eq!(remappings[1].target, "project/target/");
    assert_eq!(remappings[1].original_format, "context/:prefix/=target/");
    assert_eq!(remappings[1].source, project.root.join("remappings.txt"));
}

#[test]
fn missing_slash_ending_rejects_construction() {
    let project = Project::new();
    project.write("lib/submodule/remappings.txt", "foo/=bar\n");

    let Err(PackageMapError::Remappings(errors)) = project.load() else {
        panic!("expected remapping errors");
    };
    assert_eq!(
        errors,
        vec![UserRemappingError::WithoutSlashEndings {
            path: project.root.join("lib/submodule/remappings.txt"),
            remapping: "foo/=bar".to_string(),
        }]
    );
}

#[test]
fn nested_remappings_come_before_top_level() {
    let project = Project::new();
    project
        .write("remappings.txt", "foo/=bar/\n")
        .write("lib/submodule/remappings.txt", "context/:prefix/=target/\n")
        .write("lib/submodule2/remappings.txt", "context/:prefix/=target/\n");

    let map = project.load().unwrap();
    let remappings = map.user_remappings(map.project_package());
    assert_eq!(remappings.len(), 3);

    assert_eq!(
        remappings[0].source,
        project.root.join("lib/submodule/remappings.txt")
    );
    assert_eq!(remappings[0].context, "project/lib/submodule/context/");
    assert_eq!(remappings[0].prefix, "prefix/");
    assert_eq!(remappings[0].target, "project/lib/submodule/target/");

    assert_eq!(
        remappings[1].source,
        project.root.join("lib/submodule2/remappings.txt")
    );
    assert_eq!(remappings[1].context, "project/lib/submodule2/context/");
    assert_eq!(remappings[1].target, "project/lib/submodule2/target/");

    assert_eq!(remappings[2].source, project.root.join("remappings.txt"));
    assert_eq!(remappings[2].prefix, "foo/");
    assert_eq!(remappings[2].target, "project/bar/");
}

#[test]
fn npm_remappings_resolve_installed_packages() {
    let project = Project::new();
    project
        .install("@uniswap/core", "@uniswap/core", "1.0.0")
        .install("no-scope", "no-scope", "1.2.0")
        .write(
            "remappings.txt",
            "@uniswap/core/=node_modules/@uniswap/core/src/\nno-scope/=node_modules/no-scope/src/",
        );

    let map = project.load().unwrap();
    let remappings = map.user_remappings(map.project_package());
    assert_eq!(remappings.len(), 2);

    assert_eq!(remappings[0].prefix, "@uniswap/core/");
    assert_eq!(remappings[0].target, "npm/@uniswap/core@1.0.0/src/");
    let npm = remappings[0].target_npm_package.as_ref().unwrap();
    assert_eq!(npm.installation_name, "@uniswap/core");
    assert_eq!(npm.package.root_source_name, "npm/@uniswap/core@1.0.0");

    assert_eq!(remappings[1].prefix, "no-scope/");
    assert_eq!(remappings[1].target, "npm/no-scope@1.2.0/src/");
    let npm = remappings[1].target_npm_package.as_ref().unwrap();
    assert_eq!(npm.installation_name, "no-scope");
}

#[test]
fn generic_npm_remapping_is_a_noop_and_dropped() {
    let project = Project::new();
    // Restates the generated installation remapping; dropped even
    // though `foo` is not installed.
    project.write("remappings.txt", "foo/=node_modules/foo/");

    let map = project.load().unwrap();
    assert!(map.user_remappings(map.project_package()).is_empty());
}

#[test]
fn remapping_to_uninstalled_package_is_rejected() {
    let project = Project::new();
    project.write("remappings.txt", "dep/=node_modules/dep/src/");

    let Err(PackageMapError::Remappings(errors)) = project.load() else {
        panic!("expected remapping errors");
    };
    assert_eq!(
        errors,
        vec![UserRemappingError::ToUninstalledPackage {
            path: project.root.join("remappings.txt"),
            remapping: "dep/=node_modules/dep/src/".to_string(),
            installation_name: "dep".to_string(),
        }]
    );
}

#[test]
fn unparsable_lines_are_rejected_with_syntax_errors() {
    let project = Project::new();
    project.write("remappings.txt", "no-equals-here\n=target/\nfoo/=\n");

    let Err(PackageMapError::Remappings(errors)) = project.load() else {
        panic!("expected remapping errors");
    };
    assert_eq!(errors.len(), 3);
    for (error, line) in errors.iter().zip(["no-equals-here", "=target/", "foo/="]) {
        assert!(matches!(error, UserRemappingError::InvalidSyntax { .. }));
        assert_eq!(error.remapping(), line);
    }
}

#[test]
fn comments_and_crlf_lines_are_tolerated() {
    let project = Project::new();
    project.write("remappings.txt", "# a comment\r\nfoo/=bar/\r\n\t\r\n");

    let map = project.load().unwrap();
    let remappings = map.user_remappings(map.project_package());
    assert_eq!(remappings.len(), 1);
    assert_eq!(remappings[0].original_format, "foo/=bar/");
}

#[test]
fn one_installed_package_backs_every_remapping_to_it() {
    let project = Project::new();
    project
        .install("dep1", "dep1", "1.2.0")
        .write(
            "remappings.txt",
            "dep1/=node_modules/dep1/src/\n\ndep1bis/=node_modules/dep1/src/",
        )
        .write("lib/submodule/remappings.txt", "dep1/=node_modules/dep1/src2/");

    let map = project.load().unwrap();
    let remappings = map.user_remappings(map.project_package());
    assert_eq!(remappings.len(), 3);

    let packages: Vec<&Arc<Package>> = remappings
        .iter()
        .map(|r| &r.target_npm_package.as_ref().unwrap().package)
        .collect();
    assert!(Package::same(packages[0], packages[1]));
    assert!(Package::same(packages[1], packages[2]));
    assert_eq!(packages[0].root_source_name, "npm/dep1@1.2.0");
}

#[test]
fn aliased_installations_share_one_canonical_package() {
    let project = Project::new();
    project
        .install("alias-one", "real-pkg", "2.0.0")
        .install("alias-two", "real-pkg", "2.0.0")
        .write(
            "remappings.txt",
            "one/=node_modules/alias-one/src/\ntwo/=node_modules/alias-two/src/",
        );

    let map = project.load().unwrap();
    let remappings = map.user_remappings(map.project_package());
    assert_eq!(remappings.len(), 2);

    let first = &remappings[0].target_npm_package.as_ref().unwrap().package;
    let second = &remappings[1].target_npm_package.as_ref().unwrap().package;
    assert!(Package::same(first, second));
    assert_eq!(first.root_source_name, "npm/real-pkg@2.0.0");
    assert_eq!(
        remappings[0].target_npm_package.as_ref().unwrap().installation_name,
        "alias-one"
    );
    assert_eq!(
        remappings[1].target_npm_package.as_ref().unwrap().installation_name,
        "alias-two"
    );
}

#[test]
fn user_remappings_are_stable_across_calls() {
    let project = Project::new();
    project
        .install("dep1", "dep1", "1.2.0")
        .write("remappings.txt", "foo/=bar/\ndep1x/=node_modules/dep1/src/");

    let map = project.load().unwrap();
    let first = map.user_remappings(map.project_package()).to_vec();
    let second = map.user_remappings(map.project_package()).to_vec();
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert!(Arc::ptr_eq(a, b));
    }
}

#[test]
fn dependency_resolution_reuses_edges_and_generates_remappings() {
    let project = Project::new();
    project.install("dep1", "dep1", "1.2.0");

    let mut map = project.load().unwrap();
    let from = map.project_package().clone();

    let first = map
        .resolve_dependency_by_installation_name(&from, "dep1")
        .unwrap()
        .unwrap();
    assert_eq!(first.generated_remapping.context, "project/");
    assert_eq!(first.generated_remapping.prefix, "dep1/");
    assert_eq!(first.generated_remapping.target, "npm/dep1@1.2.0/");
    assert!(first.remapping_errors.is_empty());

    let second = map
        .resolve_dependency_by_installation_name(&from, "dep1")
        .unwrap()
        .unwrap();
    assert!(Package::same(&first.package, &second.package));
    assert_eq!(first.generated_remapping, second.generated_remapping);

    assert!(map
        .resolve_dependency_by_installation_name(&from, "missing")
        .unwrap()
        .is_none());
}

#[test]
fn transitive_dependency_remappings_are_loaded() {
    let project = Project::new();
    project
        .install("dep1", "dep1", "1.0.0")
        .install("dep2", "dep2", "2.0.0")
        .write("remappings.txt", "d/=node_modules/dep1/src/");
    // dep1's own remappings pull in dep2.
    project.write(
        "node_modules/dep1/remappings.txt",
        "inner/=node_modules/dep2/contracts/",
    );

    let map = project.load().unwrap();
    let dep1 = map.package_for_source_name("npm/dep1@1.0.0/src/T.sol").unwrap();
    let inner = map.user_remappings(&dep1);
    assert_eq!(inner.len(), 1);
    assert_eq!(inner[0].context, "npm/dep1@1.0.0/");
    assert_eq!(inner[0].prefix, "inner/");
    assert_eq!(inner[0].target, "npm/dep2@2.0.0/contracts/");
}

#[cfg(unix)]
#[test]
fn monorepo_symlinked_install_gets_local_version() {
    let dir = tempdir().unwrap();
    let workspace = fs::canonicalize(dir.path()).unwrap();
    let root = workspace.join("packages/app");
    fs::create_dir_all(&root).unwrap();
    fs::write(
        root.join("package.json"),
        r#"{"name": "app", "version": "1.0.0"}"#,
    )
    .unwrap();

    let sibling = workspace.join("packages/sibling");
    fs::create_dir_all(&sibling).unwrap();
    fs::write(
        sibling.join("package.json"),
        r#"{"name": "sibling", "version": "9.9.9"}"#,
    )
    .unwrap();

    fs::create_dir_all(root.join("node_modules")).unwrap();
    std::os::unix::fs::symlink(&sibling, root.join("node_modules/sibling")).unwrap();

    fs::write(root.join("remappings.txt"), "sib/=node_modules/sibling/src/").unwrap();

    let map = RemappedPackageMap::load(&root).unwrap();
    let remappings = map.user_remappings(map.project_package());
    assert_eq!(remappings.len(), 1);
    let package = &remappings[0].target_npm_package.as_ref().unwrap().package;
    assert_eq!(package.version, "local");
    assert_eq!(package.root_source_name, "npm/sibling@local");
}

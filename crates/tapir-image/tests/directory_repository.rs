//! Resolving from a directory of JSON package definitions.

use std::fs;
use std::sync::Arc;
use tapir_core::ImageSpecifier;
use tapir_image::{DirectoryRepository, GraphQuery, ImageBuilder, ImageConfig, PackageRepository, RepositoryManager};
use tokio_util::sync::CancellationToken;

fn write_registry(root: &std::path::Path) {
    fs::create_dir_all(root.join("opentap")).unwrap();
    fs::write(
        root.join("opentap/opentap.json"),
        r#"[
            {"Name": "OpenTAP", "Version": "9.12.0", "OS": "Windows,Linux", "Architecture": "x64", "Hash": "aa"},
            {"Name": "OpenTAP", "Version": "9.13.1", "OS": "Windows,Linux", "Architecture": "x64"},
            {"Name": "OpenTAP", "Version": "9.13.1-rc.1", "OS": "Windows,Linux", "Architecture": "x64"}
        ]"#,
    )
    .unwrap();
    fs::write(
        root.join("demonstration.json"),
        r#"{"Name": "Demonstration", "Version": "9.1.0", "Dependencies": [{"Name": "OpenTAP", "Version": "^9.12.0"}]}"#,
    )
    .unwrap();
    fs::write(root.join("arm-only.json"), r#"{"Name": "Driver", "Version": "1.0.0", "Architecture": "arm64"}"#).unwrap();
    fs::write(root.join("broken.json"), "{ this is not json").unwrap();
    fs::write(root.join("README.md"), "not a package").unwrap();
}

#[tokio::test]
async fn scans_and_filters_definitions() {
    let dir = tempfile::tempdir().unwrap();
    write_registry(dir.path());
    let repo = DirectoryRepository::open(dir.path()).unwrap();

    let graph = repo
        .query(&GraphQuery::all().with_platform(tapir_core::CpuArchitecture::X64, "Linux"))
        .await
        .unwrap();
    assert_eq!(graph.names(), vec!["Demonstration", "OpenTAP"]);
    assert_eq!(graph.versions_of("OpenTAP").len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn resolves_from_directory_location() {
    let dir = tempfile::tempdir().unwrap();
    write_registry(dir.path());
    let location = format!("{}/", dir.path().display());

    let config = ImageConfig::default();
    let builder = ImageBuilder::new(Arc::new(RepositoryManager::new(&config)), config);
    let json = format!(
        r#"{{
            "Name": "lab",
            "Packages": [{{"Name": "Demonstration", "Version": "any"}}],
            "Repositories": [{location:?}, {location:?}],
            "OS": "Linux",
            "Architecture": "x64"
        }}"#
    );
    let image = ImageSpecifier::from_json(&json).unwrap();

    let resolved = builder.resolve(&image, CancellationToken::new()).await.unwrap();
    let selected: Vec<String> = resolved
        .packages
        .iter()
        .map(|p| format!("{} {}", p.name, p.version))
        .collect();
    assert_eq!(selected, vec!["Demonstration 9.1.0", "OpenTAP 9.12.0"]);
}

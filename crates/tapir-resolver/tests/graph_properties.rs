//! Property tests for dependency graph loading and merging.

use proptest::prelude::*;
use tapir_core::{PackageDef, PackageSpecifier, SemanticVersion, VersionSpecifier};
use tapir_resolver::PackageDependencyGraph;

const NAMES: [&str; 4] = ["Alpha", "Beta", "Gamma", "Delta"];
const PRERELEASES: [&str; 4] = ["", "alpha.1", "beta.2", "rc.1"];

prop_compose! {
    fn arb_def()(
        name in 0..NAMES.len(),
        major in 0u64..3,
        minor in 0u64..3,
        patch in 0u64..3,
        pre in 0..PRERELEASES.len(),
        deps in prop::collection::vec((0..NAMES.len(), 0u64..3, any::<bool>()), 0..3),
    ) -> PackageDef {
        let version = SemanticVersion::from_parts(major, minor, patch, PRERELEASES[pre], "").unwrap();
        deps.into_iter().fold(PackageDef::new(NAMES[name], version), |def, (dep, major, caret)| {
            let spec = if caret { format!("^{major}.0.0") } else { major.to_string() };
            def.with_dependency(NAMES[dep], VersionSpecifier::parse(&spec).unwrap())
        })
    }
}

fn arb_defs() -> impl Strategy<Value = Vec<PackageDef>> {
    prop::collection::vec(arb_def(), 0..24)
}

fn satisfying_per_name(graph: &mut PackageDependencyGraph) -> Vec<Vec<SemanticVersion>> {
    NAMES
        .iter()
        .map(|name| graph.packages_satisfying(&PackageSpecifier::new(*name, VersionSpecifier::ANY)))
        .collect()
}

proptest! {
    #[test]
    fn loading_twice_changes_nothing(defs in arb_defs()) {
        let mut graph = PackageDependencyGraph::from_package_defs(defs.clone());
        let before = graph.to_package_defs();
        prop_assert_eq!(graph.load_from_package_defs(defs), 0);
        prop_assert_eq!(graph.to_package_defs(), before);
    }

    #[test]
    fn export_reloads_identically(defs in arb_defs()) {
        let graph = PackageDependencyGraph::from_package_defs(defs);
        let reloaded = PackageDependencyGraph::from_package_defs(graph.to_package_defs());
        prop_assert_eq!(reloaded.to_package_defs(), graph.to_package_defs());
    }

    #[test]
    fn absorb_order_does_not_matter(a in arb_defs(), b in arb_defs()) {
        let left = PackageDependencyGraph::from_package_defs(a);
        let right = PackageDependencyGraph::from_package_defs(b);

        let mut left_first = left.clone();
        left_first.absorb(&right);
        let mut right_first = right.clone();
        right_first.absorb(&left);

        prop_assert_eq!(left_first.package_count(), right_first.package_count());
        prop_assert_eq!(left_first.names(), right_first.names());
        prop_assert_eq!(
            satisfying_per_name(&mut left_first),
            satisfying_per_name(&mut right_first)
        );
    }
}

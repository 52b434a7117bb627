//! Property-based tests for classification and graph reduction.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use std::collections::{BTreeSet, HashMap};

use proptest::prelude::*;

use baker::core::classify::{classify_source, ClassificationRecord};
use baker::core::graph::Graph;
use baker::core::types::{NodeId, Role};

/// Strategy for a random DAG over `n` modules.
///
/// Module `i` may import only modules with a larger index, which rules out
/// cycles. Returns the import lists, one per module.
fn module_dag() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..12).prop_flat_map(|n| {
        (0..n)
            .map(|i| {
                let later = n - i - 1;
                prop::collection::btree_set(0..later.max(1), 0..=later.min(4))
                    .prop_map(move |picks| picks.into_iter().map(|p| i + 1 + p).collect::<Vec<usize>>())
            })
            .collect::<Vec<_>>()
    })
}

fn records(dag: &[Vec<usize>]) -> Vec<ClassificationRecord> {
    let mut records = vec![ClassificationRecord {
        filename: "main.cpp".to_string(),
        role: Role::Plain,
        imports: (0..dag.len()).map(|i| format!("m{i}")).collect(),
        ..Default::default()
    }];
    records.extend(dag.iter().enumerate().map(|(i, imports)| ClassificationRecord {
        filename: format!("m{i}.cppm"),
        role: Role::ModuleInterface,
        name: format!("m{i}"),
        imports: imports.iter().map(|j| format!("m{j}")).collect(),
        header_units: BTreeSet::new(),
        owner_module: None,
    }));
    records
}

/// Strategy for a line that can never appear in a module preamble.
fn ordinary_code() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("int main() { return 0; }".to_string()),
        Just("namespace detail {}".to_string()),
        "[a-z]{1,8}".prop_map(|name| format!("int {name} = 0;")),
    ]
}

proptest! {
    /// Every reachable node appears exactly once in post-order, after all of
    /// its dependencies.
    #[test]
    fn reduction_orders_dependencies_first(dag in module_dag()) {
        let tree = Graph::from_records(records(&dag))
            .unwrap()
            .resolve()
            .unwrap()
            .reduce()
            .unwrap();

        let order = tree.post_order();
        prop_assert_eq!(order.len(), dag.len() + 1);

        let position: HashMap<NodeId, usize> =
            order.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        prop_assert_eq!(position.len(), order.len());

        for &id in order {
            for &dep in tree.build_dependencies(id) {
                prop_assert!(position[&dep] < position[&id]);
            }
        }
        prop_assert_eq!(*order.last().unwrap(), tree.root());
        prop_assert!(tree.unreachable().is_empty());
    }

    /// Imports after the first ordinary statement are never recorded.
    #[test]
    fn classification_stops_at_ordinary_code(
        before in prop::collection::vec("[a-z]{1,6}", 0..5),
        after in prop::collection::vec("[a-z]{1,6}", 1..5),
        code in ordinary_code(),
    ) {
        let mut text = String::from("export module scanned;\n");
        for name in &before {
            text.push_str(&format!("import {name};\n"));
        }
        text.push_str(&code);
        text.push('\n');
        for name in &after {
            text.push_str(&format!("import late_{name};\n"));
        }

        let record = classify_source("scanned.cppm", &text).unwrap();
        prop_assert_eq!(record.role, Role::ModuleInterface);
        prop_assert_eq!(record.imports, before);
    }
}

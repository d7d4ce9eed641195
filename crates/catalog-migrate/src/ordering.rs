//! FK-aware table ordering for migration emission.
//!
//! Tables referenced by foreign keys must be created before the tables that
//! reference them. Ordering is a depth-first walk with explicit visited and
//! visiting sets; an edge back to a table still on the walk stack closes a
//! cycle and is dropped without error.

use std::collections::HashMap;

use tracing::debug;

use crate::core::schema::{DatabaseSchema, TableMetadata};

/// Order tables so that every table follows the tables it references.
///
/// - The result is always a permutation of `schema.tables`.
/// - Self-references and references to tables outside the schema are ignored.
/// - Ties keep input order: roots are walked in the order they appear, and a
///   table's references are followed in foreign-key order.
/// - In a cycle, the table entered first is emitted last. Its partner is
///   emitted while the referenced table does not exist yet; the
///   corresponding foreign key is still produced later by the generators.
pub fn order(schema: &DatabaseSchema) -> Vec<&TableMetadata> {
    let tables = &schema.tables;
    let mut by_name: HashMap<&str, usize> = HashMap::with_capacity(tables.len());
    for (idx, table) in tables.iter().enumerate() {
        by_name.entry(table.name.as_str()).or_insert(idx);
    }

    let mut visited = vec![false; tables.len()];
    let mut visiting = vec![false; tables.len()];
    let mut ordered: Vec<&TableMetadata> = Vec::with_capacity(tables.len());

    for root in 0..tables.len() {
        if visited[root] {
            continue;
        }

        // (table index, next foreign key to follow)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        visiting[root] = true;

        while let Some(&(current, next_fk)) = stack.last() {
            let table = &tables[current];

            if next_fk < table.foreign_keys.len() {
                let top = stack.len() - 1;
                stack[top].1 += 1;

                let fk = &table.foreign_keys[next_fk];
                let Some(&target) = by_name.get(fk.referenced_table.as_str()) else {
                    continue;
                };
                if target == current || visited[target] {
                    continue;
                }
                if visiting[target] {
                    debug!(
                        "Dropping cyclic edge {} -> {} ({})",
                        table.name, fk.referenced_table, fk.name
                    );
                    continue;
                }

                visiting[target] = true;
                stack.push((target, 0));
            } else {
                stack.pop();
                visiting[current] = false;
                visited[current] = true;
                ordered.push(table);
            }
        }
    }

    ordered
}

//! Migration step planning shared by the migration-capable profiles.
//!
//! A plan is the ordered list of migration files to emit. Profiles only decide
//! how each step is rendered and named; which steps exist, and in what order,
//! is decided here.

use crate::core::schema::{
    ColumnMetadata, DatabaseSchema, IndexMetadata, Row, TableData, TableMetadata,
};
use crate::extract::filter_auto_increment_columns;
use crate::ordering::order;

/// How a create step declares the primary key and auto-increment flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyFlags {
    /// Both inline.
    Inline,
    /// Both left out of the create.
    Deferred,
    /// Primary key left out. The identity stays inline on SQL Server only,
    /// which cannot add IDENTITY to an existing column; PostgreSQL and MySQL
    /// restore it in the enable-identity step.
    MssqlIdentityOnly,
}

impl KeyFlags {
    pub fn inline_primary_key(self) -> bool {
        self == KeyFlags::Inline
    }
}

/// One migration file to emit.
#[derive(Debug)]
pub(crate) enum Step<'a> {
    /// Create a table with its non-primary indexes.
    CreateTable {
        table: &'a TableMetadata,
        keys: KeyFlags,
    },
    /// Add a deferred primary key under its original constraint name.
    AddPrimaryKey {
        table: &'a TableMetadata,
        index: &'a IndexMetadata,
    },
    /// Add every foreign key the table owns.
    AddForeignKeys { table: &'a TableMetadata },
    /// Insert rows.
    Seed {
        table_name: &'a str,
        rows: Vec<Row>,
        /// Bracket the insert with the explicit-identity toggle.
        identity_insert: bool,
    },
    /// Resynchronize the identity generator, optionally restoring the property first.
    EnableIdentity {
        table_name: &'a str,
        column: &'a ColumnMetadata,
        restore: bool,
    },
}

impl Step<'_> {
    /// Table the step operates on.
    pub fn table_name(&self) -> &str {
        match self {
            Step::CreateTable { table, .. }
            | Step::AddPrimaryKey { table, .. }
            | Step::AddForeignKeys { table } => &table.name,
            Step::Seed { table_name, .. } | Step::EnableIdentity { table_name, .. } => table_name,
        }
    }
}

/// Steps for schema migrations, with seeds interleaved per table.
pub(crate) fn plan_schema<'a>(
    schema: &'a DatabaseSchema,
    data: Option<&'a [TableData]>,
) -> Vec<Step<'a>> {
    let mut steps = Vec::new();

    for table in order(schema) {
        let table_data = data.and_then(|all| {
            all.iter()
                .find(|d| d.table_name.eq_ignore_ascii_case(&table.name))
        });
        let disable_identity = table_data.is_some_and(|d| d.disable_identity);

        let auto_increment: Vec<&ColumnMetadata> = table.auto_increment_columns().collect();
        let keys = match (auto_increment.len(), disable_identity) {
            (1, false) => KeyFlags::Inline,
            (1, true) => KeyFlags::MssqlIdentityOnly,
            _ => KeyFlags::Deferred,
        };

        steps.push(Step::CreateTable { table, keys });

        if !keys.inline_primary_key() {
            if let Some(index) = table.primary_index() {
                steps.push(Step::AddPrimaryKey { table, index });
            }
        }

        if !table.foreign_keys.is_empty() {
            steps.push(Step::AddForeignKeys { table });
        }

        if let Some(data) = table_data {
            let rows = filter_auto_increment_columns(data);
            let identity_insert = data.disable_identity && data.has_explicit_identity_values(&rows);
            steps.push(Step::Seed {
                table_name: &table.name,
                rows,
                identity_insert,
            });

            if disable_identity {
                if let Some(&column) = auto_increment.first() {
                    steps.push(Step::EnableIdentity {
                        table_name: &table.name,
                        column,
                        restore: true,
                    });
                }
            }
        }
    }

    steps
}

/// Steps for data-only migrations, in input order.
///
/// The identity generator is only resynchronized when explicit identity
/// values were seeded; the property itself is left untouched.
pub(crate) fn plan_data(data: &[TableData]) -> Vec<Step<'_>> {
    let mut steps = Vec::new();

    for table_data in data {
        let rows = filter_auto_increment_columns(table_data);
        let explicit = table_data.disable_identity && table_data.has_explicit_identity_values(&rows);

        steps.push(Step::Seed {
            table_name: &table_data.table_name,
            rows,
            identity_insert: explicit,
        });

        if explicit {
            if let Some(column) = table_data.auto_increment_column() {
                steps.push(Step::EnableIdentity {
                    table_name: &table_data.table_name,
                    column,
                    restore: false,
                });
            }
        }
    }

    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::fixtures::{users_data, users_posts};

    fn kinds(steps: &[Step<'_>]) -> Vec<String> {
        steps
            .iter()
            .map(|s| {
                let kind = match s {
                    Step::CreateTable { .. } => "create",
                    Step::AddPrimaryKey { .. } => "add-primary-key",
                    Step::AddForeignKeys { .. } => "add-fks",
                    Step::Seed { .. } => "seed",
                    Step::EnableIdentity { .. } => "enable-identity",
                };
                format!("{}-{}", kind, s.table_name())
            })
            .collect()
    }

    #[test]
    fn test_interleaves_seed_after_owning_table() {
        let schema = users_posts();
        let data = vec![users_data(&schema, false)];
        let steps = plan_schema(&schema, Some(&data));
        assert_eq!(
            kinds(&steps),
            vec!["create-Users", "seed-Users", "create-Posts", "add-fks-Posts"]
        );
        match &steps[1] {
            Step::Seed {
                rows,
                identity_insert,
                ..
            } => {
                assert!(!identity_insert);
                assert!(!rows[0].contains_key("id"));
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_disable_identity_defers_key_and_resyncs() {
        let schema = users_posts();
        let data = vec![users_data(&schema, true)];
        let steps = plan_schema(&schema, Some(&data));
        assert_eq!(
            kinds(&steps),
            vec![
                "create-Users",
                "add-primary-key-Users",
                "seed-Users",
                "enable-identity-Users",
                "create-Posts",
                "add-fks-Posts"
            ]
        );
        assert!(matches!(
            steps[0],
            Step::CreateTable {
                keys: KeyFlags::MssqlIdentityOnly,
                ..
            }
        ));
        assert!(matches!(
            steps[4],
            Step::CreateTable {
                keys: KeyFlags::Inline,
                ..
            }
        ));
        assert!(matches!(
            steps[2],
            Step::Seed {
                identity_insert: true,
                ..
            }
        ));
        assert!(matches!(steps[3], Step::EnableIdentity { restore: true, .. }));
    }

    #[test]
    fn test_table_without_single_identity_defers_primary_key() {
        let mut schema = users_posts();
        for table in &mut schema.tables {
            for column in &mut table.columns {
                column.is_auto_increment = false;
            }
        }
        let steps = plan_schema(&schema, None);
        assert!(matches!(
            steps[0],
            Step::CreateTable {
                keys: KeyFlags::Deferred,
                ..
            }
        ));
        assert_eq!(
            kinds(&steps),
            vec![
                "create-Users",
                "add-primary-key-Users",
                "create-Posts",
                "add-primary-key-Posts",
                "add-fks-Posts"
            ]
        );
    }

    #[test]
    fn test_data_plan_resyncs_only_with_explicit_identity() {
        let schema = users_posts();
        let plain_data = vec![users_data(&schema, false)];
        let plain = plan_data(&plain_data);
        assert_eq!(kinds(&plain), vec!["seed-users"]);

        let explicit_data = vec![users_data(&schema, true)];
        let explicit = plan_data(&explicit_data);
        assert_eq!(kinds(&explicit), vec!["seed-users", "enable-identity-users"]);
        assert!(matches!(
            explicit[1],
            Step::EnableIdentity { restore: false, .. }
        ));
    }
}

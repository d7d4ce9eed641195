//! Sequelize models and `sequelize-cli` migrations.
//!
//! Migration files are named `{YYYYMMDDHHMMSS}{counter:06}-{kind}-{table}.js`.
//! Dialect-specific statements branch on `queryInterface.sequelize.getDialect()`
//! at migration run time, so one set of files replays on any target.

use chrono::Duration;

use crate::core::identifier::{escape_literal, quote_mssql, quote_mysql, quote_pg};
use crate::core::schema::{ColumnMetadata, DatabaseSchema, Row, TableData, TableMetadata};
use crate::error::Result;

use super::plan::{plan_data, plan_schema, KeyFlags, Step};
use super::typemap::{classify, TypeCategory};
use super::{
    class_name, indent_tail, js_str, js_str_list, Clock, GeneratedFile, MigrationGenerator,
    SchemaGenerator,
};

/// Sequelize profile.
#[derive(Debug, Clone, Default)]
pub struct SequelizeGenerator {
    clock: Clock,
}

impl SequelizeGenerator {
    pub fn new(clock: Clock) -> Self {
        Self { clock }
    }

    fn render(&self, steps: Vec<Step<'_>>, offset: Duration) -> Result<Vec<GeneratedFile>> {
        let base = (self.clock.now() + offset).format("%Y%m%d%H%M%S").to_string();

        let mut files = Vec::with_capacity(steps.len());
        for (i, step) in steps.iter().enumerate() {
            let (kind, content) = match step {
                Step::CreateTable { table, keys } => ("create", create_table(table, *keys)),
                Step::AddPrimaryKey { table, index } => (
                    "add-primary-key",
                    add_primary_key(&table.name, &index.name, &index.columns),
                ),
                Step::AddForeignKeys { table } => ("add-fks", add_foreign_keys(table)),
                Step::Seed {
                    table_name,
                    rows,
                    identity_insert,
                } => ("seed", seed(table_name, rows, *identity_insert)?),
                Step::EnableIdentity {
                    table_name,
                    column,
                    restore,
                } => (
                    "enable-identity",
                    enable_identity(table_name, column, *restore)?,
                ),
            };
            let file_name = format!("{}{:06}-{}-{}.js", base, i + 1, kind, step.table_name());
            files.push(GeneratedFile::new(file_name, content));
        }
        Ok(files)
    }
}

impl SchemaGenerator for SequelizeGenerator {
    fn generate(&self, schema: &DatabaseSchema) -> Result<Vec<GeneratedFile>> {
        Ok(schema
            .tables
            .iter()
            .map(|table| {
                let class = class_name(&table.name);
                GeneratedFile::new(format!("{}.ts", class), model(table, &class))
            })
            .collect())
    }
}

impl MigrationGenerator for SequelizeGenerator {
    fn generate_migrations(
        &self,
        schema: &DatabaseSchema,
        data: Option<&[TableData]>,
    ) -> Result<Vec<GeneratedFile>> {
        self.render(plan_schema(schema, data), Duration::zero())
    }

    fn generate_data_migrations(&self, data: &[TableData]) -> Result<Vec<GeneratedFile>> {
        self.render(plan_data(data), Duration::seconds(10))
    }
}

/// `DataTypes.X` / `Sequelize.X` member for a column.
fn data_type(column: &ColumnMetadata) -> String {
    match classify(column) {
        TypeCategory::Boolean => "BOOLEAN".into(),
        TypeCategory::TinyInt => "TINYINT".into(),
        TypeCategory::SmallInt => "SMALLINT".into(),
        TypeCategory::MediumInt => "MEDIUMINT".into(),
        TypeCategory::BigInt => "BIGINT".into(),
        TypeCategory::Integer => "INTEGER".into(),
        TypeCategory::Float => "FLOAT".into(),
        TypeCategory::Double => "DOUBLE".into(),
        TypeCategory::Decimal(Some((p, s))) => format!("DECIMAL({}, {})", p, s),
        TypeCategory::Decimal(None) => "DECIMAL".into(),
        TypeCategory::DateOnly => "DATEONLY".into(),
        TypeCategory::Time => "TIME".into(),
        TypeCategory::Timestamp => "DATE".into(),
        TypeCategory::Json => "JSON".into(),
        TypeCategory::Text => "TEXT".into(),
        TypeCategory::String(Some(n)) => format!("STRING({})", n),
        TypeCategory::String(None) | TypeCategory::Fallback => "STRING".into(),
        TypeCategory::Binary => "BLOB".into(),
        TypeCategory::Uuid => "UUID".into(),
    }
}

/// Attribute block for one column, `namespace` is `DataTypes` or `Sequelize`.
fn attribute(
    table: &TableMetadata,
    column: &ColumnMetadata,
    namespace: &str,
    keys: KeyFlags,
    indent: usize,
) -> String {
    let pad = " ".repeat(indent);
    let inner = " ".repeat(indent + 2);

    let mut parts = vec![format!("{}type: {}.{}", inner, namespace, data_type(column))];
    if keys.inline_primary_key() && column.is_primary_key {
        parts.push(format!("{}primaryKey: true", inner));
    }
    if column.is_auto_increment {
        match keys {
            KeyFlags::Inline => parts.push(format!("{}autoIncrement: true", inner)),
            KeyFlags::MssqlIdentityOnly => {
                parts.push(format!("{}autoIncrement: dialect === 'mssql'", inner))
            }
            KeyFlags::Deferred => {}
        }
    }
    parts.push(format!("{}allowNull: {}", inner, column.is_nullable));
    if column.is_unique && !table.has_unique_index_on(&column.name) {
        parts.push(format!("{}unique: true", inner));
    }
    if let Some(default) = column.default_value.as_deref() {
        if !column.is_auto_increment {
            parts.push(format!(
                "{}defaultValue: Sequelize.literal({})",
                inner,
                js_str(default)
            ));
        }
    }

    format!(
        "{}{}: {{\n{}\n{}}}",
        pad,
        js_str(&column.name),
        parts.join(",\n"),
        pad
    )
}

fn model(table: &TableMetadata, class: &str) -> String {
    let attributes: Vec<String> = table
        .columns
        .iter()
        .map(|c| attribute(table, c, "DataTypes", KeyFlags::Inline, 6))
        .collect();

    let indexes: Vec<String> = table
        .secondary_indexes()
        .map(|idx| {
            format!(
                "        {{ name: {}, unique: {}, fields: {} }}",
                js_str(&idx.name),
                idx.is_unique,
                js_str_list(&idx.columns)
            )
        })
        .collect();
    let indexes_block = if indexes.is_empty() {
        String::new()
    } else {
        format!("      indexes: [\n{}\n      ],\n", indexes.join(",\n"))
    };

    format!(
        r#"import {{ DataTypes, Model, Sequelize }} from 'sequelize';

export class {class} extends Model {{}}

export function init(sequelize: Sequelize): typeof {class} {{
  {class}.init(
    {{
{attributes}
    }},
    {{
      sequelize,
      tableName: {table},
      timestamps: false,
{indexes_block}    }}
  );
  return {class};
}}
"#,
        class = class,
        attributes = attributes.join(",\n"),
        table = js_str(&table.name),
        indexes_block = indexes_block,
    )
}

fn migration(up: &str, down: &str) -> String {
    format!(
        r#"'use strict';

/** @type {{import('sequelize-cli').Migration}} */
module.exports = {{
  async up(queryInterface, Sequelize) {{
{up}
  }},

  async down(queryInterface, Sequelize) {{
{down}
  }}
}};
"#,
        up = up,
        down = down
    )
}

fn create_table(table: &TableMetadata, keys: KeyFlags) -> String {
    let name = js_str(&table.name);
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| attribute(table, c, "Sequelize", keys, 6))
        .collect();

    let mut up = String::new();
    if keys == KeyFlags::MssqlIdentityOnly {
        up.push_str("    const dialect = queryInterface.sequelize.getDialect();\n");
    }
    up.push_str(&format!(
        "    await queryInterface.createTable({}, {{\n{}\n    }});",
        name,
        columns.join(",\n")
    ));
    for idx in table.secondary_indexes() {
        up.push_str(&format!(
            "\n    await queryInterface.addIndex({}, {}, {{ name: {}, unique: {} }});",
            name,
            js_str_list(&idx.columns),
            js_str(&idx.name),
            idx.is_unique
        ));
    }

    migration(&up, &format!("    await queryInterface.dropTable({});", name))
}

fn add_primary_key(table: &str, constraint: &str, columns: &[String]) -> String {
    let up = format!(
        r#"    try {{
      await queryInterface.addConstraint({table}, {{
        fields: {fields},
        type: 'primary key',
        name: {name}
      }});
    }} catch (error) {{
      console.warn({warn}, error.message);
    }}"#,
        table = js_str(table),
        fields = js_str_list(columns),
        name = js_str(constraint),
        warn = js_str(&format!(
            "Skipping primary key {} on {}:",
            constraint, table
        )),
    );
    let down = format!(
        r#"    try {{
      await queryInterface.removeConstraint({table}, {name});
    }} catch (error) {{
      console.warn({warn}, error.message);
    }}"#,
        table = js_str(table),
        name = js_str(constraint),
        warn = js_str(&format!(
            "Skipping primary key removal {} on {}:",
            constraint, table
        )),
    );
    migration(&up, &down)
}

fn add_foreign_keys(table: &TableMetadata) -> String {
    let name = js_str(&table.name);

    let up: Vec<String> = table
        .foreign_keys
        .iter()
        .map(|fk| {
            let references = match fk.referenced_columns.as_slice() {
                [single] => format!("field: {}", js_str(single)),
                many => format!("fields: {}", js_str_list(many)),
            };
            format!(
                r#"    try {{
      await queryInterface.addConstraint({table}, {{
        fields: {fields},
        type: 'foreign key',
        name: {fk},
        references: {{
          table: {referenced},
          {references}
        }},
        onDelete: {on_delete},
        onUpdate: {on_update}
      }});
    }} catch (error) {{
      console.warn({warn}, error.message);
    }}"#,
                table = name,
                fields = js_str_list(&fk.columns),
                fk = js_str(&fk.name),
                referenced = js_str(&fk.referenced_table),
                references = references,
                on_delete = js_str(fk.delete_rule.as_deref().unwrap_or("NO ACTION")),
                on_update = js_str(fk.update_rule.as_deref().unwrap_or("NO ACTION")),
                warn = js_str(&format!(
                    "Skipping foreign key {} on {}:",
                    fk.name, table.name
                )),
            )
        })
        .collect();

    let down: Vec<String> = table
        .foreign_keys
        .iter()
        .map(|fk| {
            format!(
                r#"    try {{
      await queryInterface.removeConstraint({table}, {fk});
    }} catch (error) {{
      console.warn({warn}, error.message);
    }}"#,
                table = name,
                fk = js_str(&fk.name),
                warn = js_str(&format!(
                    "Skipping foreign key removal {} on {}:",
                    fk.name, table.name
                )),
            )
        })
        .collect();

    migration(&up.join("\n"), &down.join("\n"))
}

/// `IF OBJECTPROPERTY(..) = 1 SET IDENTITY_INSERT [t] ON|OFF`.
pub(crate) fn mssql_identity_insert(table: &str, on: bool) -> Result<String> {
    Ok(format!(
        "IF OBJECTPROPERTY(OBJECT_ID('{}'), 'TableHasIdentity') = 1 SET IDENTITY_INSERT {} {}",
        escape_literal(table),
        quote_mssql(table)?,
        if on { "ON" } else { "OFF" }
    ))
}

fn seed(table: &str, rows: &[Row], identity_insert: bool) -> Result<String> {
    let name = js_str(table);
    let rows_json = indent_tail(&serde_json::to_string_pretty(rows)?, 4);

    let mut body = String::new();
    if identity_insert {
        body.push_str(&format!(
            r#"      const dialect = queryInterface.sequelize.getDialect();
      if (dialect === 'mssql') {{
        await queryInterface.sequelize.query({}, {{ transaction }});
      }}
"#,
            js_str(&mssql_identity_insert(table, true)?)
        ));
    }
    body.push_str(&format!(
        "      await queryInterface.bulkInsert({}, rows, {{ transaction }});\n",
        name
    ));
    if identity_insert {
        body.push_str(&format!(
            r#"      if (dialect === 'mssql') {{
        await queryInterface.sequelize.query({}, {{ transaction }});
      }}
"#,
            js_str(&mssql_identity_insert(table, false)?)
        ));
    }

    let up = format!(
        r#"    const rows = {rows};
    if (rows.length === 0) {{
      return;
    }}
    await queryInterface.sequelize.transaction(async (transaction) => {{
{body}    }});"#,
        rows = rows_json,
        body = body,
    );
    Ok(migration(
        &up,
        &format!("    await queryInterface.bulkDelete({}, null, {{}});", name),
    ))
}

/// Dialect statements that restore and resynchronize an identity column.
///
/// Shared with the TypeORM profile, which runs the same SQL through its query runner.
pub(crate) struct IdentitySql {
    /// Statements restoring the generator on PostgreSQL.
    pub postgres_restore: Vec<String>,
    pub postgres_resync: String,
    /// `MODIFY` restoring `AUTO_INCREMENT` on MySQL.
    pub mysql_restore: String,
    /// Query yielding `next`, the value to set `AUTO_INCREMENT` to.
    pub mysql_next: String,
    /// Prefix of the `ALTER TABLE .. AUTO_INCREMENT = ` statement.
    pub mysql_alter_prefix: String,
    pub mssql_reseed: String,
}

impl IdentitySql {
    pub fn new(table: &str, column: &ColumnMetadata) -> Result<Self> {
        let pg_table = quote_pg(table)?;
        let pg_column = quote_pg(&column.name)?;
        let sequence = quote_pg(&format!("{}_{}_seq", table, column.name))?;
        let my_table = quote_mysql(table)?;
        let my_column = quote_mysql(&column.name)?;
        let ms_table = quote_mssql(table)?;
        let ms_column = quote_mssql(&column.name)?;
        let literal_table = escape_literal(table);

        let mysql_type = classify(column).mysql_integer();
        let nullability = if column.is_nullable { "NULL" } else { "NOT NULL" };

        Ok(Self {
            postgres_restore: vec![
                format!(
                    "CREATE SEQUENCE IF NOT EXISTS {} OWNED BY {}.{}",
                    sequence, pg_table, pg_column
                ),
                format!(
                    "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT nextval('{}')",
                    pg_table,
                    pg_column,
                    escape_literal(&sequence)
                ),
            ],
            postgres_resync: format!(
                "SELECT setval(pg_get_serial_sequence('{}', '{}'), COALESCE(MAX({}), 0) + 1, false) FROM {}",
                escape_literal(&pg_table),
                escape_literal(&column.name),
                pg_column,
                pg_table
            ),
            mysql_restore: format!(
                "ALTER TABLE {} MODIFY {} {} {} AUTO_INCREMENT",
                my_table, my_column, mysql_type, nullability
            ),
            mysql_next: format!(
                "SELECT COALESCE(MAX({}), 0) + 1 AS next FROM {}",
                my_column, my_table
            ),
            mysql_alter_prefix: format!("ALTER TABLE {} AUTO_INCREMENT = ", my_table),
            mssql_reseed: format!(
                "IF OBJECTPROPERTY(OBJECT_ID('{lit}'), 'TableHasIdentity') = 1 BEGIN \
                 DECLARE @max BIGINT = (SELECT COALESCE(MAX({col}), 0) FROM {tbl}); \
                 DBCC CHECKIDENT ('{lit}', RESEED, @max) END",
                lit = literal_table,
                col = ms_column,
                tbl = ms_table
            ),
        })
    }
}

fn enable_identity(table: &str, column: &ColumnMetadata, restore: bool) -> Result<String> {
    let sql = IdentitySql::new(table, column)?;
    let query = |statement: &str| {
        format!(
            "      await queryInterface.sequelize.query({});\n",
            js_str(statement)
        )
    };

    let mut postgres = String::new();
    let mut mysql = String::new();
    if restore {
        for statement in &sql.postgres_restore {
            postgres.push_str(&query(statement));
        }
        mysql.push_str(&query(&sql.mysql_restore));
    }
    postgres.push_str(&query(&sql.postgres_resync));
    mysql.push_str(&format!(
        "      const [result] = await queryInterface.sequelize.query({});\n      \
         await queryInterface.sequelize.query({} + result[0].next);\n",
        js_str(&sql.mysql_next),
        js_str(&sql.mysql_alter_prefix)
    ));
    let mssql = query(&sql.mssql_reseed);

    let up = format!(
        r#"    const dialect = queryInterface.sequelize.getDialect();
    if (dialect === 'postgres') {{
{postgres}    }} else if (dialect === 'mysql' || dialect === 'mariadb') {{
{mysql}    }} else if (dialect === 'mssql') {{
{mssql}    }}"#,
        postgres = postgres,
        mysql = mysql,
        mssql = mssql,
    );
    Ok(migration(
        &up,
        "    // Identity generators are not rolled back.",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::IndexMetadata;
    use crate::generate::fixtures::{frozen, users_data, users_posts};

    fn generator() -> SequelizeGenerator {
        SequelizeGenerator::new(frozen())
    }

    fn sorted(mut files: Vec<GeneratedFile>) -> Vec<GeneratedFile> {
        files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        files
    }

    #[test]
    fn test_interleaved_seed_scenario() {
        let schema = users_posts();
        let data = vec![users_data(&schema, false)];
        let files = sorted(generator().generate_migrations(&schema, Some(&data)).unwrap());

        let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "20240115103000000001-create-Users.js",
                "20240115103000000002-seed-Users.js",
                "20240115103000000003-create-Posts.js",
                "20240115103000000004-add-fks-Posts.js",
            ]
        );

        let seed = &files[1].content;
        assert!(seed.contains("bulkInsert(\"Users\""));
        assert!(seed.contains("Alice"));
        assert!(!seed.contains("\"id\""));
        assert!(!seed.contains("IDENTITY_INSERT"));
    }

    #[test]
    fn test_create_table_inlines_single_identity_key() {
        let schema = users_posts();
        let files = generator().generate_migrations(&schema, None).unwrap();
        let create = &files[0].content;
        assert!(create.contains("createTable(\"Users\""));
        assert!(create.contains("primaryKey: true"));
        assert!(create.contains("autoIncrement: true"));
        assert!(create.contains("type: Sequelize.INTEGER"));
        assert!(create.contains("dropTable(\"Users\")"));
    }

    #[test]
    fn test_foreign_keys_are_wrapped_individually() {
        let schema = users_posts();
        let files = generator().generate_migrations(&schema, None).unwrap();
        let fks = files
            .iter()
            .find(|f| f.file_name.ends_with("-add-fks-Posts.js"))
            .unwrap();
        assert!(fks.content.contains("type: 'foreign key'"));
        assert!(fks.content.contains("field: \"id\""));
        assert!(fks.content.contains("onDelete: \"CASCADE\""));
        assert!(fks.content.contains("onUpdate: \"NO ACTION\""));
        assert_eq!(fks.content.matches("try {").count(), 2);
    }

    #[test]
    fn test_disable_identity_scenario() {
        let schema = users_posts();
        let data = vec![users_data(&schema, true)];
        let files = sorted(generator().generate_migrations(&schema, Some(&data)).unwrap());

        let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert!(names[0].ends_with("-create-Users.js"));
        assert!(names[1].ends_with("-add-primary-key-Users.js"));
        assert!(names[2].ends_with("-seed-Users.js"));
        assert!(names[3].ends_with("-enable-identity-Users.js"));

        assert!(!files[0].content.contains("primaryKey: true"));
        assert!(!files[0].content.contains("autoIncrement: true"));
        assert!(files[1].content.contains("name: \"pk_users\""));

        // SQL Server keeps IDENTITY from the create, so the toggle and reseed
        // guarded by TableHasIdentity take effect.
        let create = &files[0].content;
        let dialect = create.find("const dialect = queryInterface.sequelize.getDialect();").unwrap();
        assert!(dialect < create.find("createTable").unwrap());
        assert!(create.contains("autoIncrement: dialect === 'mssql'"));

        let seed = &files[2].content;
        assert!(seed.contains("\"id\": 1"));
        let on = seed.find("SET IDENTITY_INSERT [Users] ON").unwrap();
        let insert = seed.find("bulkInsert").unwrap();
        let off = seed.find("SET IDENTITY_INSERT [Users] OFF").unwrap();
        assert!(on < insert && insert < off);
        assert!(seed.contains("TableHasIdentity"));

        let identity = &files[3].content;
        assert!(identity.contains("CREATE SEQUENCE IF NOT EXISTS"));
        assert!(identity.contains("SELECT setval(pg_get_serial_sequence"));
        assert!(identity.contains("AUTO_INCREMENT"));
        assert!(identity.contains("DBCC CHECKIDENT"));
    }

    #[test]
    fn test_data_migrations_shift_base_and_only_resync() {
        let schema = users_posts();
        let data = vec![users_data(&schema, true)];
        let files = generator().generate_data_migrations(&data).unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].file_name, "20240115103010000001-seed-users.js");
        assert_eq!(
            files[1].file_name,
            "20240115103010000002-enable-identity-users.js"
        );
        assert!(files[0].content.contains("SET IDENTITY_INSERT [users] ON"));
        assert!(files[1].content.contains("SELECT setval"));
        assert!(!files[1].content.contains("CREATE SEQUENCE"));
        assert!(!files[1].content.contains("MODIFY"));
    }

    #[test]
    fn test_data_migrations_without_identity_have_no_resync() {
        let schema = users_posts();
        let data = vec![users_data(&schema, false)];
        let files = generator().generate_data_migrations(&data).unwrap();
        assert_eq!(files.len(), 1);
        assert!(!files[0].content.contains("\"id\""));
    }

    #[test]
    fn test_frozen_clock_is_deterministic() {
        let schema = users_posts();
        let data = vec![users_data(&schema, true)];
        let g = generator();
        assert_eq!(
            g.generate_migrations(&schema, Some(&data)).unwrap(),
            g.generate_migrations(&schema, Some(&data)).unwrap()
        );
        assert_eq!(g.generate(&schema).unwrap(), g.generate(&schema).unwrap());
    }

    #[test]
    fn test_no_forward_references_when_acyclic() {
        let schema = users_posts();
        let files = sorted(generator().generate_migrations(&schema, None).unwrap());
        let mut created: Vec<String> = Vec::new();
        for file in &files {
            if let Some(table) = file
                .file_name
                .split_once("-create-")
                .map(|(_, rest)| rest.trim_end_matches(".js").to_string())
            {
                created.push(table);
            }
            if let Some((_, rest)) = file.file_name.split_once("-add-fks-") {
                let owner = schema.find_table(rest.trim_end_matches(".js")).unwrap();
                for fk in &owner.foreign_keys {
                    assert!(created.contains(&fk.referenced_table));
                }
            }
        }
    }

    #[test]
    fn test_two_way_cycle_emits_forward_reference() {
        // Known limitation: the first table of a cycle is created last, so the
        // partner's foreign keys are added before the referenced table exists.
        let mut schema = users_posts();
        let users = schema
            .tables
            .iter_mut()
            .find(|t| t.name == "Users")
            .unwrap();
        users.columns.push(ColumnMetadata::new("lastPostId", "int"));
        users.foreign_keys.push(crate::core::schema::ForeignKeyMetadata {
            name: "fk_users_last_post".into(),
            table_name: "Users".into(),
            columns: vec!["lastPostId".into()],
            referenced_table: "Posts".into(),
            referenced_columns: vec!["id".into()],
            update_rule: None,
            delete_rule: None,
        });

        let files = sorted(generator().generate_migrations(&schema, None).unwrap());
        let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
        assert!(names[0].ends_with("-create-Users.js"));
        assert!(names[1].ends_with("-add-fks-Users.js"));
        assert!(names[2].ends_with("-create-Posts.js"));
    }

    #[test]
    fn test_model_file() {
        let mut schema = users_posts();
        schema.tables[1].indexes.push(IndexMetadata {
            name: "ux_users_name".into(),
            columns: vec!["name".into()],
            is_unique: true,
            is_primary: false,
        });
        let files = generator().generate(&schema).unwrap();
        let users = files.iter().find(|f| f.file_name == "Users.ts").unwrap();
        assert!(users.content.contains("export class Users extends Model {}"));
        assert!(users.content.contains("tableName: \"Users\""));
        assert!(users.content.contains("name: \"ux_users_name\", unique: true"));
        assert!(users.content.contains("type: DataTypes.INTEGER"));
    }

    #[test]
    fn test_auto_increment_default_is_not_emitted() {
        let mut schema = users_posts();
        for table in &mut schema.tables {
            table.columns[0].has_default = true;
            table.columns[0].default_value = Some("nextval('users_id_seq'::regclass)".into());
        }
        let files = generator().generate_migrations(&schema, None).unwrap();
        assert!(files.iter().all(|f| !f.content.contains("nextval('users_id_seq'")));
    }
}

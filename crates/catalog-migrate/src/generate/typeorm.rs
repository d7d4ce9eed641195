//! TypeORM entities and migrations.
//!
//! Migration files are named `{ms}-{Kind}{Class}{ms}.ts`, where `ms` is the
//! clock in epoch milliseconds plus a per-file counter. The class name carries
//! the same suffix because TypeORM orders migrations by it.

use heck::ToLowerCamelCase;

use crate::core::schema::{ColumnMetadata, DatabaseSchema, Row, TableData, TableMetadata};
use crate::error::Result;

use super::plan::{plan_data, plan_schema, KeyFlags, Step};
use super::sequelize::{mssql_identity_insert, IdentitySql};
use super::typemap::{classify, TypeCategory};
use super::{
    class_name, indent_tail, js_str, js_str_list, Clock, GeneratedFile, MigrationGenerator,
    SchemaGenerator,
};

/// Offset of data-only migrations, so they sort after schema migrations.
const DATA_OFFSET_MS: i64 = 10_000;

/// TypeORM profile.
#[derive(Debug, Clone, Default)]
pub struct TypeOrmGenerator {
    clock: Clock,
}

impl TypeOrmGenerator {
    pub fn new(clock: Clock) -> Self {
        Self { clock }
    }

    fn render(&self, steps: Vec<Step<'_>>, offset_ms: i64) -> Result<Vec<GeneratedFile>> {
        let base = self.clock.now().timestamp_millis() + offset_ms;

        let mut files = Vec::with_capacity(steps.len());
        for (i, step) in steps.iter().enumerate() {
            let stamp = base + i as i64 + 1;
            let kind = match step {
                Step::CreateTable { .. } => "Create",
                Step::AddPrimaryKey { .. } => "AddPrimaryKey",
                Step::AddForeignKeys { .. } => "AddForeignKeys",
                Step::Seed { .. } => "Seed",
                Step::EnableIdentity { .. } => "EnableIdentity",
            };
            let migration_name = format!("{}{}{}", kind, class_name(step.table_name()), stamp);

            let (imports, up, down) = match step {
                Step::CreateTable { table, keys } => create_table(table, *keys),
                Step::AddPrimaryKey { table, index } => {
                    add_primary_key(&table.name, &index.name, &index.columns)
                }
                Step::AddForeignKeys { table } => add_foreign_keys(table),
                Step::Seed {
                    table_name,
                    rows,
                    identity_insert,
                } => seed(table_name, rows, *identity_insert)?,
                Step::EnableIdentity {
                    table_name,
                    column,
                    restore,
                } => enable_identity(table_name, column, *restore)?,
            };

            files.push(GeneratedFile::new(
                format!("{}-{}.ts", stamp, migration_name),
                migration(&migration_name, imports, &up, &down),
            ));
        }
        Ok(files)
    }
}

impl SchemaGenerator for TypeOrmGenerator {
    fn generate(&self, schema: &DatabaseSchema) -> Result<Vec<GeneratedFile>> {
        Ok(schema
            .tables
            .iter()
            .map(|table| {
                let class = class_name(&table.name);
                GeneratedFile::new(format!("{}.ts", class), entity(table, &class))
            })
            .collect())
    }
}

impl MigrationGenerator for TypeOrmGenerator {
    fn generate_migrations(
        &self,
        schema: &DatabaseSchema,
        data: Option<&[TableData]>,
    ) -> Result<Vec<GeneratedFile>> {
        self.render(plan_schema(schema, data), 0)
    }

    fn generate_data_migrations(&self, data: &[TableData]) -> Result<Vec<GeneratedFile>> {
        self.render(plan_data(data), DATA_OFFSET_MS)
    }
}

/// Column type name as TypeORM understands it.
fn column_type(category: TypeCategory) -> &'static str {
    match category {
        TypeCategory::Boolean => "boolean",
        TypeCategory::TinyInt | TypeCategory::SmallInt => "smallint",
        TypeCategory::MediumInt | TypeCategory::Integer => "int",
        TypeCategory::BigInt => "bigint",
        TypeCategory::Float => "float",
        TypeCategory::Double => "double precision",
        TypeCategory::Decimal(_) => "decimal",
        TypeCategory::DateOnly => "date",
        TypeCategory::Time => "time",
        TypeCategory::Timestamp => "timestamp",
        TypeCategory::Json => "json",
        TypeCategory::Text => "text",
        TypeCategory::String(_) | TypeCategory::Fallback => "varchar",
        TypeCategory::Binary => "blob",
        TypeCategory::Uuid => "uuid",
    }
}

/// TypeScript property type. Drivers hand back 64-bit and exact numerics as strings.
fn ts_type(category: TypeCategory) -> &'static str {
    match category {
        TypeCategory::Boolean => "boolean",
        TypeCategory::BigInt | TypeCategory::Decimal(_) | TypeCategory::Time => "string",
        c if c.is_integer() => "number",
        TypeCategory::Float | TypeCategory::Double => "number",
        TypeCategory::DateOnly | TypeCategory::Timestamp => "Date",
        TypeCategory::Json => "unknown",
        TypeCategory::Binary => "Buffer",
        _ => "string",
    }
}

fn property_name(column: &str) -> String {
    let name = column.to_lower_camel_case();
    match name.chars().next() {
        Some(c) if c.is_ascii_digit() => format!("_{}", name),
        Some(_) => name,
        None => "column".to_string(),
    }
}

fn entity(table: &TableMetadata, class: &str) -> String {
    let mut decorators = vec!["Column"];
    let mut header = vec![format!("@Entity({{ name: {} }})", js_str(&table.name))];
    for idx in table.secondary_indexes() {
        decorators.push("Index");
        header.push(format!(
            "@Index({}, {}, {{ unique: {} }})",
            js_str(&idx.name),
            js_str_list(&idx.columns),
            idx.is_unique
        ));
    }

    let single_generated = table.auto_increment_columns().count() == 1;
    let mut fields = Vec::with_capacity(table.columns.len());
    for column in &table.columns {
        let category = classify(column);
        let mut options = vec![
            format!("name: {}", js_str(&column.name)),
            format!("type: {}", js_str(column_type(category))),
        ];

        let decorator = if column.is_primary_key && column.is_auto_increment && single_generated {
            decorators.push("PrimaryGeneratedColumn");
            "PrimaryGeneratedColumn"
        } else if column.is_primary_key {
            decorators.push("PrimaryColumn");
            "PrimaryColumn"
        } else {
            options.push(format!("nullable: {}", column.is_nullable));
            if column.is_unique && !table.has_unique_index_on(&column.name) {
                options.push("unique: true".to_string());
            }
            "Column"
        };

        match category {
            TypeCategory::String(Some(n)) => options.push(format!("length: {}", n)),
            TypeCategory::Decimal(Some((p, s))) => {
                options.push(format!("precision: {}", p));
                options.push(format!("scale: {}", s));
            }
            _ => {}
        }
        if let Some(default) = column.default_value.as_deref() {
            if !column.is_auto_increment {
                options.push(format!("default: () => {}", js_str(default)));
            }
        }

        let optional = if column.is_nullable && !column.is_primary_key {
            format!("{} | null", ts_type(category))
        } else {
            ts_type(category).to_string()
        };
        fields.push(format!(
            "  @{}({{ {} }})\n  {}!: {};",
            decorator,
            options.join(", "),
            property_name(&column.name),
            optional
        ));
    }

    decorators.push("Entity");
    decorators.sort_unstable();
    decorators.dedup();

    format!(
        "import {{ {} }} from 'typeorm';\n\n{}\nexport class {} {{\n{}\n}}\n",
        decorators.join(", "),
        header.join("\n"),
        class,
        fields.join("\n\n")
    )
}

fn migration(name: &str, imports: &[&str], up: &str, down: &str) -> String {
    let mut names = vec!["MigrationInterface", "QueryRunner"];
    names.extend_from_slice(imports);

    format!(
        r#"import {{ {imports} }} from 'typeorm';

export class {name} implements MigrationInterface {{
  name = {quoted};

  public async up(queryRunner: QueryRunner): Promise<void> {{
{up}
  }}

  public async down(queryRunner: QueryRunner): Promise<void> {{
{down}
  }}
}}
"#,
        imports = names.join(", "),
        name = name,
        quoted = js_str(name),
        up = up,
        down = down
    )
}

type Rendered = (&'static [&'static str], String, String);

fn table_column(table: &TableMetadata, column: &ColumnMetadata, keys: KeyFlags) -> String {
    let category = classify(column);
    let mut options = vec![
        format!("name: {}", js_str(&column.name)),
        format!("type: {}", js_str(column_type(category))),
    ];
    if keys.inline_primary_key() && column.is_primary_key {
        options.push("isPrimary: true".to_string());
    }
    if column.is_auto_increment {
        let generated = match keys {
            KeyFlags::Inline => Some("true"),
            KeyFlags::MssqlIdentityOnly => Some("driver === 'mssql'"),
            KeyFlags::Deferred => None,
        };
        if let Some(generated) = generated {
            options.push(format!("isGenerated: {}", generated));
            options.push("generationStrategy: 'increment'".to_string());
        }
    }
    options.push(format!("isNullable: {}", column.is_nullable));
    if column.is_unique && !table.has_unique_index_on(&column.name) {
        options.push("isUnique: true".to_string());
    }
    match category {
        TypeCategory::String(Some(n)) => options.push(format!("length: {}", js_str(&n.to_string()))),
        TypeCategory::Decimal(Some((p, s))) => {
            options.push(format!("precision: {}", p));
            options.push(format!("scale: {}", s));
        }
        _ => {}
    }
    if let Some(default) = column.default_value.as_deref() {
        if !column.is_auto_increment {
            options.push(format!("default: {}", js_str(default)));
        }
    }

    format!(
        "          {{\n{}\n          }}",
        options
            .iter()
            .map(|o| format!("            {}", o))
            .collect::<Vec<_>>()
            .join(",\n")
    )
}

fn create_table(table: &TableMetadata, keys: KeyFlags) -> Rendered {
    let name = js_str(&table.name);
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|column| table_column(table, column, keys))
        .collect();

    let mut up = String::new();
    if keys == KeyFlags::MssqlIdentityOnly {
        up.push_str("    const driver = queryRunner.connection.driver.options.type;\n");
    }
    up.push_str(&format!(
        "    await queryRunner.createTable(\n      new Table({{\n        name: {},\n        columns: [\n{}\n        ],\n      }}),\n      true,\n    );",
        name,
        columns.join(",\n")
    ));
    for idx in table.secondary_indexes() {
        up.push_str(&format!(
            "\n    await queryRunner.createIndex(\n      {},\n      new TableIndex({{ name: {}, columnNames: {}, isUnique: {} }}),\n    );",
            name,
            js_str(&idx.name),
            js_str_list(&idx.columns),
            idx.is_unique
        ));
    }

    (
        &["Table", "TableIndex"],
        up,
        format!("    await queryRunner.dropTable({}, true);", name),
    )
}

fn add_primary_key(table: &str, constraint: &str, columns: &[String]) -> Rendered {
    let up = format!(
        r#"    try {{
      await queryRunner.createPrimaryKey({table}, {columns}, {name});
    }} catch (error) {{
      console.warn({warn}, (error as Error).message);
    }}"#,
        table = js_str(table),
        columns = js_str_list(columns),
        name = js_str(constraint),
        warn = js_str(&format!("Skipping primary key {} on {}:", constraint, table)),
    );
    let down = format!(
        r#"    try {{
      await queryRunner.dropPrimaryKey({table}, {name});
    }} catch (error) {{
      console.warn({warn}, (error as Error).message);
    }}"#,
        table = js_str(table),
        name = js_str(constraint),
        warn = js_str(&format!(
            "Skipping primary key removal {} on {}:",
            constraint, table
        )),
    );
    let imports: &'static [&'static str] = &[];
    (imports, up, down)
}

fn add_foreign_keys(table: &TableMetadata) -> Rendered {
    let name = js_str(&table.name);

    let up: Vec<String> = table
        .foreign_keys
        .iter()
        .map(|fk| {
            format!(
                r#"    try {{
      await queryRunner.createForeignKey(
        {table},
        new TableForeignKey({{
          name: {fk},
          columnNames: {columns},
          referencedTableName: {referenced},
          referencedColumnNames: {referenced_columns},
          onDelete: {on_delete},
          onUpdate: {on_update},
        }}),
      );
    }} catch (error) {{
      console.warn({warn}, (error as Error).message);
    }}"#,
                table = name,
                fk = js_str(&fk.name),
                columns = js_str_list(&fk.columns),
                referenced = js_str(&fk.referenced_table),
                referenced_columns = js_str_list(&fk.referenced_columns),
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
      await queryRunner.dropForeignKey({table}, {fk});
    }} catch (error) {{
      console.warn({warn}, (error as Error).message);
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

    (&["TableForeignKey"], up.join("\n"), down.join("\n"))
}

fn seed(table: &str, rows: &[Row], identity_insert: bool) -> Result<Rendered> {
    let name = js_str(table);
    let rows_json = indent_tail(&serde_json::to_string_pretty(rows)?, 4);

    let (toggle_on, toggle_off) = if identity_insert {
        (
            format!(
                "      if (driver === 'mssql') {{\n        await queryRunner.query({});\n      }}\n",
                js_str(&mssql_identity_insert(table, true)?)
            ),
            format!(
                "      if (driver === 'mssql') {{\n        await queryRunner.query({});\n      }}\n",
                js_str(&mssql_identity_insert(table, false)?)
            ),
        )
    } else {
        (String::new(), String::new())
    };

    let up = format!(
        r#"    const rows = {rows};
    if (rows.length === 0) {{
      return;
    }}
    const driver = queryRunner.connection.driver.options.type;
    const ownsTransaction = !queryRunner.isTransactionActive;
    if (ownsTransaction) {{
      await queryRunner.startTransaction();
    }}
    try {{
{toggle_on}      await queryRunner.manager
        .createQueryBuilder()
        .insert()
        .into({table})
        .values(rows)
        .execute();
{toggle_off}      if (ownsTransaction) {{
        await queryRunner.commitTransaction();
      }}
    }} catch (error) {{
      if (ownsTransaction) {{
        await queryRunner.rollbackTransaction();
      }}
      throw error;
    }}"#,
        rows = rows_json,
        toggle_on = toggle_on,
        toggle_off = toggle_off,
        table = name,
    );
    let down = format!(
        "    await queryRunner.manager.createQueryBuilder().delete().from({}).execute();",
        name
    );
    let imports: &'static [&'static str] = &[];
    Ok((imports, up, down))
}

fn enable_identity(table: &str, column: &ColumnMetadata, restore: bool) -> Result<Rendered> {
    let sql = IdentitySql::new(table, column)?;
    let query = |statement: &str| format!("      await queryRunner.query({});\n", js_str(statement));

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
        "      const result = await queryRunner.query({});\n      \
         await queryRunner.query({} + result[0].next);\n",
        js_str(&sql.mysql_next),
        js_str(&sql.mysql_alter_prefix)
    ));
    let mssql = query(&sql.mssql_reseed);

    let up = format!(
        r#"    const driver = queryRunner.connection.driver.options.type;
    if (driver === 'postgres') {{
{postgres}    }} else if (driver === 'mysql' || driver === 'mariadb') {{
{mysql}    }} else if (driver === 'mssql') {{
{mssql}    }}"#,
        postgres = postgres,
        mysql = mysql,
        mssql = mssql,
    );
    let imports: &'static [&'static str] = &[];
    Ok((
        imports,
        up,
        "    // Identity generators are not rolled back.".to_string(),
    ))
}

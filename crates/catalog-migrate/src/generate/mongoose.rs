//! Mongoose schema generation (models only).

use crate::core::schema::{ColumnMetadata, DatabaseSchema, TableMetadata};
use crate::error::Result;

use super::typemap::{classify, TypeCategory};
use super::{class_name, js_str, GeneratedFile, SchemaGenerator};

/// Mongoose profile. One `{Class}.ts` per table.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongooseGenerator;

impl SchemaGenerator for MongooseGenerator {
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

/// Schema type and interface type for a column.
fn types(category: TypeCategory) -> (&'static str, &'static str) {
    match category {
        TypeCategory::Boolean => ("Boolean", "boolean"),
        TypeCategory::Decimal(_) => ("Schema.Types.Decimal128", "Types.Decimal128"),
        TypeCategory::Float | TypeCategory::Double => ("Number", "number"),
        c if c.is_integer() => ("Number", "number"),
        TypeCategory::DateOnly | TypeCategory::Timestamp => ("Date", "Date"),
        TypeCategory::Json => ("Schema.Types.Mixed", "unknown"),
        TypeCategory::Binary => ("Buffer", "Buffer"),
        _ => ("String", "string"),
    }
}

/// A default usable as a literal; expressions such as `now()` are skipped.
fn literal_default(column: &ColumnMetadata, category: TypeCategory) -> Option<String> {
    let raw = column.default_value.as_deref()?.trim();
    if raw.contains('(') || column.is_auto_increment {
        return None;
    }
    let unquoted = raw.trim_matches('\'');
    match category {
        TypeCategory::Boolean => match unquoted.to_lowercase().as_str() {
            "1" | "true" => Some("true".to_string()),
            "0" | "false" => Some("false".to_string()),
            _ => None,
        },
        TypeCategory::Float | TypeCategory::Double => {
            unquoted.parse::<f64>().ok().map(|_| unquoted.to_string())
        }
        c if c.is_integer() => unquoted.parse::<i64>().ok().map(|_| unquoted.to_string()),
        TypeCategory::String(_) | TypeCategory::Text | TypeCategory::Uuid => {
            // Drop PostgreSQL casts such as 'draft'::character varying.
            let value = raw.split("::").next().unwrap_or(raw).trim_matches('\'');
            Some(js_str(value))
        }
        _ => None,
    }
}

fn model(table: &TableMetadata, class: &str) -> String {
    let mut interface = Vec::with_capacity(table.columns.len());
    let mut fields = Vec::with_capacity(table.columns.len());

    for column in &table.columns {
        let category = classify(column);
        let (schema_type, ts_type) = types(category);
        let optional = if column.is_nullable { "?" } else { "" };
        interface.push(format!(
            "  {}{}: {};",
            js_str(&column.name),
            optional,
            ts_type
        ));

        let mut options = vec![format!("type: {}", schema_type)];
        if !column.is_nullable {
            options.push("required: true".to_string());
        }
        if column.is_unique && !table.has_unique_index_on(&column.name) {
            options.push("unique: true".to_string());
        }
        if let Some(default) = literal_default(column, category) {
            options.push(format!("default: {}", default));
        }
        fields.push(format!(
            "    {}: {{ {} }}",
            js_str(&column.name),
            options.join(", ")
        ));
    }

    let indexes: Vec<String> = table
        .indexes
        .iter()
        .map(|idx| {
            let keys: Vec<String> = idx
                .columns
                .iter()
                .map(|c| format!("{}: 1", js_str(c)))
                .collect();
            format!(
                "{}Schema.index({{ {} }}, {{ name: {}, unique: {} }});\n",
                class,
                keys.join(", "),
                js_str(&idx.name),
                idx.is_unique
            )
        })
        .collect();

    format!(
        r#"import {{ Document, Schema, Types, model }} from 'mongoose';

export interface I{class} extends Document {{
{interface}
}}

const {class}Schema = new Schema<I{class}>(
  {{
{fields}
  }},
  {{ collection: {collection}, timestamps: false }},
);

{indexes}
export const {class} = model<I{class}>({model_name}, {class}Schema);
"#,
        class = class,
        interface = interface.join("\n"),
        fields = fields.join(",\n"),
        collection = js_str(&table.name),
        indexes = indexes.concat(),
        model_name = js_str(class),
    )
}

//! Dialect-native type classification shared by every generator profile.
//!
//! Native type names are matched by lowercase substring in a fixed order;
//! each profile then renders a [`TypeCategory`] in its own vocabulary.

use crate::core::schema::{CharLength, ColumnMetadata};

/// Portable classification of a native column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Boolean,
    TinyInt,
    SmallInt,
    MediumInt,
    BigInt,
    Integer,
    Float,
    Double,
    /// Precision and scale, present only when both are known.
    Decimal(Option<(u32, u32)>),
    DateOnly,
    Time,
    Timestamp,
    Json,
    Text,
    /// Bounded character type, length when known.
    String(Option<u32>),
    Binary,
    Uuid,
    Fallback,
}

impl TypeCategory {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            TypeCategory::TinyInt
                | TypeCategory::SmallInt
                | TypeCategory::MediumInt
                | TypeCategory::BigInt
                | TypeCategory::Integer
        )
    }

    /// MySQL integer type used when re-declaring an `AUTO_INCREMENT` column.
    pub fn mysql_integer(&self) -> &'static str {
        match self {
            TypeCategory::TinyInt => "TINYINT",
            TypeCategory::SmallInt => "SMALLINT",
            TypeCategory::MediumInt => "MEDIUMINT",
            TypeCategory::BigInt => "BIGINT",
            _ => "INT",
        }
    }
}

/// Classify a column from its native type name, length, precision and scale.
pub fn classify(column: &ColumnMetadata) -> TypeCategory {
    let lower = column.data_type.trim().to_lowercase();

    if lower == "bit" || lower.contains("bool") {
        return TypeCategory::Boolean;
    }

    // Contain "int" without being integers.
    if lower.contains("interval") || lower.contains("point") {
        return TypeCategory::Fallback;
    }

    if lower.contains("tinyint") {
        return TypeCategory::TinyInt;
    }
    if lower.contains("smallint") {
        return TypeCategory::SmallInt;
    }
    if lower.contains("mediumint") {
        return TypeCategory::MediumInt;
    }
    if lower.contains("bigint") {
        return TypeCategory::BigInt;
    }
    if lower.contains("int") {
        return TypeCategory::Integer;
    }

    if lower.contains("float") || lower.contains("real") {
        return TypeCategory::Float;
    }
    if lower.contains("double") {
        return TypeCategory::Double;
    }
    if lower.contains("decimal") || lower.contains("numeric") || lower.contains("money") {
        return TypeCategory::Decimal(column.numeric_precision.zip(column.numeric_scale));
    }

    if lower == "date" {
        return TypeCategory::DateOnly;
    }
    if lower == "time" {
        return TypeCategory::Time;
    }
    if lower.contains("date") || lower.contains("time") {
        return TypeCategory::Timestamp;
    }

    if lower.contains("json") {
        return TypeCategory::Json;
    }

    if lower.contains("text") || lower.contains("image") || lower.contains("xml") {
        return TypeCategory::Text;
    }

    if lower.contains("char") {
        return match column.max_length {
            Some(CharLength::Unbounded) => TypeCategory::Text,
            Some(CharLength::Bounded(n)) => TypeCategory::String(Some(n)),
            None => TypeCategory::String(None),
        };
    }

    if lower.contains("binary") || lower.contains("blob") || lower.contains("bytea") {
        return TypeCategory::Binary;
    }

    if lower.contains("uuid") || lower.contains("guid") || lower.contains("uniqueidentifier") {
        return TypeCategory::Uuid;
    }

    TypeCategory::Fallback
}

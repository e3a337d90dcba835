use crate::row::RawRow;
use crate::schema::Schema;

/// Outcome of checking one row against the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowVerdict {
    pub row: RawRow,
    /// Columns whose check failed, in schema order. Empty iff the row is valid.
    pub failed_fields: Vec<&'static str>,
}

impl RowVerdict {
    pub fn is_valid(&self) -> bool {
        self.failed_fields.is_empty()
    }
}

/// Run every column validator of `schema` against `row`.
///
/// A column the row does not carry counts as a failure for that column.
pub fn validate_row(row: RawRow, schema: &Schema) -> RowVerdict {
    let failed_fields = schema
        .columns()
        .iter()
        .filter_map(|col| {
            let check = col.kind.validator()?;
            match row.get(col.name) {
                Some(value) if check(value) => None,
                _ => Some(col.name),
            }
        })
        .collect();

    RowVerdict { row, failed_fields }
}

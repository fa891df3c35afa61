//! CSV rendering and SQL-schema metadata for generated reports.
//!
//! Reports are uploaded as CSV with a metadata blob that tells the remote
//! store how to query them:
//!
//! ```json
//! {
//!   "query_type": "sql",
//!   "sql_schema": { "table_name": "...", "columns": [{ "name": "date", "type": "DATE" }] },
//!   "sql_description": "..."
//! }
//! ```

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct SqlColumn {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub sql_type: &'static str,
}

impl SqlColumn {
    pub const fn new(name: &'static str, sql_type: &'static str) -> Self {
        Self { name, sql_type }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SqlSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    pub columns: Vec<SqlColumn>,
}

impl SqlSchema {
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }
}

/// Build the `{query_type, sql_schema, sql_description}` metadata object.
pub fn sql_metadata(schema: &SqlSchema, description: &str) -> Value {
    serde_json::json!({
        "query_type": "sql",
        "sql_schema": schema,
        "sql_description": description,
    })
}

/// Quote a field if it contains a comma, quote, or line break.
pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render a header line plus one line per row, each terminated by `\n`.
///
/// No rows renders as an empty string, so an empty report is skipped by the
/// engine instead of replacing a populated remote document.
pub fn to_csv<R>(headers: &[&str], rows: R) -> String
where
    R: IntoIterator<Item = Vec<String>>,
{
    let mut rows = rows.into_iter().peekable();
    if rows.peek().is_none() {
        return String::new();
    }

    let mut out = String::new();
    out.push_str(
        &headers
            .iter()
            .map(|h| csv_field(h))
            .collect::<Vec<_>>()
            .join(","),
    );
    out.push('\n');
    for row in rows {
        out.push_str(
            &row.iter()
                .map(|v| csv_field(v))
                .collect::<Vec<_>>()
                .join(","),
        );
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_field_escaping() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("Hiking, Camping"), "\"Hiking, Camping\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_to_csv_shape() {
        let csv = to_csv(
            &["a", "b"],
            vec![
                vec!["1".to_string(), "x,y".to_string()],
                vec!["2".to_string(), String::new()],
            ],
        );
        assert_eq!(csv, "a,b\n1,\"x,y\"\n2,\n");
    }

    #[test]
    fn test_to_csv_without_rows_is_empty() {
        let csv = to_csv(&["a", "b"], Vec::<Vec<String>>::new());
        assert!(csv.is_empty());
    }

    #[test]
    fn test_header_only_when_no_rows() {
        assert_eq!(to_csv(&["a"], Vec::<Vec<String>>::new()), "a\n");
    }

    #[test]
    fn test_sql_metadata_shape() {
        let schema = SqlSchema {
            table_name: None,
            columns: vec![SqlColumn::new("date", "DATE")],
        };
        let meta = sql_metadata(&schema, "desc");
        assert_eq!(meta["query_type"], "sql");
        assert_eq!(meta["sql_schema"]["columns"][0]["type"], "DATE");
        assert!(meta["sql_schema"].get("table_name").is_none());
        assert_eq!(meta["sql_description"], "desc");
    }
}

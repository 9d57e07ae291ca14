//! CSV and JSON serialization of exported rows.

use std::fmt;

use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::DataSourceError;
use crate::filter::stringify;

/// Output format for an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// MIME type of the produced blob.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
        }
    }

    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A serialized export ready to be saved or downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutput {
    /// Serialized content.
    pub bytes: Vec<u8>,
    /// `text/csv` or `application/json`.
    pub mime_type: &'static str,
    /// Suggested file name, `export-<unix-millis>.<ext>`.
    pub filename: String,
}

impl ExportOutput {
    /// Serializes `rows` in `format`.
    pub fn from_rows(rows: &[Value], format: ExportFormat) -> Result<Self, DataSourceError> {
        let body = match format {
            ExportFormat::Csv => export_to_csv(rows)?,
            ExportFormat::Json => export_to_json(rows)?,
        };
        Ok(Self {
            bytes: body.into_bytes(),
            mime_type: format.mime_type(),
            filename: format!("export-{}.{}", Utc::now().timestamp_millis(), format.extension()),
        })
    }

    /// Content as UTF-8 text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Writes rows as CSV with a header taken from the first row's keys.
///
/// Fields containing a comma, quote or line break are quoted and embedded
/// quotes doubled. Keys missing from later rows become empty cells.
pub fn export_to_csv(rows: &[Value]) -> Result<String, DataSourceError> {
    let Some(first) = rows.first() else {
        return Ok(String::new());
    };
    let headers: Vec<String> = match first {
        Value::Object(map) => map.keys().cloned().collect(),
        _ => return Err(DataSourceError::InvalidQuery("CSV export requires object rows".to_string())),
    };

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(&headers)?;
    for row in rows {
        let record = headers
            .iter()
            .map(|h| row.get(h).map(stringify).unwrap_or_default());
        writer.write_record(record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DataSourceError::parse(format!("CSV writer flush failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| DataSourceError::parse(e.to_string()))
}

/// Writes rows as a pretty-printed JSON array.
pub fn export_to_json(rows: &[Value]) -> Result<String, DataSourceError> {
    Ok(serde_json::to_string_pretty(rows)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_csv_quotes_commas() {
        let csv = export_to_csv(&[json!({ "a": 1, "b": "x,y" })]).unwrap();
        assert_eq!(csv, "a,b\n1,\"x,y\"\n");
    }

    #[test]
    fn test_csv_doubles_quotes_and_keeps_newlines() {
        let csv = export_to_csv(&[json!({ "quote": "say \"hi\"", "note": "line1\nline2" })]).unwrap();
        assert_eq!(csv, "quote,note\n\"say \"\"hi\"\"\",\"line1\nline2\"\n");
    }

    #[test]
    fn test_csv_header_from_first_row() {
        let rows = [json!({ "z": 1, "a": null }), json!({ "a": true, "extra": 9 })];
        let csv = export_to_csv(&rows).unwrap();
        assert_eq!(csv, "z,a\n1,\n,true\n");
    }

    #[test]
    fn test_csv_nested_values_as_json() {
        let csv = export_to_csv(&[json!({ "tags": ["a", "b"] })]).unwrap();
        assert_eq!(csv, "tags\n\"[\"\"a\"\",\"\"b\"\"]\"\n");
    }

    #[test]
    fn test_empty_exports() {
        assert_eq!(export_to_csv(&[]).unwrap(), "");
        assert_eq!(export_to_json(&[]).unwrap(), "[]");
    }

    #[test]
    fn test_json_round_trip() {
        let rows = vec![json!({ "a": 1, "b": "x,y" }), json!({ "a": 2, "b": null })];
        let text = export_to_json(&rows).unwrap();
        assert!(text.contains('\n'));
        let back: Vec<Value> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn test_output_metadata() {
        let output = ExportOutput::from_rows(&[json!({ "a": 1 })], ExportFormat::Csv).unwrap();
        assert_eq!(output.mime_type, "text/csv");
        assert!(output.filename.starts_with("export-"));
        assert!(output.filename.ends_with(".csv"));
        assert_eq!(output.text(), "a\n1\n");
    }
}

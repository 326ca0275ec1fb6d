//! Printing query results

use clap::ValueEnum;
use serde_json::Value;
use sqlwrap_types::{QueryOutput, Rows};
use std::io::Write;

/// How results are written to stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// Tab-separated rows
    Text,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Text => "text",
        }
    }
}

/// Write `output` in the requested format
pub fn write_output(
    out: &mut dyn Write,
    output: &QueryOutput,
    format: OutputFormat,
) -> std::io::Result<()> {
    match format {
        OutputFormat::Json => {
            let payload = match output {
                QueryOutput::Ack => Value::Bool(true),
                QueryOutput::Rows(rows) => rows_json(rows),
                QueryOutput::Columns(columns) => {
                    Value::Array(columns.iter().cloned().map(Value::Array).collect())
                }
                QueryOutput::ResultSets(sets) => Value::Array(sets.iter().map(rows_json).collect()),
            };
            serde_json::to_writer_pretty(&mut *out, &payload)?;
            writeln!(out)
        }
        OutputFormat::Text => match output {
            QueryOutput::Ack => writeln!(out, "OK"),
            QueryOutput::Rows(rows) => write_rows(out, rows),
            QueryOutput::Columns(columns) => {
                for column in columns {
                    writeln!(out, "{}", join(column.iter()))?;
                }
                Ok(())
            }
            QueryOutput::ResultSets(sets) => {
                for (index, rows) in sets.iter().enumerate() {
                    if index > 0 {
                        writeln!(out)?;
                    }
                    write_rows(out, rows)?;
                }
                Ok(())
            }
        },
    }
}

fn rows_json(rows: &Rows) -> Value {
    match rows {
        Rows::Tuples(rows) => Value::Array(rows.iter().cloned().map(Value::Array).collect()),
        Rows::Records(rows) => Value::Array(rows.iter().cloned().map(Value::Object).collect()),
    }
}

fn write_rows(out: &mut dyn Write, rows: &Rows) -> std::io::Result<()> {
    match rows {
        Rows::Tuples(rows) => {
            for row in rows {
                writeln!(out, "{}", join(row.iter()))?;
            }
        }
        Rows::Records(rows) => {
            if let Some(first) = rows.first() {
                writeln!(out, "{}", first.keys().cloned().collect::<Vec<_>>().join("\t"))?;
            }
            for row in rows {
                writeln!(out, "{}", join(row.values()))?;
            }
        }
    }
    Ok(())
}

fn join<'a>(values: impl Iterator<Item = &'a Value>) -> String {
    values.map(text_cell).collect::<Vec<_>>().join("\t")
}

fn text_cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(output: &QueryOutput, format: OutputFormat) -> String {
        let mut buf = Vec::new();
        write_output(&mut buf, output, format).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_json_rows() {
        let output = QueryOutput::Rows(Rows::Tuples(vec![vec![json!(1)]]));
        let parsed: Value = serde_json::from_str(&render(&output, OutputFormat::Json)).unwrap();
        assert_eq!(parsed, json!([[1]]));
    }

    #[test]
    fn test_json_ack() {
        assert_eq!(render(&QueryOutput::Ack, OutputFormat::Json).trim(), "true");
    }

    #[test]
    fn test_text_records_have_header() {
        let mut record = serde_json::Map::new();
        record.insert("extract".to_string(), json!("EXT001"));
        record.insert("rows".to_string(), json!(12));
        record.insert("note".to_string(), Value::Null);
        let output = QueryOutput::Rows(Rows::Records(vec![record]));

        assert_eq!(
            render(&output, OutputFormat::Text),
            "extract\trows\tnote\nEXT001\t12\tNULL\n"
        );
    }

    #[test]
    fn test_text_columns() {
        let output = QueryOutput::Columns(vec![vec![json!("a"), json!("b")], vec![]]);
        assert_eq!(render(&output, OutputFormat::Text), "a\tb\n\n");
    }
}

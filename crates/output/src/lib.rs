use std::io::{self, Write};

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use serde_json::{Map, Value};
use tabled::builder::Builder;
use tabled::settings::Style;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
    Csv,
    Quiet,
}

/// Renders command results to stdout in the selected format.
///
/// Lists become one row per element; a single object in table mode becomes a
/// two-column field/value table. Status lines go to stderr.
pub struct OutputRenderer {
    format: OutputFormat,
}

impl OutputRenderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn render<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.render_to(&mut out, value)
    }

    pub fn render_to<W: Write, T: Serialize + ?Sized>(&self, out: &mut W, value: &T) -> Result<()> {
        let json_value = serde_json::to_value(value)?;

        match self.format {
            OutputFormat::Table => self.render_table(out, &json_value)?,
            OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&json_value)?)?,
            OutputFormat::Yaml => write!(out, "{}", serde_yaml::to_string(&json_value)?)?,
            OutputFormat::Csv => self.render_csv(out, &json_value)?,
            OutputFormat::Quiet => self.render_quiet(out, &json_value)?,
        }

        Ok(())
    }

    /// Prints a green confirmation line to stderr.
    pub fn success(&self, message: impl AsRef<str>) {
        if self.format != OutputFormat::Quiet {
            eprintln!("{} {}", "✓".green().bold(), message.as_ref());
        }
    }

    /// Prints a yellow notice to stderr.
    pub fn notice(&self, message: impl AsRef<str>) {
        eprintln!("{} {}", "!".yellow().bold(), message.as_ref());
    }

    fn render_table<W: Write>(&self, out: &mut W, value: &Value) -> Result<()> {
        match value {
            Value::Array(rows) if rows.is_empty() => writeln!(out, "No results")?,
            Value::Object(obj) => {
                let mut builder = Builder::default();
                builder.push_record(["Field".to_string(), "Value".to_string()]);
                for (field, cell) in obj {
                    builder.push_record([field.clone(), Self::value_to_string(cell)]);
                }
                writeln!(out, "{}", builder.build().with(Style::rounded()))?;
            }
            _ => match Self::coerce_rows(value) {
                Some((headers, rows)) => {
                    let mut builder = Builder::default();
                    builder.push_record(headers);
                    for row in rows {
                        builder.push_record(row);
                    }
                    writeln!(out, "{}", builder.build().with(Style::rounded()))?;
                }
                None => writeln!(out, "{}", Self::plain(value)?)?,
            },
        }
        Ok(())
    }

    fn render_csv<W: Write>(&self, out: &mut W, value: &Value) -> Result<()> {
        let single;
        let value = match value {
            Value::Object(_) => {
                single = Value::Array(vec![value.clone()]);
                &single
            }
            other => other,
        };

        match Self::coerce_rows(value) {
            Some((headers, rows)) => {
                let mut writer = csv::Writer::from_writer(out);
                writer.write_record(&headers)?;
                for row in rows {
                    writer.write_record(&row)?;
                }
                writer.flush()?;
            }
            None if matches!(value, Value::Array(rows) if rows.is_empty()) => {}
            None => writeln!(out, "{}", Self::plain(value)?)?,
        }
        Ok(())
    }

    /// One identifier per line: `key` when present, then `id`, then the first field.
    fn render_quiet<W: Write>(&self, out: &mut W, value: &Value) -> Result<()> {
        let rows: Vec<&Value> = match value {
            Value::Array(rows) => rows.iter().collect(),
            Value::Null => Vec::new(),
            other => vec![other],
        };

        for row in rows {
            let line = match row {
                Value::Object(obj) => Self::identifier(obj),
                Value::Null => None,
                other => Some(Self::value_to_string(other)),
            };
            if let Some(line) = line {
                writeln!(out, "{line}")?;
            }
        }
        Ok(())
    }

    fn identifier(obj: &Map<String, Value>) -> Option<String> {
        ["key", "id"]
            .iter()
            .find_map(|field| obj.get(*field).filter(|v| !v.is_null()))
            .or_else(|| obj.values().next())
            .map(Self::value_to_string)
    }

    /// Headers in first-seen order across all rows.
    fn coerce_rows(value: &Value) -> Option<(Vec<String>, Vec<Vec<String>>)> {
        let rows = match value {
            Value::Array(rows) if !rows.is_empty() => rows,
            _ => return None,
        };

        let mut headers: Vec<String> = Vec::new();
        for row in rows {
            if let Value::Object(obj) = row {
                for key in obj.keys() {
                    if !headers.contains(key) {
                        headers.push(key.clone());
                    }
                }
            }
        }

        if headers.is_empty() {
            return None;
        }

        let data = rows
            .iter()
            .map(|row| {
                headers
                    .iter()
                    .map(|header| {
                        row.get(header)
                            .map(Self::value_to_string)
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        Some((headers, data))
    }

    fn plain(value: &Value) -> Result<String> {
        Ok(match value {
            Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other)?,
        })
    }

    fn value_to_string(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            Value::Array(items) if items.iter().all(|v| !v.is_object() && !v.is_array()) => items
                .iter()
                .map(Self::value_to_string)
                .collect::<Vec<_>>()
                .join(", "),
            other => serde_json::to_string(other).unwrap_or_default(),
        }
    }
}

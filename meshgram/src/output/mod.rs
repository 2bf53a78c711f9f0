use anyhow::Result;
use comfy_table::Table;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Json,
    Table,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        }
    }
}

/// Print a flat record as pretty JSON or as a two-column table
pub fn print_output<T: Serialize>(data: &T, headers: [&str; 2], format: OutputFormat) -> Result<()> {
    let value = serde_json::to_value(data)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
        OutputFormat::Table => {
            let mut table = create_table();
            table.set_header(headers.to_vec());
            if let Value::Object(fields) = &value {
                for (key, field) in fields {
                    table.add_row(vec![key.clone(), display_value(field)]);
                }
            }
            println!("{table}");
        }
    }
    Ok(())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        Value::Object(map) if map.is_empty() => "-".to_string(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{k} = {}", display_value(v)))
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table
}

use serde::Serialize;
use serde_json::Value;

use crate::cli::OutputFormat;

pub mod table;

/// Render a serializable response in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Table => render_table(value),
    }
}

/// Print a serializable response in the requested format.
pub fn output<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = render(value, format)?;
    println!("{rendered}");
    Ok(())
}

fn render_table<T: Serialize>(value: &T) -> anyhow::Result<String> {
    match serde_json::to_value(value)? {
        Value::Array(items) => Ok(render_rows(&items)),
        Value::Object(map) => {
            let rows = map
                .into_iter()
                .map(|(key, value)| vec![key, value_to_cell(&value)])
                .collect::<Vec<_>>();
            Ok(table::render(&["field", "value"], &rows))
        }
        scalar => Ok(value_to_cell(&scalar)),
    }
}

fn render_rows(items: &[Value]) -> String {
    if items.is_empty() {
        return String::from("(no rows)");
    }

    let mut headers = Vec::<String>::new();
    for map in items.iter().filter_map(Value::as_object) {
        for key in map.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }
    if headers.is_empty() {
        let rows = items.iter().map(|item| vec![value_to_cell(item)]).collect::<Vec<_>>();
        return table::render(&["value"], &rows);
    }

    let header_refs = headers.iter().map(String::as_str).collect::<Vec<_>>();
    let rows = items
        .iter()
        .map(|item| {
            headers
                .iter()
                .map(|header| item.get(header).map_or_else(|| String::from("-"), value_to_cell))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    table::render(&header_refs, &rows)
}

fn value_to_cell(value: &Value) -> String {
    match value {
        Value::Null => String::from("-"),
        Value::Bool(v) => v.to_string(),
        Value::Number(v) => v.to_string(),
        Value::String(v) => v.clone(),
        other => serde_json::to_string(other).unwrap_or_else(|_| String::from("<invalid-json>")),
    }
}

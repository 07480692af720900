use serde_json::{Map, Value};

use crate::error::ExportError;
use crate::shape::{MessageRecord, ReplierRecord, ResultRecord};

/// Canonical replier columns shared by both upstream shapes.
pub const REPLIER_COLUMNS: [&str; 5] = ["id_replier", "email", "fullname", "discussions", "responses"];

/// Flattens a record collection into CSV text.
///
/// The header is taken from the first row; later rows are aligned to it and
/// emit an empty cell for any key they lack.
pub fn to_csv(records: &[Value]) -> Result<String, ExportError> {
    if records.is_empty() {
        return Err(ExportError::Empty);
    }
    let rows = records
        .iter()
        .enumerate()
        .map(|(index, record)| ResultRecord::parse(index, record).map(|parsed| project_row(&parsed)))
        .collect::<Result<Vec<_>, _>>()?;

    let Some(first) = rows.first() else {
        return Err(ExportError::Empty);
    };
    let header: Vec<&String> = first.keys().collect();

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        header
            .iter()
            .map(|key| escape_text(key))
            .collect::<Vec<_>>()
            .join(","),
    );
    for row in &rows {
        lines.push(
            header
                .iter()
                .map(|key| encode_cell(row.get(key.as_str())))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    Ok(lines.join("\n"))
}

/// One flat row per record, keys in output column order.
pub fn project_row(record: &ResultRecord<'_>) -> Map<String, Value> {
    match record {
        ResultRecord::Message(message) => message_row(message),
        ResultRecord::Replier(replier) => replier_row(replier),
    }
}

fn message_row(message: &MessageRecord<'_>) -> Map<String, Value> {
    let mut row: Map<String, Value> = message
        .fields
        .iter()
        .map(|(key, value)| ((*key).to_string(), (*value).clone()))
        .collect();
    row.insert(
        "reactions_count".to_string(),
        Value::Number(message.reactions_count()),
    );
    row.insert(
        "reactions_list".to_string(),
        Value::String(message.reactions_list()),
    );
    row.insert(
        "replies_count".to_string(),
        Value::from(message.replies_count()),
    );
    row.insert(
        "replies_list".to_string(),
        Value::String(message.replies_list()),
    );
    row
}

fn replier_row(replier: &ReplierRecord<'_>) -> Map<String, Value> {
    let or_empty = |value: Option<&Value>| {
        value
            .cloned()
            .unwrap_or_else(|| Value::String(String::new()))
    };
    let values = [
        replier.replier_id().cloned().unwrap_or(Value::Null),
        or_empty(replier.email()),
        or_empty(replier.fullname()),
        replier.discussions().cloned().unwrap_or(Value::Null),
        replier.responses().cloned().unwrap_or(Value::Null),
    ];
    REPLIER_COLUMNS
        .iter()
        .map(|column| (*column).to_string())
        .zip(values)
        .collect()
}

/// Encodes one cell.
///
/// Objects and arrays become compact JSON, always quoted. Scalars have quotes
/// doubled and line breaks turned into spaces, and are quoted only when they
/// contain a comma, quote or newline.
pub fn encode_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(nested @ (Value::Object(_) | Value::Array(_))) => {
            format!("\"{}\"", nested.to_string().replace('"', "\"\""))
        }
        Some(Value::String(text)) => escape_text(text),
        Some(scalar) => escape_text(&scalar.to_string()),
    }
}

fn escape_text(text: &str) -> String {
    let escaped: String = text
        .replace('"', "\"\"")
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if escaped.contains([',', '"', '\n', '\r']) {
        format!("\"{escaped}\"")
    } else {
        escaped
    }
}

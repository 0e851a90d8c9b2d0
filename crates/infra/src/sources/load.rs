use serde_json::Value;

use restock_sales::RawRecord;

use super::SourceError;

/// Parse a document dump: either one JSON array of objects or JSON lines.
///
/// Blank lines are ignored. Anything that is not an object is rejected.
pub fn parse_documents(text: &str) -> Result<Vec<RawRecord>, SourceError> {
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        let value: Value = serde_json::from_str(trimmed)
            .map_err(|e| SourceError::Malformed(e.to_string()))?;
        let Value::Array(items) = value else {
            return Err(SourceError::Malformed("expected a JSON array".into()));
        };
        return items
            .into_iter()
            .enumerate()
            .map(|(i, v)| into_record(v, i + 1))
            .collect();
    }

    trimmed
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let value: Value = serde_json::from_str(line)
                .map_err(|e| SourceError::Malformed(format!("line {}: {e}", i + 1)))?;
            into_record(value, i + 1)
        })
        .collect()
}

fn into_record(value: Value, position: usize) -> Result<RawRecord, SourceError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(SourceError::Malformed(format!(
            "document {position} is not an object: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_array_and_lines() {
        let array = r#"[{"a": 1}, {"b": 2}]"#;
        assert_eq!(parse_documents(array).unwrap().len(), 2);

        let lines = "{\"a\": 1}\n\n{\"b\": 2}\n";
        let docs = parse_documents(lines).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1]["b"], 2);
    }

    #[test]
    fn empty_input_is_empty() {
        assert!(parse_documents("  \n").unwrap().is_empty());
    }

    #[test]
    fn non_objects_are_rejected() {
        assert!(matches!(
            parse_documents("[1, 2]"),
            Err(SourceError::Malformed(_))
        ));
        assert!(matches!(
            parse_documents("{\"a\": 1}\nnot json"),
            Err(SourceError::Malformed(ref m)) if m.starts_with("line 2")
        ));
    }
}

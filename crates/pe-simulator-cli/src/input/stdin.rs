use serde_json::Value;
use std::io::{self, Read};

/// Attempt to read JSON (or YAML) from stdin if data is being piped.
/// Returns None if stdin is a TTY (interactive).
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    Ok(Some(parse_document(trimmed)?))
}

fn parse_document(text: &str) -> Result<Value, Box<dyn std::error::Error>> {
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(json_err) => match serde_yaml::from_str(text) {
            Ok(value) => Ok(value),
            Err(_) => Err(format!("stdin is neither JSON nor YAML: {json_err}").into()),
        },
    }
}

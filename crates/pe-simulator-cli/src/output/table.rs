use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(value);
            }
        }
        Value::Array(arr) => {
            print_array_table(arr);
        }
        _ => {
            println!("{}", value);
        }
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    if let Value::Object(res_map) = result {
        print_sections(res_map);
    } else {
        print_flat_object(&Value::Object(envelope.clone()));
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// Scalars in one Field/Value table, then one titled table per nested
/// object or list of records.
fn print_sections(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut nested: Vec<(&str, &Value)> = Vec::new();
    let mut scalars = 0usize;

    for (key, val) in map {
        if key == "matrix" || is_section(val) {
            nested.push((key.as_str(), val));
        } else {
            builder.push_record([key.as_str(), &format_value(val)]);
            scalars += 1;
        }
    }
    if scalars > 0 {
        println!("{}", Table::from(builder));
    }

    for (key, val) in nested {
        println!("\n{}:", key);
        match val {
            Value::Object(_) => print_flat_object(val),
            Value::Array(rows) if key == "matrix" => print_matrix(rows, map),
            Value::Array(arr) => print_array_table(arr),
            _ => println!("{}", format_value(val)),
        }
    }
}

fn is_section(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(arr) => matches!(arr.first(), Some(Value::Object(_))),
        _ => false,
    }
}

/// Sensitivity grid: rows labelled by variable 1, columns by variable 2.
fn print_matrix(rows: &[Value], map: &Map<String, Value>) {
    let row_labels = value_list(map.get("variable_1_values"));
    let mut col_labels = value_list(map.get("variable_2_values"));
    if col_labels.is_empty() {
        col_labels.push(
            map.get("output_metric")
                .map(format_value)
                .unwrap_or_else(|| "value".to_string()),
        );
    }

    let corner = match (map.get("variable_1_name"), map.get("variable_2_name")) {
        (Some(v1), Some(Value::String(v2))) => format!("{} \\ {}", format_value(v1), v2),
        (Some(v1), _) => format_value(v1),
        _ => String::new(),
    };

    let mut builder = Builder::default();
    let mut header = vec![corner];
    header.extend(col_labels);
    builder.push_record(header);

    for (i, row) in rows.iter().enumerate() {
        let mut record = vec![row_labels.get(i).cloned().unwrap_or_default()];
        if let Value::Array(cells) = row {
            record.extend(cells.iter().map(format_value));
        }
        builder.push_record(record);
    }
    println!("{}", Table::from(builder));
}

fn value_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(arr)) => arr.iter().map(format_value).collect(),
        _ => Vec::new(),
    }
}

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        let table = Table::from(builder);
        println!("{}", table);
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        let table = Table::from(builder);
        println!("{}", table);
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sections_are_detected() {
        assert!(is_section(&json!({"irr": "0.1"})));
        assert!(is_section(&json!([{"year": 0}])));
        assert!(!is_section(&json!(["0.1", "0.2"])));
        assert!(!is_section(&json!("0.1")));
    }

    #[test]
    fn test_format_value_joins_arrays() {
        assert_eq!(format_value(&json!(["1", "2"])), "1, 2");
        assert_eq!(format_value(&json!(null)), "null");
    }
}

use serde_json::{Map, Value};
use std::io;

/// Record lists written as rows, in priority order.
const RECORD_KEYS: [&str; 3] = ["years", "outcomes", "yearly"];

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => {
            if let Some(Value::Object(result)) = map.get("result") {
                write_result_csv(&mut wtr, result);
            } else {
                write_field_value_csv(&mut wtr, map);
            }
        }
        Value::Array(arr) => {
            write_array_csv(&mut wtr, arr);
        }
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_result_csv<W: io::Write>(wtr: &mut csv::Writer<W>, result: &Map<String, Value>) {
    if let Some(Value::Array(rows)) = result.get("matrix") {
        write_matrix_csv(wtr, rows, result);
        return;
    }
    for key in RECORD_KEYS {
        if let Some(Value::Array(records)) = result.get(key) {
            write_array_csv(wtr, records);
            return;
        }
    }
    write_field_value_csv(wtr, result);
}

fn write_field_value_csv<W: io::Write>(wtr: &mut csv::Writer<W>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
    }
}

/// One row per variable 1 value; one column per variable 2 value.
fn write_matrix_csv<W: io::Write>(
    wtr: &mut csv::Writer<W>,
    rows: &[Value],
    result: &Map<String, Value>,
) {
    let row_labels = string_list(result.get("variable_1_values"));
    let mut header = vec![result
        .get("variable_1_name")
        .map(format_csv_value)
        .unwrap_or_default()];
    let col_labels = string_list(result.get("variable_2_values"));
    if col_labels.is_empty() {
        header.push(
            result
                .get("output_metric")
                .map(format_csv_value)
                .unwrap_or_else(|| "value".to_string()),
        );
    } else {
        header.extend(col_labels);
    }
    let _ = wtr.write_record(&header);

    for (i, row) in rows.iter().enumerate() {
        let mut record = vec![row_labels.get(i).cloned().unwrap_or_default()];
        if let Value::Array(cells) = row {
            record.extend(cells.iter().map(format_csv_value));
        }
        let _ = wtr.write_record(&record);
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(arr)) => arr.iter().map(format_csv_value).collect(),
        _ => Vec::new(),
    }
}

fn write_array_csv<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::format_scalar;

const REGIMES: [&str; 4] = ["micro_foncier", "reel_foncier", "micro_bic", "reel_bic"];

/// Format output as tables using the tabled crate.
///
/// Scalars go in a field/value table, per-regime breakdowns are pivoted
/// with one column per regime, and row sequences get their own table.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(result) => print_result(result, map),
            None => print_object("", map),
        },
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => print_object("", res_map),
        other => println!("{}", format_scalar(other)),
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

fn print_object(title: &str, map: &Map<String, Value>) {
    let mut scalars = Builder::default();
    scalars.push_record(["Field", "Value"]);
    let mut has_scalars = false;
    let mut nested: Vec<(&String, &Value)> = Vec::new();

    for (key, val) in map {
        match val {
            Value::Object(_) | Value::Array(_) => nested.push((key, val)),
            _ => {
                scalars.push_record([key.as_str(), &format_scalar(val)]);
                has_scalars = true;
            }
        }
    }

    if has_scalars {
        if !title.is_empty() {
            println!("\n{}", title);
        }
        println!("{}", Table::from(scalars));
    }

    for (key, val) in nested {
        let name = if title.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", title, key)
        };
        match val {
            Value::Object(inner) if is_regime_breakdown(inner) => print_regimes(&name, inner),
            Value::Object(inner) => print_object(&name, inner),
            Value::Array(arr) => {
                println!("\n{}", name);
                print_array_table(arr);
            }
            _ => {}
        }
    }
}

fn is_regime_breakdown(map: &Map<String, Value>) -> bool {
    REGIMES.iter().all(|r| map.contains_key(*r))
}

/// One column per regime; one row per field (or a single row of scalars).
fn print_regimes(title: &str, map: &Map<String, Value>) {
    let mut builder = Builder::default();
    let mut header = vec!["Field".to_string()];
    header.extend(REGIMES.iter().map(|r| r.to_string()));
    builder.push_record(header);

    let fields: Vec<String> = match map.get(REGIMES[0]) {
        Some(Value::Object(first)) => first.keys().cloned().collect(),
        _ => Vec::new(),
    };

    if fields.is_empty() {
        let mut row = vec![String::new()];
        row.extend(REGIMES.iter().map(|r| map.get(*r).map(format_scalar).unwrap_or_default()));
        builder.push_record(row);
    } else {
        for field in &fields {
            let mut row = vec![field.clone()];
            row.extend(REGIMES.iter().map(|r| {
                map.get(*r)
                    .and_then(|v| v.get(field.as_str()))
                    .map(format_scalar)
                    .unwrap_or_default()
            }));
            builder.push_record(row);
        }
    }

    println!("\n{}", title);
    println!("{}", Table::from(builder));
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
                    .map(|h| map.get(h.as_str()).map(format_scalar).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_scalar(item));
        }
    }
}

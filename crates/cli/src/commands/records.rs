// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use dapp_kernel::record::Category;
use dapp_persistence::RecordStore;
use serde_json::Value;

/// One table column per field, in first-seen order across all records.
pub fn render(records: &[Value]) -> Table {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        if let Value::Object(map) = record {
            for key in map.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }

    let mut header = vec!["#".to_string()];
    header.extend(columns.iter().cloned());

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);

    for (i, record) in records.iter().enumerate() {
        let mut row = vec![i.to_string()];
        for column in &columns {
            row.push(match record.get(column) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            });
        }
        table.add_row(row);
    }
    table
}

pub fn run(store: &RecordStore, categories: &[Category]) -> anyhow::Result<()> {
    for &category in categories {
        let records = store.read_all(category)?;
        println!(
            "\n{} records ({}): {}\n",
            category.as_str(),
            store.paths().path(category).display(),
            records.len()
        );
        if !records.is_empty() {
            println!("{}\n", render(&records));
        }
    }
    Ok(())
}

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use anyhow::Context;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use dapp_kernel::directory::NodeDirectory;
use dapp_node::config::Settings;
use std::path::Path;

/// Load the node table the relay would serve with.
pub fn load(config_path: &Path) -> anyhow::Result<NodeDirectory> {
    let settings = Settings::load(config_path)?;
    settings
        .directory()
        .with_context(|| format!("invalid node table in {}", config_path.display()))
}

pub fn render(directory: &NodeDirectory) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Name", "URL", "DID", "Storage"]);

    for node in directory.iter() {
        table.add_row(vec![
            node.name.clone(),
            node.base_url(),
            node.identity.to_string(),
            node.storage_root.display().to_string(),
        ]);
    }
    table
}

pub fn run(config_path: &Path) -> anyhow::Result<()> {
    let directory = load(config_path)?;

    println!("\nLedger Nodes ({})\n", config_path.display());
    if directory.is_empty() {
        println!("No nodes configured.\n");
        return Ok(());
    }
    println!("{}\n", render(&directory));
    Ok(())
}

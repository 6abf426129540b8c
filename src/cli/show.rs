use comfy_table::{Cell, Table};

use crate::cli::open_catalog;
use crate::codes::parent_of;
use crate::error::Result;
use crate::fmt::{flag_labels, wrap_block};
use crate::models::CostFlags;
use crate::store::Store;

const NOTE_WIDTH: usize = 72;

pub fn run(code: &str) -> Result<()> {
    let (_settings, conn) = open_catalog()?;
    let store = Store::new(&conn);
    let record = store.require(code.trim())?;

    let cost: CostFlags = record.flags.iter().filter(|f| f.is_cost_category()).collect();
    let conversions: CostFlags = record.flags.iter().filter(|f| !f.is_cost_category()).collect();
    let parent = match parent_of(&record.account_code) {
        Some(p) => match store.get(p)? {
            Some(parent) => format!("{} - {}", parent.account_code, parent.description),
            None => p.to_string(),
        },
        None => "(root)".to_string(),
    };
    let children = store.children(&record.account_code)?.len();

    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    let rows: Vec<(&str, String)> = vec![
        ("Account Code", record.account_code.clone()),
        ("Description", record.description.clone()),
        ("Level", record.level.to_string()),
        ("Parent", parent),
        ("Children", children.to_string()),
        ("Primary UOM", record.uom.clone()),
        ("2nd UOM", record.uom2.clone()),
        ("Metric Primary", record.metric_uom.clone()),
        ("Metric 2nd", record.metric_uom2.clone()),
        ("Cost Categories", flag_labels(cost)),
        ("Conversions", flag_labels(conversions)),
    ];
    for (field, value) in rows {
        table.add_row(vec![Cell::new(field), Cell::new(value)]);
    }
    println!("{table}");

    println!();
    println!("District Notes:");
    if record.notes.trim().is_empty() {
        println!("  (none)");
    } else {
        println!("  {}", wrap_block(&record.notes, NOTE_WIDTH, "  "));
    }
    println!();
    println!("Personal Notes:");
    match record.personal_notes.as_deref() {
        Some(notes) if !notes.trim().is_empty() => {
            println!("  {}", wrap_block(notes, NOTE_WIDTH, "  "))
        }
        _ => println!("  (none)"),
    }
    Ok(())
}

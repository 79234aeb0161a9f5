use std::path::{Path, PathBuf};

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::emitter::render;
use crate::error::Result;
use crate::fmt::{count, kilobytes};
use crate::importer::import_workbook;
use crate::models::SeedData;
use crate::settings::load_settings;
use crate::workbook::Workbook;

pub fn run(excel: &Path, out: Option<PathBuf>) -> Result<()> {
    let settings = load_settings()?;
    let out = out.unwrap_or_else(|| PathBuf::from(&settings.output));

    println!("Reading workbook: {}", excel.display());
    let mut workbook = Workbook::open(excel)?;
    let data = import_workbook(&mut workbook, &settings)?;

    let sql = render(&data, chrono::Local::now().naive_local());
    std::fs::write(&out, &sql)?;

    println!(
        "{} {} ({})",
        "SQL generated:".green().bold(),
        out.display(),
        kilobytes(sql.len() as u64)
    );
    println!("{}", summary_table(&data));
    if data.orphan_refs > 0 {
        println!(
            "{}",
            format!(
                "{} sheet row(s) did not match a client and got their own id",
                data.orphan_refs
            )
            .yellow()
        );
    }
    Ok(())
}

pub fn summary_table(data: &SeedData) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Table", "Rows"]);
    for (name, rows) in [
        ("clients", data.clients.len()),
        ("bank_statements", data.bank_statements.len()),
        ("subscription_payments", data.subscription_payments.len()),
        ("vat_register", data.vat_records.len()),
        ("affinitas_subscriptions", data.affinitas_subscriptions.len()),
    ] {
        table.add_row(vec![Cell::new(name), Cell::new(count(rows))]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_table_lists_every_table() {
        let table = summary_table(&SeedData::default()).to_string();
        for name in [
            "clients",
            "bank_statements",
            "subscription_payments",
            "vat_register",
            "affinitas_subscriptions",
        ] {
            assert!(table.contains(name), "missing {name}");
        }
    }
}

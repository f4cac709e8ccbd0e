use goldstocks::process::{
    extract_totals, read_first_sheet,
    utils::{cell_label, last_numeric},
    TotalsRecord,
};
use goldstocks::store::date_from_filename;
use std::{env, path::Path, process::exit};

fn main() {
    // Expect a report path and an optional `--json`.
    let args: Vec<String> = env::args().collect();
    let json = args.iter().any(|a| a == "--json");
    let files: Vec<&String> = args.iter().skip(1).filter(|a| *a != "--json").collect();
    if files.len() != 1 {
        eprintln!("Usage: {} <REPORT_FILE> [--json]", args[0]);
        exit(1);
    }
    if let Err(e) = inspect_report(Path::new(files[0]), json) {
        eprintln!("Error: {:#}", e);
        exit(1);
    }
}

/// Print every labelled row of the first sheet with the number the extractor
/// would pick from it, followed by the extracted totals.
fn inspect_report(path: &Path, json: bool) -> anyhow::Result<()> {
    let range = read_first_sheet(path)?;
    let (totals, not_found) = extract_totals(range.rows());

    if json {
        let date = date_from_filename(path)
            .ok_or_else(|| anyhow::anyhow!("no YYYYMMDD date in {:?}", path))?;
        let rec = TotalsRecord { date, totals };
        println!("{}", serde_json::to_string_pretty(&rec)?);
        return Ok(());
    }

    let (height, width) = range.get_size();
    println!("=== Report: {} ===", path.display());
    println!("Date from name: {:?}", date_from_filename(path));
    println!("Sheet size:     {} rows x {} cols", height, width);
    println!();

    println!("=== Rows ===");
    for (idx, row) in range.rows().enumerate() {
        let label = row.first().map(cell_label).unwrap_or_default();
        if label.is_empty() {
            continue;
        }
        let value = last_numeric(row)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:>4} | {:<40} | {}", idx, label, value);
    }
    println!();

    println!("=== Totals ===");
    println!("total_registered: {:?}", totals.total_registered);
    println!("total_eligible:   {:?}", totals.total_eligible);
    println!("total_pledged:    {:?}", totals.total_pledged);
    println!("combined_total:   {:?}", totals.combined_total);
    for kind in not_found {
        println!("missing label:    {}", kind.label());
    }
    Ok(())
}

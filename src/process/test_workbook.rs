//! Writes small `.xlsx` workbooks for tests. An xlsx file is a zip of XML
//! parts; only the parts calamine needs to find the first sheet are written.

use anyhow::Result;
use std::{fs::File, io::Write, path::Path};
use zip::write::FileOptions;
use zip::CompressionMethod;

pub enum Cell<'a> {
    Text(&'a str),
    Num(f64),
    Blank,
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Gold" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn column(idx: usize) -> char {
    (b'A' + idx as u8) as char
}

fn sheet_xml(rows: &[Vec<Cell>]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, row) in rows.iter().enumerate() {
        xml.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, cell) in row.iter().enumerate() {
            let cref = format!("{}{}", column(c), r + 1);
            match cell {
                Cell::Text(t) => xml.push_str(&format!(
                    r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    cref,
                    escape(t)
                )),
                Cell::Num(n) => xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, cref, n)),
                Cell::Blank => {}
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Write a one-sheet workbook at `path`. Rows must be narrower than 27 columns.
pub fn write_xlsx(path: &Path, rows: &[Vec<Cell>]) -> Result<()> {
    let mut zip = zip::ZipWriter::new(File::create(path)?);
    let options: FileOptions<'_, ()> =
        FileOptions::default().compression_method(CompressionMethod::Stored);

    for (name, body) in [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("xl/workbook.xml", WORKBOOK.to_string()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        ("xl/worksheets/sheet1.xml", sheet_xml(rows)),
    ] {
        zip.start_file(name, options)?;
        zip.write_all(body.as_bytes())?;
    }
    zip.finish()?;
    Ok(())
}

/// The four summary rows of a stock report, with depository rows and a
/// trailing unit column around them.
pub fn write_report(path: &Path, registered: f64, eligible: f64, pledged: f64, combined: f64) -> Result<()> {
    use Cell::*;
    let rows = vec![
        vec![Text("COMEX Metal Warehouse Stocks"), Blank, Text("Troy Ounce")],
        vec![Text("DEPOSITORY"), Text("PREV TOTAL"), Text("RECEIVED"), Text("TOTAL TODAY")],
        vec![Text("Brink's & Co"), Num(1.0), Num(2.0), Num(3.0)],
        vec![Text("TOTAL REGISTERED"), Num(1000.0), Num(1000.0), Num(registered), Text("oz")],
        vec![Text("TOTAL ELIGIBLE"), Blank, Blank, Num(eligible)],
        vec![Text("Total Pledged"), Blank, Blank, Num(pledged)],
        vec![Text("COMBINED TOTAL"), Blank, Blank, Num(combined)],
    ];
    write_xlsx(path, &rows)
}

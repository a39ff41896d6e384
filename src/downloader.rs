use crate::record::{Column, Table};
use crate::style::format_date;
use std::error::Error;

/// Convert the normalized table to CSV format
///
/// The header row uses the sheet's column names (`Fecha`, `Emisor`, ...) so
/// the export can be pasted back into the source spreadsheet. Amounts are
/// written as plain numbers and missing dates as `N/A`; quoting of commas,
/// quotes and newlines is left to the `csv` writer.
///
/// # Arguments
/// * `table` - Table to export, in its current record order
///
/// # Returns
/// * `Result<String, Box<dyn Error>>` - CSV content as a string or an error
///
/// # Examples
/// ```
/// use escudo::downloader::to_csv;
/// use escudo::record::Table;
///
/// let csv = to_csv(&Table::default()).unwrap();
/// assert!(csv.starts_with("Fecha,Emisor,Monto"));
/// ```
pub fn to_csv(table: &Table) -> Result<String, Box<dyn Error>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(Column::ALL.iter().map(|c| c.header()))?;
    for record in table.iter() {
        writer.write_record(Column::ALL.iter().map(|&c| record.text(c)))?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

/// Convert the normalized table to XLSX format
///
/// Uses the rust_xlsxwriter library; amounts are written as numbers so they
/// can be summed in Excel, every other column as text.
///
/// # Arguments
/// * `table` - Table to export
///
/// # Returns
/// * `Result<Vec<u8>, Box<dyn Error>>` - XLSX file content as bytes or an error
pub fn to_xlsx(table: &Table) -> Result<Vec<u8>, Box<dyn Error>> {
    use rust_xlsxwriter::{Workbook, Worksheet};

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name("Registros")?;

    for (c, column) in Column::ALL.iter().enumerate() {
        worksheet.write_string(0, c as u16, column.header())?;
    }

    for (r, record) in table.iter().enumerate() {
        let row = (r + 1) as u32;
        for (c, &column) in Column::ALL.iter().enumerate() {
            let col = c as u16;
            match column {
                Column::Amount => {
                    worksheet.write_number(row, col, record.amount)?;
                }
                Column::Date => {
                    worksheet.write_string(row, col, &format_date(record.date))?;
                }
                other => {
                    worksheet.write_string(row, col, &record.text(other))?;
                }
            }
        }
    }

    workbook.push_worksheet(worksheet);

    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}

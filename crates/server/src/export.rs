//! Tabular report rendering for downloads.
//!
//! CSV is written for spreadsheet users: a UTF-8 BOM, `;` as delimiter and a
//! header row. XLSX gets one worksheet with a bold header row; money and
//! percentages are stored as numbers with two decimals.

use api_types::reports::ExportFormat;
use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use engine::{Money, Percent};
use rust_xlsxwriter::{Format, Workbook};

use crate::ServerError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Text(String),
    Money(Money),
    Percent(Option<Percent>),
}

/// A rendered-ready report: one header per column, rows of the same width.
#[derive(Debug)]
pub struct Table {
    pub sheet: &'static str,
    pub headers: &'static [&'static str],
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn render(&self, format: ExportFormat) -> Result<Vec<u8>, ServerError> {
        match format {
            ExportFormat::Csv => self.render_csv(),
            ExportFormat::Xlsx => self.render_xlsx(),
        }
    }

    fn render_csv(&self) -> Result<Vec<u8>, ServerError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .from_writer(UTF8_BOM.to_vec());
        writer
            .write_record(self.headers)
            .map_err(|err| ServerError::Internal(format!("csv export failed: {err}")))?;
        for row in &self.rows {
            let record: Vec<String> = row
                .iter()
                .map(|cell| match cell {
                    Cell::Text(text) => text.clone(),
                    Cell::Money(money) => money.to_string(),
                    Cell::Percent(pct) => pct.map(|p| p.to_string()).unwrap_or_default(),
                })
                .collect();
            writer
                .write_record(&record)
                .map_err(|err| ServerError::Internal(format!("csv export failed: {err}")))?;
        }
        writer
            .into_inner()
            .map_err(|err| ServerError::Internal(format!("csv export failed: {err}")))
    }

    fn render_xlsx(&self) -> Result<Vec<u8>, ServerError> {
        let xlsx_err = |err: rust_xlsxwriter::XlsxError| {
            ServerError::Internal(format!("xlsx export failed: {err}"))
        };
        let header_format = Format::new().set_bold();
        let decimal_format = Format::new().set_num_format("0.00");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet().set_name(self.sheet).map_err(xlsx_err)?;

        for (col, title) in self.headers.iter().enumerate() {
            let col = col as u16;
            sheet
                .write_string_with_format(0, col, *title, &header_format)
                .map_err(xlsx_err)?;
            sheet.set_column_width(col, 18).map_err(xlsx_err)?;
        }

        for (idx, row) in self.rows.iter().enumerate() {
            let row_num = idx as u32 + 1;
            for (col, cell) in row.iter().enumerate() {
                let col = col as u16;
                match cell {
                    Cell::Text(text) => {
                        sheet.write_string(row_num, col, text).map_err(xlsx_err)?;
                    }
                    Cell::Money(money) => {
                        sheet
                            .write_number_with_format(
                                row_num,
                                col,
                                money.minor() as f64 / 100.0,
                                &decimal_format,
                            )
                            .map_err(xlsx_err)?;
                    }
                    Cell::Percent(Some(pct)) => {
                        sheet
                            .write_number_with_format(
                                row_num,
                                col,
                                pct.basis_points() as f64 / 100.0,
                                &decimal_format,
                            )
                            .map_err(xlsx_err)?;
                    }
                    Cell::Percent(None) => {}
                }
            }
        }

        workbook.save_to_buffer().map_err(xlsx_err)
    }
}

/// `<report>_<from|all>_<to|now>.<ext>`
pub fn filename(report: &str, from: Option<&str>, to: Option<&str>, format: ExportFormat) -> String {
    let ext = match format {
        ExportFormat::Csv => "csv",
        ExportFormat::Xlsx => "xlsx",
    };
    format!(
        "{report}_{}_{}.{ext}",
        from.unwrap_or("all"),
        to.unwrap_or("now")
    )
}

/// Wrap rendered bytes in a download response.
pub fn attachment(bytes: Vec<u8>, filename: &str, format: ExportFormat) -> Response {
    let content_type = match format {
        ExportFormat::Csv => "text/csv; charset=utf-8",
        ExportFormat::Xlsx => XLSX_CONTENT_TYPE,
    };
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table {
            sheet: "Summary",
            headers: &["Month", "Revenue", "Margin"],
            rows: vec![
                vec![
                    Cell::Text("2025-01".to_string()),
                    Cell::Money(Money::new(1500_00)),
                    Cell::Percent(Some(Percent::from_basis_points(8000))),
                ],
                vec![
                    Cell::Text("2025-02".to_string()),
                    Cell::Money(Money::ZERO),
                    Cell::Percent(None),
                ],
            ],
        }
    }

    #[test]
    fn csv_has_bom_semicolons_and_header() {
        let bytes = sample().render(ExportFormat::Csv).unwrap_or_default();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Month;Revenue;Margin",
                "2025-01;1500.00;80.00",
                "2025-02;0.00;",
            ]
        );
    }

    #[test]
    fn xlsx_is_a_zip_archive() {
        let bytes = sample().render(ExportFormat::Xlsx).unwrap_or_default();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn filenames_default_to_all_and_now() {
        assert_eq!(
            filename("monthly-summary", None, None, ExportFormat::Csv),
            "monthly-summary_all_now.csv"
        );
        assert_eq!(
            filename("budget-plan-fact", Some("2025-01"), Some("2025-06"), ExportFormat::Xlsx),
            "budget-plan-fact_2025-01_2025-06.xlsx"
        );
    }
}

//! Shared XLSX export models, options and error types.

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::PolarsError;
use rust_xlsxwriter::XlsxError;
use thiserror::Error;

use crate::conf::{
    C_DATE_FORMAT_DEFAULT, C_DATETIME_FORMAT_DEFAULT, C_INF_REP_DEFAULT, C_SHEET_NAME_DEFAULT,
    N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, derive_default_header_format,
};

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification, converted to a `rust_xlsxwriter::Format` at write time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Border style for all sides.
    pub border: Option<i64>,
    /// Text wrap.
    pub text_wrap: Option<bool>,

    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color.
    pub bg_color: Option<String>,
    /// Font color.
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            text_wrap: other.text_wrap.or(self.text_wrap),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }

    /// Return a copy with `num_format` replaced.
    pub fn with_num_format(&self, num_format: &str) -> SpecCellFormat {
        self.merge(&SpecCellFormat {
            num_format: Some(num_format.to_string()),
            ..Default::default()
        })
    }
}

/// Normalized cell value during the write pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Missing/blank value.
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Boolean(bool),
    /// Timezone-naive timestamp.
    DateTime(NaiveDateTime),
    /// Calendar date.
    Date(NaiveDate),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// Header row behavior.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EnumXlsxHeader {
    /// Write column names (default).
    #[default]
    Show,
    /// Write no header row; data starts at `startrow`.
    Hide,
    /// Write these aliases instead of the column names.
    Aliases(Vec<String>),
}

/// Replacement text for values Excel cannot hold as numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxValuePolicy {
    /// Text for missing values and NaN; empty writes a blank cell.
    pub na_rep: String,
    /// Text for positive infinity; negative infinity is written as `-{inf_rep}`.
    pub inf_rep: String,
}

impl Default for SpecXlsxValuePolicy {
    fn default() -> Self {
        Self {
            na_rep: String::new(),
            inf_rep: C_INF_REP_DEFAULT.to_string(),
        }
    }
}

/// Per-sheet write options, forwarded unmodified to [`crate::writer::XlsxSession::write_dataframe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxSheetWriteOptions {
    /// Target worksheet; reused when already written in the same session.
    pub sheet_name: String,
    /// Missing/NaN/Inf replacement policy.
    pub value_policy: SpecXlsxValuePolicy,
    /// Excel number format for float columns.
    pub float_format: Option<String>,
    /// Subset and order of columns to write.
    pub columns: Option<Vec<String>>,
    /// Header row behavior.
    pub header: EnumXlsxHeader,
    /// Emit a 0-based row-number column before the data columns.
    pub index: bool,
    /// Header text above the row-number column.
    pub index_label: Option<String>,
    /// Zero-based top row of the written block.
    pub startrow: usize,
    /// Zero-based left column of the written block.
    pub startcol: usize,
    /// Freeze panes at `(row, col)`.
    pub freeze_panes: Option<(usize, usize)>,
}

impl Default for SpecXlsxSheetWriteOptions {
    fn default() -> Self {
        Self {
            sheet_name: C_SHEET_NAME_DEFAULT.to_string(),
            value_policy: SpecXlsxValuePolicy::default(),
            float_format: None,
            columns: None,
            header: EnumXlsxHeader::Show,
            index: true,
            index_label: None,
            startrow: 0,
            startcol: 0,
            freeze_panes: None,
        }
    }
}

/// Session-wide options, fixed when the workbook is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxSessionOptions {
    /// Number format for timezone-naive datetime cells.
    pub datetime_format: String,
    /// Number format for date cells.
    pub date_format: String,
    /// Format for header and row-number cells.
    pub fmt_header: SpecCellFormat,
}

impl Default for SpecXlsxSessionOptions {
    fn default() -> Self {
        Self {
            datetime_format: C_DATETIME_FORMAT_DEFAULT.to_string(),
            date_format: C_DATE_FORMAT_DEFAULT.to_string(),
            fmt_header: derive_default_header_format(),
        }
    }
}

/// Options for the one-call exporters in [`crate::export`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxExportOptions {
    /// Per-sheet options.
    pub sheet: SpecXlsxSheetWriteOptions,
    /// Workbook-level options.
    pub session: SpecXlsxSessionOptions,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Result of one sheet write call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    /// Worksheet written.
    pub sheet_name: String,
    /// Top-left row of the written block.
    pub row_start: usize,
    /// Top-left column of the written block.
    pub col_start: usize,
    /// Sheet rows occupied (header included).
    pub n_rows_written: usize,
    /// Sheet columns occupied (row-number column included).
    pub n_cols_written: usize,
    /// Text columns promoted to datetime before the write.
    pub cols_promoted: Vec<String>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecXlsxReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Failure while encoding a table into a workbook.
#[derive(Debug, Error)]
pub enum XlsxExportError {
    /// Error raised by the spreadsheet encoder.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] XlsxError),
    /// Error raised by the table library.
    #[error("dataframe error: {0}")]
    Polars(#[from] PolarsError),
    /// A `columns` entry names no column of the table.
    #[error("Column not found: {0:?}")]
    ColumnNotFound(String),
    /// Header aliases do not match the written columns.
    #[error("Writing {n_cols} cols but got {n_aliases} aliases")]
    HeaderAliasMismatch { n_cols: usize, n_aliases: usize },
    /// Written block exceeds the Excel grid.
    #[error(
        "This sheet is too large! Your sheet size is: {n_rows}, {n_cols} \
         Max sheet size is: {}, {}",
        N_NROWS_EXCEL_MAX,
        N_NCOLS_EXCEL_MAX
    )]
    SheetTooLarge { n_rows: usize, n_cols: usize },
    /// A datetime column carries a timezone.
    #[error(
        "Excel does not support datetimes with timezones (column {0:?}). \
         Please ensure that datetimes are timezone unaware before writing to Excel."
    )]
    TimezoneNotSupported(String),
    /// Row or column position does not fit the encoder's index type.
    #[error("{axis} index overflow: {value}")]
    IndexOverflow { axis: &'static str, value: usize },
    /// Write attempted on a finalized session.
    #[error("Cannot write after close().")]
    SessionClosed,
}

/// Result alias for export operations.
pub type XlsxExportResult<T> = Result<T, XlsxExportError>;

// #endregion
////////////////////////////////////////////////////////////////////////////////

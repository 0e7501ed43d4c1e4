//! `tabkit_io_xlsx` v1:
//! DataFrame to XLSX export with text-to-datetime promotion.
//!
//! Architecture:
//! - `conf`    : constants and default presets
//! - `spec`    : specs/models/options/errors
//! - `util`    : pure helper functions (timestamp parsing, cell mapping)
//! - `promote` : in-place datetime promotion of text columns
//! - `writer`  : scoped workbook session
//! - `export`  : one-call exporters
pub mod conf;
pub mod export;
pub mod promote;
pub mod spec;
pub mod util;
pub mod writer;

#[cfg(test)]
mod testing;

pub use conf::{
    C_DATE_FORMAT_DEFAULT, C_DATETIME_FORMAT_DEFAULT, C_SHEET_NAME_DEFAULT, N_NCOLS_EXCEL_MAX,
    N_NROWS_EXCEL_MAX,
};
pub use export::{
    export_dataframe_to_xlsx, export_dataframe_to_xlsx_writer, export_ipc_bytes_to_xlsx,
};
pub use promote::{promote_datetime_columns, promote_datetime_columns_with_report};
pub use spec::{
    EnumCellValue, EnumXlsxHeader, SpecCellFormat, SpecXlsxExportOptions, SpecXlsxReport,
    SpecXlsxSessionOptions, SpecXlsxSheetWriteOptions, SpecXlsxValuePolicy, XlsxExportError,
    XlsxExportResult,
};
pub use util::{EnumParsedTimestamp, parse_timestamp};
pub use writer::{XlsxSession, with_xlsx_session};

//! Read generated workbooks back for assertions.

use std::io::Cursor;

use calamine::{Data, DataType, Range, Reader, Xlsx, open_workbook_from_rs};
use chrono::NaiveDateTime;

pub(crate) fn read_sheet(v_bytes: &[u8], sheet_name: &str) -> Range<Data> {
    let mut workbook: Xlsx<_> =
        open_workbook_from_rs(Cursor::new(v_bytes.to_vec())).expect("valid xlsx archive");
    workbook
        .worksheet_range(sheet_name)
        .expect("worksheet exists")
}

/// Cell at absolute `(row, col)`; `Data::Empty` outside the used range.
pub(crate) fn read_cell(range: &Range<Data>, row: u32, col: u32) -> Data {
    range
        .get_value((row, col))
        .cloned()
        .unwrap_or(Data::Empty)
}

pub(crate) fn read_f64(value: &Data) -> Option<f64> {
    match value {
        Data::Float(val) => Some(*val),
        Data::Int(val) => Some(*val as f64),
        _ => None,
    }
}

pub(crate) fn read_datetime(value: &Data) -> Option<NaiveDateTime> {
    value.as_datetime()
}

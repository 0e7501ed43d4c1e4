//! One-call exporters: promote datetime-like text columns, then write a workbook.

use std::io::{Cursor, Seek, Write};

use polars::prelude::{DataFrame, IpcReader, SerReader};

use crate::promote::promote_datetime_columns_with_report;
use crate::spec::{SpecXlsxExportOptions, SpecXlsxReport, XlsxExportResult};
use crate::writer::with_xlsx_session;

/// Export `df` as a single-sheet workbook and return its bytes.
///
/// `df` is promoted in place, so the caller sees the datetime columns afterwards.
pub fn export_dataframe_to_xlsx(
    df: &mut DataFrame,
    options: &SpecXlsxExportOptions,
) -> XlsxExportResult<Vec<u8>> {
    let (_, cursor) = export_dataframe_to_xlsx_writer(df, options, Cursor::new(Vec::new()))?;
    Ok(cursor.into_inner())
}

/// Export `df` into a caller-supplied target.
///
/// Returns the sheet write report and the finalized target.
pub fn export_dataframe_to_xlsx_writer<W>(
    df: &mut DataFrame,
    options: &SpecXlsxExportOptions,
    target: W,
) -> XlsxExportResult<(SpecXlsxReport, W)>
where
    W: Write + Seek + Send,
{
    let l_cols_promoted = promote_datetime_columns_with_report(df);
    let df_ref: &DataFrame = df;

    let (mut report, target) = with_xlsx_session(target, &options.session, |session| {
        session.write_dataframe(df_ref, &options.sheet)
    })?;
    report.cols_promoted = l_cols_promoted;

    tracing::debug!(
        sheet = %report.sheet_name,
        n_cols_promoted = report.cols_promoted.len(),
        "dataframe exported to xlsx"
    );
    Ok((report, target))
}

/// Decode a Polars IPC payload and export it like [`export_dataframe_to_xlsx`].
pub fn export_ipc_bytes_to_xlsx(
    v_ipc_df: &[u8],
    options: &SpecXlsxExportOptions,
) -> XlsxExportResult<Vec<u8>> {
    let mut df = IpcReader::new(Cursor::new(v_ipc_df)).finish()?;
    export_dataframe_to_xlsx(&mut df, options)
}

#[cfg(test)]
mod tests {
    use calamine::Data;
    use chrono::{NaiveDate, NaiveDateTime};
    use polars::prelude::*;

    use super::*;
    use crate::spec::{SpecXlsxSheetWriteOptions, XlsxExportError};
    use crate::testing::{read_cell, read_datetime, read_f64, read_sheet};

    fn naive(y: i32, m: u32, d: u32, hh: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|val| val.and_hms_opt(hh, 0, 0))
            .expect("valid timestamp")
    }

    #[test]
    fn test_export_writes_offset_timestamps_as_naive_utc() {
        let mut df = df!(
            "ts" => ["2023-01-01 10:00:00+02:00", "2023-01-02 11:00:00+02:00"],
            "n" => [1i64, 2],
        )
        .expect("df");

        let v_bytes = export_dataframe_to_xlsx(&mut df, &Default::default()).expect("export");

        let range = read_sheet(&v_bytes, "Sheet1");
        assert_eq!(read_cell(&range, 0, 1), Data::String("ts".to_string()));
        assert_eq!(read_cell(&range, 0, 2), Data::String("n".to_string()));
        assert_eq!(
            read_datetime(&read_cell(&range, 1, 1)),
            Some(naive(2023, 1, 1, 8))
        );
        assert_eq!(
            read_datetime(&read_cell(&range, 2, 1)),
            Some(naive(2023, 1, 2, 9))
        );
        assert_eq!(read_f64(&read_cell(&range, 1, 2)), Some(1.0));
        assert_eq!(read_f64(&read_cell(&range, 2, 2)), Some(2.0));

        assert_eq!(
            df.column("ts").expect("ts").dtype(),
            &DataType::Datetime(TimeUnit::Nanoseconds, None)
        );
    }

    #[test]
    fn test_export_keeps_partially_parseable_column_as_text() {
        let mut df = df!("mixed" => ["2023-01-01", "not-a-date"]).expect("df");

        let (report, cursor) =
            export_dataframe_to_xlsx_writer(&mut df, &Default::default(), Cursor::new(Vec::new()))
                .expect("export");

        assert!(report.cols_promoted.is_empty());
        let range = read_sheet(cursor.get_ref(), "Sheet1");
        assert_eq!(
            read_cell(&range, 1, 1),
            Data::String("2023-01-01".to_string())
        );
        assert_eq!(
            read_cell(&range, 2, 1),
            Data::String("not-a-date".to_string())
        );
    }

    #[test]
    fn test_export_without_index_starts_data_at_first_column() {
        let mut df = df!("a" => ["x", "y"], "b" => [3i64, 4]).expect("df");
        let options = SpecXlsxExportOptions {
            sheet: SpecXlsxSheetWriteOptions {
                sheet_name: "Report".to_string(),
                index: false,
                ..Default::default()
            },
            ..Default::default()
        };

        let (report, cursor) =
            export_dataframe_to_xlsx_writer(&mut df, &options, Cursor::new(Vec::new()))
                .expect("export");

        assert_eq!(report.sheet_name, "Report");
        assert_eq!((report.n_rows_written, report.n_cols_written), (3, 2));
        let range = read_sheet(cursor.get_ref(), "Report");
        assert_eq!(read_cell(&range, 0, 0), Data::String("a".to_string()));
        assert_eq!(read_cell(&range, 1, 0), Data::String("x".to_string()));
        assert_eq!(read_f64(&read_cell(&range, 2, 1)), Some(4.0));
    }

    #[test]
    fn test_export_reports_promoted_columns() {
        let mut df = df!(
            "day" => [Some("2024-03-01"), None],
            "label" => [Some("a"), Some("b")],
        )
        .expect("df");

        let (report, cursor) =
            export_dataframe_to_xlsx_writer(&mut df, &Default::default(), Cursor::new(Vec::new()))
                .expect("export");

        assert_eq!(report.cols_promoted, vec!["day".to_string()]);
        let range = read_sheet(cursor.get_ref(), "Sheet1");
        assert_eq!(
            read_datetime(&read_cell(&range, 1, 1)),
            Some(naive(2024, 3, 1, 0))
        );
        assert_eq!(read_cell(&range, 2, 1), Data::Empty);
    }

    #[test]
    fn test_export_propagates_encoder_error_for_invalid_sheet_name() {
        let mut df = df!("a" => [1i64]).expect("df");
        let options = SpecXlsxExportOptions {
            sheet: SpecXlsxSheetWriteOptions {
                sheet_name: "a:b".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        let err = export_dataframe_to_xlsx(&mut df, &options).expect_err("invalid name");
        assert!(matches!(err, XlsxExportError::Xlsx(_)));
    }

    #[test]
    fn test_export_rejects_timezone_aware_datetime_column() {
        let s_ts = Series::new("ts".into(), [0i64])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, Some(TimeZone::UTC)))
            .expect("tz datetime");
        assert!(matches!(s_ts.dtype(), DataType::Datetime(_, Some(_))));
        let mut df = DataFrame::new(vec![s_ts.into()]).expect("df");

        let err = export_dataframe_to_xlsx(&mut df, &Default::default()).expect_err("tz");
        assert!(matches!(err, XlsxExportError::TimezoneNotSupported(name) if name == "ts"));
    }

    #[test]
    fn test_export_ipc_bytes_round_trip() {
        let mut df = df!(
            "ts" => ["2023-06-01T12:30:00Z", "2023-06-02T00:00:00Z"],
            "v" => [1.25f64, 2.5],
        )
        .expect("df");
        let mut v_ipc = Vec::new();
        IpcWriter::new(&mut v_ipc).finish(&mut df).expect("ipc");

        let v_bytes = export_ipc_bytes_to_xlsx(&v_ipc, &Default::default()).expect("export");

        let range = read_sheet(&v_bytes, "Sheet1");
        assert_eq!(
            read_datetime(&read_cell(&range, 1, 1)),
            NaiveDate::from_ymd_opt(2023, 6, 1).and_then(|val| val.and_hms_opt(12, 30, 0))
        );
        assert_eq!(read_f64(&read_cell(&range, 2, 2)), Some(2.5));
    }

    #[test]
    fn test_export_ipc_bytes_rejects_garbage_payload() {
        let err = export_ipc_bytes_to_xlsx(b"not ipc", &Default::default()).expect_err("garbage");
        assert!(matches!(err, XlsxExportError::Polars(_)));
    }
}

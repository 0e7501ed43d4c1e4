//! Scoped XLSX writer session that streams DataFrames into one workbook.

use std::collections::BTreeMap;
use std::io::{Seek, Write};

use polars::prelude::{AnyValue, DataFrame, DataType, Series};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};

use crate::conf::{N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX};
use crate::spec::{
    EnumCellValue, EnumXlsxHeader, SpecCellFormat, SpecXlsxReport, SpecXlsxSessionOptions,
    SpecXlsxSheetWriteOptions, XlsxExportError, XlsxExportResult,
};
use crate::util::{convert_cell_value, derive_cell_value_from_any_value, select_indices_from_refs};

/// Workbook bound to a caller target until [`Self::close`].
///
/// The workbook is buffered in memory and serialized into the target
/// exactly once: by `close`, by `into_inner`, or on drop.
pub struct XlsxSession<W: Write + Seek + Send> {
    target: Option<W>,
    workbook: Workbook,
    options: SpecXlsxSessionOptions,
    /// Lower-cased sheet name -> sheet name as created (Excel names are case-insensitive).
    dict_sheet_names_existing: BTreeMap<String, String>,
    if_closed: bool,
}

impl<W: Write + Seek + Send> XlsxSession<W> {
    /// Open a session writing into `target`.
    pub fn new(target: W, options: SpecXlsxSessionOptions) -> Self {
        Self {
            target: Some(target),
            workbook: Workbook::new(),
            options,
            dict_sheet_names_existing: BTreeMap::new(),
            if_closed: false,
        }
    }

    pub fn options(&self) -> &SpecXlsxSessionOptions {
        &self.options
    }

    pub fn is_closed(&self) -> bool {
        self.if_closed
    }

    /// Serialize the workbook into the target. Idempotent.
    ///
    /// Finalization is attempted once; a failed attempt is not retried.
    pub fn close(&mut self) -> XlsxExportResult<()> {
        if self.if_closed {
            return Ok(());
        }
        self.if_closed = true;

        let Some(target) = self.target.as_mut() else {
            return Ok(());
        };
        self.workbook.save_to_writer(target)?;
        tracing::debug!(
            n_sheets = self.dict_sheet_names_existing.len(),
            "xlsx session finalized"
        );
        Ok(())
    }

    /// Finalize and hand back the target.
    pub fn into_inner(mut self) -> XlsxExportResult<W> {
        self.close()?;
        self.target.take().ok_or(XlsxExportError::SessionClosed)
    }

    /// Write one table into `options.sheet_name`.
    ///
    /// Writing the same sheet name twice in one session targets the same
    /// worksheet, so tables can be stacked via `startrow`/`startcol`.
    pub fn write_dataframe(
        &mut self,
        df: &DataFrame,
        options: &SpecXlsxSheetWriteOptions,
    ) -> XlsxExportResult<SpecXlsxReport> {
        if self.if_closed {
            return Err(XlsxExportError::SessionClosed);
        }

        let l_colnames_df: Vec<String> = df
            .get_column_names_str()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        let l_cols_idx = select_indices_from_refs(&l_colnames_df, options.columns.as_deref())?;
        let l_cols = df.get_columns();

        for n_idx_col in &l_cols_idx {
            if let DataType::Datetime(_, Some(_)) = l_cols[*n_idx_col].dtype() {
                return Err(XlsxExportError::TimezoneNotSupported(
                    l_colnames_df[*n_idx_col].clone(),
                ));
            }
        }

        let l_header = match &options.header {
            EnumXlsxHeader::Show => Some(
                l_cols_idx
                    .iter()
                    .map(|n_idx| l_colnames_df[*n_idx].clone())
                    .collect::<Vec<_>>(),
            ),
            EnumXlsxHeader::Hide => None,
            EnumXlsxHeader::Aliases(l_aliases) => {
                if l_aliases.len() != l_cols_idx.len() {
                    return Err(XlsxExportError::HeaderAliasMismatch {
                        n_cols: l_cols_idx.len(),
                        n_aliases: l_aliases.len(),
                    });
                }
                Some(l_aliases.clone())
            }
        };

        let n_rows_header = usize::from(l_header.is_some());
        let n_cols_index = usize::from(options.index);
        let n_height_df = df.height();
        let n_rows_block = n_rows_header + n_height_df;
        let n_cols_block = n_cols_index + l_cols_idx.len();
        let n_rows_total = options.startrow + n_rows_block;
        let n_cols_total = options.startcol + n_cols_block;
        if n_rows_total > N_NROWS_EXCEL_MAX || n_cols_total > N_NCOLS_EXCEL_MAX {
            return Err(XlsxExportError::SheetTooLarge {
                n_rows: n_rows_total,
                n_cols: n_cols_total,
            });
        }

        let mut report = SpecXlsxReport {
            sheet_name: options.sheet_name.clone(),
            row_start: options.startrow,
            col_start: options.startcol,
            n_rows_written: n_rows_block,
            n_cols_written: n_cols_block,
            ..Default::default()
        };

        let fmt_header = derive_rust_xlsx_format(&self.options.fmt_header);
        let mut l_fmt_data_by_col = Vec::with_capacity(l_cols_idx.len());
        for n_idx_col in &l_cols_idx {
            let dtype = l_cols[*n_idx_col].dtype();
            if !is_natively_written_dtype(dtype) {
                report.warn(format!(
                    "Column {:?} of type {dtype} written as text.",
                    l_colnames_df[*n_idx_col]
                ));
            }
            l_fmt_data_by_col.push(derive_rust_xlsx_format(&plan_column_format(
                dtype,
                options.float_format.as_deref(),
                &self.options,
            )));
        }

        let worksheet = self.derive_worksheet(&options.sheet_name)?;

        let n_row_start = options.startrow;
        let n_col_start = options.startcol;
        let n_col_data_start = n_col_start + n_cols_index;

        if let Some(l_header) = &l_header {
            if options.index
                && let Some(c_label) = &options.index_label
            {
                worksheet.write_string_with_format(
                    cast_row_num(n_row_start)?,
                    cast_col_num(n_col_start)?,
                    c_label,
                    &fmt_header,
                )?;
            }
            for (n_idx_col, c_text) in l_header.iter().enumerate() {
                worksheet.write_string_with_format(
                    cast_row_num(n_row_start)?,
                    cast_col_num(n_col_data_start + n_idx_col)?,
                    c_text,
                    &fmt_header,
                )?;
            }
        }

        // Single-chunk copies so each column is walked once by one iterator.
        let l_series_data: Vec<Series> = l_cols_idx
            .iter()
            .map(|n_idx_col| l_cols[*n_idx_col].as_materialized_series().rechunk())
            .collect();
        let mut l_iters_data: Vec<_> = l_series_data.iter().map(Series::iter).collect();

        let n_row_data_start = n_row_start + n_rows_header;
        for n_idx_row in 0..n_height_df {
            let n_row = cast_row_num(n_row_data_start + n_idx_row)?;
            if options.index {
                worksheet.write_number_with_format(
                    n_row,
                    cast_col_num(n_col_start)?,
                    n_idx_row as f64,
                    &fmt_header,
                )?;
            }
            for (n_idx_col_out, iter_col) in l_iters_data.iter_mut().enumerate() {
                let value = convert_cell_value(
                    derive_cell_value_from_any_value(iter_col.next().unwrap_or(AnyValue::Null)),
                    &options.value_policy,
                );
                write_cell_with_format(
                    worksheet,
                    n_row,
                    cast_col_num(n_col_data_start + n_idx_col_out)?,
                    &value,
                    &l_fmt_data_by_col[n_idx_col_out],
                )?;
            }
        }

        if let Some((n_row_freeze, n_col_freeze)) = options.freeze_panes {
            worksheet.set_freeze_panes(cast_row_num(n_row_freeze)?, cast_col_num(n_col_freeze)?)?;
        }

        tracing::debug!(
            sheet = %report.sheet_name,
            n_rows = report.n_rows_written,
            n_cols = report.n_cols_written,
            "dataframe written to worksheet"
        );
        Ok(report)
    }

    fn derive_worksheet(&mut self, sheet_name: &str) -> XlsxExportResult<&mut Worksheet> {
        let c_key = sheet_name.to_lowercase();
        if let Some(c_name_existing) = self.dict_sheet_names_existing.get(&c_key) {
            return Ok(self.workbook.worksheet_from_name(c_name_existing)?);
        }

        let mut worksheet = Worksheet::new();
        worksheet.set_name(sheet_name)?;
        self.workbook.push_worksheet(worksheet);
        self.dict_sheet_names_existing
            .insert(c_key, sheet_name.to_string());
        Ok(self.workbook.worksheet_from_name(sheet_name)?)
    }
}

impl<W: Write + Seek + Send> Drop for XlsxSession<W> {
    fn drop(&mut self) {
        if !self.if_closed
            && let Err(err) = self.close()
        {
            tracing::warn!(error = %err, "xlsx session finalization on drop failed");
        }
    }
}

/// Run `f` inside a session over `target`, finalizing it on every exit path.
///
/// An error from `f` is returned as-is; if finalization then also fails, that
/// second error is only logged. On success the finalized target is returned.
pub fn with_xlsx_session<W, T, F>(
    target: W,
    options: &SpecXlsxSessionOptions,
    f: F,
) -> XlsxExportResult<(T, W)>
where
    W: Write + Seek + Send,
    F: FnOnce(&mut XlsxSession<W>) -> XlsxExportResult<T>,
{
    let mut session = XlsxSession::new(target, options.clone());
    match f(&mut session) {
        Ok(value) => {
            let target = session.into_inner()?;
            Ok((value, target))
        }
        Err(err) => {
            if let Err(err_close) = session.close() {
                tracing::warn!(error = %err_close, "xlsx session finalization failed after write error");
            }
            Err(err)
        }
    }
}

/// Base cell format for one column, by dtype.
pub fn plan_column_format(
    dtype: &DataType,
    float_format: Option<&str>,
    session_options: &SpecXlsxSessionOptions,
) -> SpecCellFormat {
    let fmt_base = SpecCellFormat::default();
    match dtype {
        DataType::Datetime(_, _) => fmt_base.with_num_format(&session_options.datetime_format),
        DataType::Date => fmt_base.with_num_format(&session_options.date_format),
        DataType::Float32 | DataType::Float64 => match float_format {
            Some(val) => fmt_base.with_num_format(val),
            None => fmt_base,
        },
        _ => fmt_base,
    }
}

fn is_natively_written_dtype(dtype: &DataType) -> bool {
    dtype.is_numeric()
        || matches!(
            dtype,
            DataType::String
                | DataType::Boolean
                | DataType::Null
                | DataType::Date
                | DataType::Datetime(_, _)
        )
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &EnumCellValue,
    format: &Format,
) -> XlsxExportResult<()> {
    match value {
        EnumCellValue::None => {
            worksheet.write_blank(row, col, format)?;
        }
        EnumCellValue::String(val) => {
            worksheet.write_string_with_format(row, col, val, format)?;
        }
        EnumCellValue::Number(val) => {
            worksheet.write_number_with_format(row, col, *val, format)?;
        }
        EnumCellValue::Boolean(val) => {
            worksheet.write_boolean_with_format(row, col, *val, format)?;
        }
        EnumCellValue::DateTime(val) => {
            worksheet.write_datetime_with_format(row, col, val, format)?;
        }
        EnumCellValue::Date(val) => {
            worksheet.write_datetime_with_format(row, col, val, format)?;
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }

    for val in [&spec.align, &spec.valign].into_iter().flatten() {
        if let Some(align) = derive_format_align(val) {
            format = format.set_align(align);
        }
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }
    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    match align.trim().to_ascii_lowercase().as_str() {
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> XlsxExportResult<u32> {
    u32::try_from(value).map_err(|_| XlsxExportError::IndexOverflow { axis: "row", value })
}

fn cast_col_num(value: usize) -> XlsxExportResult<u16> {
    u16::try_from(value).map_err(|_| XlsxExportError::IndexOverflow {
        axis: "column",
        value,
    })
}

//! XLSX constants and default preset factories.

use crate::spec::SpecCellFormat;

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;

/// Worksheet name used when the caller does not pick one.
pub const C_SHEET_NAME_DEFAULT: &str = "Sheet1";
/// Number format applied to timezone-naive datetime cells.
pub const C_DATETIME_FORMAT_DEFAULT: &str = "yyyy-mm-dd hh:mm:ss";
/// Number format applied to date cells.
pub const C_DATE_FORMAT_DEFAULT: &str = "yyyy-mm-dd";
/// Text written for positive infinity (negative infinity gets a `-` prefix).
pub const C_INF_REP_DEFAULT: &str = "inf";

/// Offset between the Unix epoch and `0001-01-01` in days (chrono CE numbering).
pub const N_DAYS_UNIX_EPOCH_FROM_CE: i32 = 719_163;

/// Header/index cell format: bold, thin border, centered, top-aligned.
pub fn derive_default_header_format() -> SpecCellFormat {
    SpecCellFormat {
        bold: Some(true),
        border: Some(1),
        align: Some("center".to_string()),
        valign: Some("top".to_string()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_header_format_is_bold_bordered_centered() {
        let fmt = derive_default_header_format();
        assert_eq!(fmt.bold, Some(true));
        assert_eq!(fmt.border, Some(1));
        assert_eq!(fmt.align.as_deref(), Some("center"));
        assert_eq!(fmt.valign.as_deref(), Some("top"));
        assert_eq!(fmt.num_format, None);
    }
}

//! Stateless helper utilities used by the promoter and the XLSX writer session.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use polars::prelude::{AnyValue, TimeUnit};

use crate::conf::N_DAYS_UNIX_EPOCH_FROM_CE;
use crate::spec::{EnumCellValue, SpecXlsxValuePolicy, XlsxExportError, XlsxExportResult};

////////////////////////////////////////////////////////////////////////////////
// #region TimestampParsing

/// Offset-bearing shapes; `%#z` accepts `Z`, `+HH`, `+HHMM` and `+HH:MM`.
const L_FMT_TIMESTAMP_AWARE: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f %#z",
    "%Y-%m-%dT%H:%M:%S%.f %#z",
    "%Y-%m-%d %H:%M%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y/%m/%d %H:%M:%S%.f%#z",
    "%Y/%m/%d %H:%M:%S%.f %#z",
];

const L_FMT_TIMESTAMP_NAIVE: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
];

/// Date-only shapes; `%B` is the full month name, `%b` the abbreviation.
const L_FMT_DATE: [&str; 9] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
];

/// One successfully parsed timestamp string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumParsedTimestamp {
    /// No offset in the source text; wall time kept as-is.
    Naive(NaiveDateTime),
    /// Source text carried a UTC offset.
    Aware(DateTime<FixedOffset>),
}

impl EnumParsedTimestamp {
    /// Whether the source text carried an offset.
    pub fn is_aware(&self) -> bool {
        matches!(self, EnumParsedTimestamp::Aware(_))
    }

    /// Normalize to UTC (for aware values) and drop the offset.
    pub fn to_naive_utc(&self) -> NaiveDateTime {
        match self {
            EnumParsedTimestamp::Naive(val) => *val,
            EnumParsedTimestamp::Aware(val) => val.naive_utc(),
        }
    }
}

/// Parse one string as a timestamp; `None` when no known shape matches.
///
/// Shapes are tried in order: RFC 3339, RFC 2822, ISO-like with offset,
/// ISO-like/slashed naive date-times, then date-only (midnight).
/// Month-first is assumed for `a/b/yyyy`.
pub fn parse_timestamp(text: &str) -> Option<EnumParsedTimestamp> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(val) = DateTime::parse_from_rfc3339(text) {
        return Some(EnumParsedTimestamp::Aware(val));
    }
    if let Ok(val) = DateTime::parse_from_rfc2822(text) {
        return Some(EnumParsedTimestamp::Aware(val));
    }
    for fmt in L_FMT_TIMESTAMP_AWARE {
        if let Ok(val) = DateTime::parse_from_str(text, fmt) {
            return Some(EnumParsedTimestamp::Aware(val));
        }
    }
    for fmt in L_FMT_TIMESTAMP_NAIVE {
        if let Ok(val) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(EnumParsedTimestamp::Naive(val));
        }
    }
    for fmt in L_FMT_DATE {
        if let Ok(val) = NaiveDate::parse_from_str(text, fmt)
            && let Some(val_midnight) = val.and_hms_opt(0, 0, 0)
        {
            return Some(EnumParsedTimestamp::Naive(val_midnight));
        }
    }
    None
}

/// Parse a whole text column into naive UTC nanoseconds since the Unix epoch.
///
/// Missing and blank entries stay missing. Returns `None` (column must stay
/// unchanged) when any other entry fails to parse, when offset-bearing and
/// offset-free entries are mixed, or when a value does not fit in `i64` ns.
pub fn parse_timestamp_values<'a, I>(values: I) -> Option<Vec<Option<i64>>>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let iter = values.into_iter();
    let mut l_nanos = Vec::with_capacity(iter.size_hint().0);
    let mut if_aware_seen: Option<bool> = None;

    for value in iter {
        let Some(text) = value.map(str::trim).filter(|val| !val.is_empty()) else {
            l_nanos.push(None);
            continue;
        };

        let parsed = parse_timestamp(text)?;
        match if_aware_seen {
            None => if_aware_seen = Some(parsed.is_aware()),
            Some(if_aware) if if_aware != parsed.is_aware() => return None,
            Some(_) => {}
        }

        l_nanos.push(Some(parsed.to_naive_utc().and_utc().timestamp_nanos_opt()?));
    }

    Some(l_nanos)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TemporalDecoding

/// Decode a physical datetime value into a naive timestamp.
pub fn derive_naive_datetime(value: i64, time_unit: TimeUnit) -> Option<NaiveDateTime> {
    let dt = match time_unit {
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(value)),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(value),
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(value),
    };
    dt.map(|val| val.naive_utc())
}

/// Decode a physical date value (days since the Unix epoch).
pub fn derive_naive_date(days: i32) -> Option<NaiveDate> {
    days.checked_add(N_DAYS_UNIX_EPOCH_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

/// Map one dataframe value onto the cell model.
pub fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::Boolean(val) => EnumCellValue::Boolean(val),
        AnyValue::UInt8(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt16(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt32(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int8(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int16(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float64(val) => EnumCellValue::Number(val),
        AnyValue::Date(days) => derive_naive_date(days)
            .map(EnumCellValue::Date)
            .unwrap_or_else(|| EnumCellValue::String(value.to_string())),
        AnyValue::Datetime(val, time_unit, _) => derive_naive_datetime(val, time_unit)
            .map(EnumCellValue::DateTime)
            .unwrap_or_else(|| EnumCellValue::String(value.to_string())),
        _ => EnumCellValue::String(value.to_string()),
    }
}

/// Text for NaN/Inf under `value_policy`; `None` for finite values.
///
/// NaN maps to `na_rep`, `+inf` to `inf_rep`, `-inf` to `-{inf_rep}`.
pub fn convert_nan_inf_to_str(x: f64, value_policy: &SpecXlsxValuePolicy) -> Option<String> {
    if x.is_nan() {
        return Some(value_policy.na_rep.clone());
    }
    if x.is_infinite() {
        return Some(if x.is_sign_positive() {
            value_policy.inf_rep.clone()
        } else {
            format!("-{}", value_policy.inf_rep)
        });
    }
    None
}

/// Apply missing/NaN/Inf replacement; empty replacement text becomes a blank cell.
pub fn convert_cell_value(value: EnumCellValue, value_policy: &SpecXlsxValuePolicy) -> EnumCellValue {
    let c_replacement = match &value {
        EnumCellValue::None => value_policy.na_rep.clone(),
        EnumCellValue::Number(n) => match convert_nan_inf_to_str(*n, value_policy) {
            Some(val) => val,
            None => return value,
        },
        _ => return value,
    };

    if c_replacement.is_empty() {
        EnumCellValue::None
    } else {
        EnumCellValue::String(c_replacement)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DataFrameLikeUtils

/// Resolve column refs to indices in caller order; `None` selects every column.
pub fn select_indices_from_refs(
    columns: &[String],
    refs: Option<&[String]>,
) -> XlsxExportResult<Vec<usize>> {
    let Some(refs) = refs else {
        return Ok((0..columns.len()).collect());
    };

    refs.iter()
        .map(|ref_col| {
            columns
                .iter()
                .position(|c_name| c_name == ref_col)
                .ok_or_else(|| XlsxExportError::ColumnNotFound(ref_col.clone()))
        })
        .collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

//! Text-to-datetime column promotion applied before a table is written.
//!
//! A `String` column becomes `Datetime(ns, None)` only when every non-missing
//! value parses with [`parse_timestamp`](crate::util::parse_timestamp). Other
//! columns, and text columns with any unparsable value, are left untouched.

use polars::prelude::{Column, DataFrame, DataType, NamedFrom, PolarsResult, Series, TimeUnit};

use crate::util::parse_timestamp_values;

/// Promote every fully parseable text column in place; returns `df` for chaining.
pub fn promote_datetime_columns(df: &mut DataFrame) -> &mut DataFrame {
    promote_datetime_columns_with_report(df);
    df
}

/// Promote in place and return the names of the promoted columns.
pub fn promote_datetime_columns_with_report(df: &mut DataFrame) -> Vec<String> {
    let l_cols_promoted: Vec<Series> = df
        .get_columns()
        .iter()
        .filter(|col| matches!(col.dtype(), DataType::String))
        .filter_map(|col| match derive_promoted_column(col) {
            Ok(promoted) => promoted,
            Err(err) => {
                tracing::debug!(column = %col.name(), error = %err, "datetime promotion skipped");
                None
            }
        })
        .collect();

    let mut l_names = Vec::with_capacity(l_cols_promoted.len());
    for series in l_cols_promoted {
        let c_name = series.name().to_string();
        match df.with_column(series) {
            Ok(_) => {
                tracing::debug!(column = %c_name, "promoted text column to datetime");
                l_names.push(c_name);
            }
            Err(err) => {
                tracing::debug!(column = %c_name, error = %err, "datetime promotion skipped");
            }
        }
    }
    l_names
}

/// Build the promoted replacement for one text column, or `None` to keep it.
fn derive_promoted_column(col: &Column) -> PolarsResult<Option<Series>> {
    let ca = col.as_materialized_series().str()?;
    let Some(l_nanos) = parse_timestamp_values(ca) else {
        tracing::debug!(column = %col.name(), "kept text column: not every value is a timestamp");
        return Ok(None);
    };

    let series = Series::new(col.name().clone(), l_nanos)
        .cast(&DataType::Datetime(TimeUnit::Nanoseconds, None))?;
    Ok(Some(series))
}

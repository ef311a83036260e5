//! Data Guard lag parsing
//!
//! `V$DATAGUARD_STATS` reports lags as day-to-second interval literals of
//! the form `+DD HH:MI:SS`. The reported replication lag is transport lag
//! plus apply lag. The two overlap in some configurations, so the sum can
//! overstate the real delay; dashboards built on this value expect the sum.

use super::DbError;

pub const APPLY_LAG: &str = "apply lag";
pub const TRANSPORT_LAG: &str = "transport lag";

const ZERO_LAG: &str = "+00 00:00:00";

/// Error parsing an interval literal
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LagParseError {
    #[error("invalid lag format: expected '+DD HH:MI:SS', got '{0}'")]
    MissingSign(String),
    #[error("invalid lag format structure (days part): '{0}'")]
    MissingTime(String),
    #[error("invalid days value in lag: '{0}'")]
    Days(String),
    #[error("invalid time format structure in lag: '{0}'")]
    TimeFields(String),
    #[error("invalid hours value in lag: '{0}'")]
    Hours(String),
    #[error("invalid minutes value in lag: '{0}'")]
    Minutes(String),
    #[error("invalid seconds value in lag: '{0}'")]
    Seconds(String),
    #[error("lag out of range: '{0}'")]
    OutOfRange(String),
}

/// Convert a `+DD HH:MI:SS` interval literal to seconds.
///
/// Empty input and the zero literal are 0.
pub fn parse_lag(lag: &str) -> Result<i64, LagParseError> {
    let lag = lag.trim();
    if lag.is_empty() || lag == ZERO_LAG {
        return Ok(0);
    }

    let rest = lag
        .strip_prefix('+')
        .ok_or_else(|| LagParseError::MissingSign(lag.to_string()))?;

    let (days, time) = rest
        .split_once(' ')
        .ok_or_else(|| LagParseError::MissingTime(lag.to_string()))?;

    let days: i64 = days
        .parse()
        .map_err(|_| LagParseError::Days(days.to_string()))?;

    let fields: Vec<&str> = time.split(':').collect();
    let [hours, minutes, seconds] = fields.as_slice() else {
        return Err(LagParseError::TimeFields(time.to_string()));
    };

    let hours: i64 = hours
        .parse()
        .map_err(|_| LagParseError::Hours(hours.to_string()))?;
    let minutes: i64 = minutes
        .parse()
        .map_err(|_| LagParseError::Minutes(minutes.to_string()))?;
    let seconds: i64 = seconds
        .parse()
        .map_err(|_| LagParseError::Seconds(seconds.to_string()))?;

    days.checked_mul(86_400)
        .and_then(|total| total.checked_add(hours.checked_mul(3_600)?))
        .and_then(|total| total.checked_add(minutes.checked_mul(60)?))
        .and_then(|total| total.checked_add(seconds))
        .ok_or_else(|| LagParseError::OutOfRange(lag.to_string()))
}

/// One row of `V$DATAGUARD_STATS`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LagStat {
    pub name: Option<String>,
    pub value: Option<String>,
}

impl LagStat {
    pub fn new(name: &str, value: Option<&str>) -> Self {
        Self {
            name: Some(name.to_string()),
            value: value.map(str::to_string),
        }
    }
}

/// Sum transport and apply lag from the stats rows.
///
/// Returns `Ok(None)` when there are no rows or neither metric is present.
/// A NULL value counts as zero lag; a metric missing while the other is
/// present also counts as zero.
pub fn compute_lag<I>(rows: I) -> Result<Option<i64>, DbError>
where
    I: IntoIterator<Item = LagStat>,
{
    let mut row_count = 0usize;
    let mut transport: Option<String> = None;
    let mut apply: Option<String> = None;

    for row in rows {
        row_count += 1;
        let name = row
            .name
            .ok_or_else(|| DbError::LagFetch("NAME column is NULL".to_string()))?;
        let value = row.value.unwrap_or_default();
        match name.as_str() {
            TRANSPORT_LAG => transport = Some(value),
            APPLY_LAG => apply = Some(value),
            _ => {}
        }
    }

    if row_count == 0 || (transport.is_none() && apply.is_none()) {
        return Ok(None);
    }

    let transport = parse_lag(transport.as_deref().unwrap_or_default())?;
    let apply = parse_lag(apply.as_deref().unwrap_or_default())?;
    let total = transport.checked_add(apply).ok_or_else(|| {
        LagParseError::OutOfRange(format!("transport {} + apply {}", transport, apply))
    })?;
    Ok(Some(total))
}

/// UTC normalization for stored timestamps
///
/// Timestamps are always persisted as UTC. Values that carry a local or fixed
/// offset are shifted to the UTC wall clock before they are written; values
/// that are already UTC, or that carry no zone information at all, are written
/// unchanged. Everything read back is tagged as UTC.
///
/// `UtcDateTime` wraps this mapping as a sqlx column type so models can read
/// both `timestamp` and `timestamptz` columns (the `AuditLog.Created` column
/// changes between the two across migrations).
///
/// # Example
///
/// ```
/// use chrono::{Local, TimeZone};
/// use nong_identity_shared::time::{from_provider, to_provider, Timestamp};
///
/// let local = Local.with_ymd_and_hms(2024, 7, 19, 14, 38, 37).unwrap();
/// let stored = to_provider(Timestamp::Local(local));
/// let read = from_provider(stored);
/// assert_eq!(read, local);
/// ```

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{
    encode::IsNull,
    error::BoxDynError,
    postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef},
    Decode, Encode, Postgres, Type, ValueRef,
};
use std::fmt;

/// A timestamp together with what is known about its zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    /// Already in UTC
    Utc(DateTime<Utc>),

    /// In the process-local zone
    Local(DateTime<Local>),

    /// Carrying an explicit offset
    Offset(DateTime<FixedOffset>),

    /// Wall clock with no zone information
    Unspecified(NaiveDateTime),
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Timestamp::Utc(value)
    }
}

impl From<DateTime<Local>> for Timestamp {
    fn from(value: DateTime<Local>) -> Self {
        Timestamp::Local(value)
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Timestamp::Offset(value)
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(value: NaiveDateTime) -> Self {
        Timestamp::Unspecified(value)
    }
}

/// Maps a timestamp to the wall clock that gets stored
///
/// Local and offset values are converted to UTC. UTC and unspecified values
/// pass through untouched.
pub fn to_provider(value: Timestamp) -> NaiveDateTime {
    match value {
        Timestamp::Utc(dt) => dt.naive_utc(),
        Timestamp::Local(dt) => dt.naive_utc(),
        Timestamp::Offset(dt) => dt.naive_utc(),
        Timestamp::Unspecified(naive) => naive,
    }
}

/// Tags a stored wall clock as UTC
pub fn from_provider(value: NaiveDateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_naive_utc_and_offset(value, Utc)
}

/// Runs a value through a write followed by a read
pub fn normalize(value: impl Into<Timestamp>) -> DateTime<Utc> {
    from_provider(to_provider(value.into()))
}

/// UTC timestamp column type
///
/// Decodes from `timestamp` (tagging the value as UTC) and from
/// `timestamptz`. Always encodes as `timestamptz`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UtcDateTime(pub DateTime<Utc>);

impl UtcDateTime {
    /// Current time
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Inner UTC value
    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }

    /// Smallest representable value, used as the column default
    pub fn min_value() -> Self {
        let year_one = NaiveDate::from_ymd_opt(1, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or(NaiveDateTime::MIN);
        Self(from_provider(year_one))
    }
}

impl From<Timestamp> for UtcDateTime {
    fn from(value: Timestamp) -> Self {
        Self(from_provider(to_provider(value)))
    }
}

impl From<DateTime<Utc>> for UtcDateTime {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl From<DateTime<Local>> for UtcDateTime {
    fn from(value: DateTime<Local>) -> Self {
        Timestamp::Local(value).into()
    }
}

impl From<NaiveDateTime> for UtcDateTime {
    fn from(value: NaiveDateTime) -> Self {
        Timestamp::Unspecified(value).into()
    }
}

impl fmt::Display for UtcDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl Type<Postgres> for UtcDateTime {
    fn type_info() -> PgTypeInfo {
        <DateTime<Utc> as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <DateTime<Utc> as Type<Postgres>>::compatible(ty)
            || <NaiveDateTime as Type<Postgres>>::compatible(ty)
    }
}

impl Encode<'_, Postgres> for UtcDateTime {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> IsNull {
        <DateTime<Utc> as Encode<'_, Postgres>>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> Decode<'r, Postgres> for UtcDateTime {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let zoned = <DateTime<Utc> as Type<Postgres>>::compatible(&value.type_info());

        if zoned {
            let dt = <DateTime<Utc> as Decode<'r, Postgres>>::decode(value)?;
            Ok(Self(dt))
        } else {
            let naive = <NaiveDateTime as Decode<'r, Postgres>>::decode(value)?;
            Ok(Self(from_provider(naive)))
        }
    }
}

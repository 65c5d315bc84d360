use chrono::{DateTime, NaiveDateTime, Utc};

/// Parse a timestamp as SQLite hands it back. `datetime('now')` produces
/// `"YYYY-MM-DD HH:MM:SS"` without a timezone; values written by the
/// application may be RFC 3339. Treat naive values as UTC.
pub fn parse_sqlite_datetime(s: &str) -> Option<DateTime<Utc>> {
    s.parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

/// Serialize `created_on` as a bare `%Y-%m-%d` date, the read-only format
/// the profile and post schemas expose.
pub mod date_only {
    use chrono::{DateTime, Utc};
    use serde::Serializer;

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&dt.format("%Y-%m-%d").to_string())
    }
}

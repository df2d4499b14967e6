use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime, UtcOffset,
};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    to_primitive_utc(OffsetDateTime::now_utc())
}

pub(crate) fn to_primitive_utc(value: OffsetDateTime) -> PrimitiveDateTime {
    let utc = value.to_offset(UtcOffset::UTC);
    PrimitiveDateTime::new(utc.date(), utc.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

/// Parses an RFC 3339 timestamp from a request body and normalizes it to UTC.
pub(crate) fn parse_rfc3339_utc(raw: &str) -> Option<PrimitiveDateTime> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339).ok().map(to_primitive_utc)
}

/// Accepts RFC 3339 and the zone-less `YYYY-MM-DDTHH:MM[:SS]` that HTML
/// `datetime-local` inputs send; zone-less values are read as UTC.
pub(crate) fn parse_flexible_utc(raw: &str) -> Option<PrimitiveDateTime> {
    let raw = raw.trim();
    if let Some(value) = parse_rfc3339_utc(raw) {
        return Some(value);
    }

    PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"))
        .or_else(|_| {
            PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
        })
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Time};

    #[test]
    fn format_primitive_outputs_utc_z() {
        let date = Date::from_calendar_date(2025, time::Month::January, 2).unwrap();
        let time = Time::from_hms(10, 20, 30).unwrap();
        let value = PrimitiveDateTime::new(date, time);
        assert_eq!(format_primitive(value), "2025-01-02T10:20:30Z");
    }

    #[test]
    fn parse_rfc3339_shifts_offset_to_utc() {
        let parsed = parse_rfc3339_utc("2025-01-02T13:20:30+03:00").expect("parsed");
        assert_eq!(format_primitive(parsed), "2025-01-02T10:20:30Z");
    }

    #[test]
    fn flexible_parse_accepts_datetime_local() {
        let parsed = parse_flexible_utc("2025-03-04T18:30").expect("parsed");
        assert_eq!(format_primitive(parsed), "2025-03-04T18:30:00Z");
        let parsed = parse_flexible_utc("2025-03-04T18:30:15").expect("parsed");
        assert_eq!(format_primitive(parsed), "2025-03-04T18:30:15Z");
        assert!(parse_flexible_utc("04/03/2025").is_none());
    }

    #[test]
    fn parse_rfc3339_rejects_garbage() {
        assert!(parse_rfc3339_utc("next tuesday").is_none());
    }
}

use time::OffsetDateTime;

/// Current UTC timestamp. All core timestamps are UTC.
pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_utc_is_utc() {
        let now = now_utc();
        assert_eq!(now.offset(), time::UtcOffset::UTC);
    }
}

use super::*;

fn ts(s: &str) -> Timestamp {
    Timestamp::parse_strict(s).unwrap()
}

#[test]
fn strict_accepts_zero_to_three_fraction_digits() {
    let t = ts("2022-04-02 16:24:56.239 UTC");
    assert_eq!(t.millis(), 239);
    assert_eq!(ts("2022-04-02 16:24:56.23 UTC").millis(), 230);
    assert_eq!(ts("2022-04-02 16:24:56.2 UTC").millis(), 200);
    assert_eq!(ts("2022-04-02 16:24:56 UTC").millis(), 0);
    assert_eq!(ts("2022-04-02 16:24:56").millis(), 0);
    assert_eq!(t.to_string(), "2022-04-02 16:24:56.239");
}

#[test]
fn strict_rejects_garbled_fractions() {
    for bad in [
        "2022-04-02 16:24:56.2x UTC",
        "2022-04-02 16:24:56. UTC",
        "2022-04-02 16:24:56.2391 UTC",
        "2022-04-02 16:24:56Z",
        "2022-04-02 16:24",
        "timestamp",
    ] {
        let err = Timestamp::parse_strict(bad).unwrap_err();
        assert!(matches!(err, PlaceError::AmbiguousTimestamp(_)), "{bad}");
    }
}

#[test]
fn whole_second_truncates_fraction() {
    let a = ts("2022-04-01 00:44:00.999 UTC");
    let b = ts("2022-04-01 00:44:00 UTC");
    assert_eq!(a.whole_second(), b.whole_second());
    assert_eq!(b.whole_second(), 1_648_773_840);
    assert!(b < a);
}

#[test]
fn lenient_drops_trailing_digits_until_valid() {
    let (t, recovered) = Timestamp::parse_lenient("2022-04-02 16:24:56.239 UTC").unwrap();
    assert_eq!(t.millis(), 239);
    assert!(!recovered);

    let (t, recovered) = Timestamp::parse_lenient("2022-04-02 16:24:56.2x9 UTC").unwrap();
    assert_eq!(t.millis(), 200);
    assert!(recovered);

    let (t, recovered) = Timestamp::parse_lenient("2022-04-02 16:24:56.2391 UTC").unwrap();
    assert_eq!(t.millis(), 239);
    assert!(recovered);

    let (t, recovered) = Timestamp::parse_lenient("2022-04-02 16:24:56.x UTC").unwrap();
    assert_eq!(t.millis(), 0);
    assert!(recovered);

    let (t, recovered) = Timestamp::parse_lenient("2022-04-02 16:24:56 UTC").unwrap();
    assert_eq!(t.millis(), 0);
    assert!(!recovered);
}

#[test]
fn lenient_still_requires_whole_seconds() {
    assert!(Timestamp::parse_lenient("2022-04-02 16:2").is_err());
    assert!(Timestamp::parse_lenient("2022-13-02 16:24:56.1").is_err());
}

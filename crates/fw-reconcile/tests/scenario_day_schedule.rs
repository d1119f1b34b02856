//! Day enumeration: slot counts, timestamps and canonical filenames.

use chrono::{NaiveDate, TimeZone, Timelike, Utc};
use fw_reconcile::*;

fn jan1() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

#[test]
fn hourly_metar_produces_twenty_four_slots_with_canonical_names() {
    let feeds = vec![FeedSchedule::new(FeedType::Metar, 1).unwrap()];
    let slots = expected_for_day(jan1(), &feeds);

    assert_eq!(slots.len(), 24);
    for (hour, slot) in slots.iter().enumerate() {
        assert_eq!(slot.feed_type, FeedType::Metar);
        assert_eq!(
            slot.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, hour as u32, 0, 0).unwrap()
        );
    }
    let names: Vec<&str> = slots.iter().map(|s| s.filename.as_str()).collect();
    assert_eq!(names[0], "mmetar.csv");
    assert_eq!(names[1], "mmetar1.csv");
    assert_eq!(names[9], "mmetar9.csv");
    assert_eq!(names[23], "mmetar23.csv");
}

#[test]
fn default_configuration_yields_eighty_slots_per_day() {
    // metar 24 + synop 8 + buoy 24 + ship 24
    let slots = expected_for_day(jan1(), &default_feed_schedules());
    assert_eq!(slots.len(), 80);

    let synop: Vec<_> = slots
        .iter()
        .filter(|s| s.feed_type == FeedType::Synop)
        .collect();
    assert_eq!(synop.len(), 8);
    assert!(synop.iter().all(|s| s.timestamp.hour() % 3 == 0));
    assert_eq!(synop[1].filename, "synop03.csv");
}

#[test]
fn enumeration_is_deterministic() {
    let a = expected_for_day(jan1(), &default_feed_schedules());
    let b = expected_for_day(jan1(), &default_feed_schedules());
    assert_eq!(a, b);
}

#[test]
fn every_slot_is_unique_per_feed_and_timestamp() {
    let slots = expected_for_day(jan1(), &default_feed_schedules());
    let mut keys: Vec<(String, i64)> = slots
        .iter()
        .map(|s| (s.feed_type.to_string(), s.timestamp.timestamp()))
        .collect();
    let before = keys.len();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), before);
}

//! Arrival state machine: every edge of expected/delayed/missing/received.
//!
//! Pure; the probe result is passed in directly.

use chrono::{DateTime, Duration, TimeZone, Utc};
use fw_reconcile::*;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap()
}

fn record(status: DeliveryStatus, minutes_ago: i64) -> ExpectedDelivery {
    ExpectedDelivery {
        id: 7,
        feed_type: FeedType::Buoy,
        timestamp: now() - Duration::minutes(minutes_ago),
        status,
        filename: Some("buoy05.csv".to_string()),
        previous_timestamp: None,
    }
}

fn eval(rec: &ExpectedDelivery, found: bool) -> Option<Transition> {
    let mut idx = LastReceivedIndex::new();
    evaluate(rec, found, now(), &DelayPolicy::default(), &mut idx)
}

#[test]
fn expected_with_absent_file_fifteen_minutes_late_is_missing() {
    let t = eval(&record(DeliveryStatus::Expected, 15), false).expect("transition");
    assert_eq!(t.from, DeliveryStatus::Expected);
    assert_eq!(t.to(), DeliveryStatus::Missing);
}

#[test]
fn expected_with_absent_file_five_minutes_late_is_delayed() {
    let t = eval(&record(DeliveryStatus::Expected, 5), false).expect("transition");
    assert_eq!(t.to(), DeliveryStatus::Delayed);
}

#[test]
fn threshold_boundary_is_missing() {
    let t = eval(&record(DeliveryStatus::Expected, 10), false).expect("transition");
    assert_eq!(t.to(), DeliveryStatus::Missing);

    let just_inside = ExpectedDelivery {
        timestamp: now() - Duration::minutes(10) + Duration::seconds(1),
        ..record(DeliveryStatus::Expected, 0)
    };
    let t = eval(&just_inside, false).expect("transition");
    assert_eq!(t.to(), DeliveryStatus::Delayed);
}

#[test]
fn expected_found_is_received() {
    let t = eval(&record(DeliveryStatus::Expected, 1), true).expect("transition");
    assert_eq!(t.to(), DeliveryStatus::Received);
}

#[test]
fn delayed_found_is_received() {
    let t = eval(&record(DeliveryStatus::Delayed, 8), true).expect("transition");
    assert_eq!(t.from, DeliveryStatus::Delayed);
    assert_eq!(t.to(), DeliveryStatus::Received);
}

#[test]
fn delayed_still_absent_inside_threshold_is_a_no_op() {
    assert!(eval(&record(DeliveryStatus::Delayed, 4), false).is_none());
}

#[test]
fn delayed_absent_past_threshold_is_missing() {
    let t = eval(&record(DeliveryStatus::Delayed, 11), false).expect("transition");
    assert_eq!(t.to(), DeliveryStatus::Missing);
}

#[test]
fn terminal_states_never_transition() {
    for status in [DeliveryStatus::Missing, DeliveryStatus::Received] {
        assert!(eval(&record(status, 30), true).is_none());
        assert!(eval(&record(status, 30), false).is_none());
    }
}

#[test]
fn terminal_record_does_not_touch_index() {
    let mut idx = LastReceivedIndex::new();
    let rec = record(DeliveryStatus::Received, 30);
    assert!(evaluate(&rec, true, now(), &DelayPolicy::default(), &mut idx).is_none());
    assert!(idx.is_empty());
}

#[test]
fn event_carries_canonical_filename_and_slot() {
    let rec = record(DeliveryStatus::Expected, 20);
    let t = eval(&rec, false).expect("transition");
    assert_eq!(t.delivery_id, 7);
    assert_eq!(t.event.feed_type, FeedType::Buoy);
    assert_eq!(t.event.timestamp, rec.timestamp);
    assert_eq!(t.event.filename.as_deref(), Some("buoy05.csv"));
}

#[test]
fn custom_threshold_is_honoured() {
    let policy = DelayPolicy::from_minutes(30);
    let mut idx = LastReceivedIndex::new();
    let t = evaluate(&record(DeliveryStatus::Expected, 20), false, now(), &policy, &mut idx)
        .expect("transition");
    assert_eq!(t.to(), DeliveryStatus::Delayed);
}

#[test]
fn event_wire_form_uses_snake_case_keys() {
    let event = ChangeEvent {
        feed_type: FeedType::Metar,
        timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap(),
        status: DeliveryStatus::Missing,
        filename: Some("mmetar2.csv".to_string()),
        previous_timestamp: Some(Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap()),
    };
    assert_eq!(
        serde_json::to_value(&event).unwrap(),
        serde_json::json!({
            "feed_type": "metar",
            "timestamp": "2024-01-01T02:00:00Z",
            "status": "missing",
            "filename": "mmetar2.csv",
            "previous_timestamp": "2024-01-01T01:00:00Z",
        })
    );
}

//! Candidate lists for every feed and hour: non-empty, ordered, stable.

use fw_reconcile::*;

#[test]
fn candidate_lists_match_naming_table_for_every_hour() {
    for hour in 0..24u32 {
        let metar = candidate_filenames(&FeedType::Metar, hour);
        if hour == 0 {
            assert_eq!(metar, vec!["mmetar.csv".to_string()]);
        } else {
            assert_eq!(
                metar,
                vec![format!("mmetar{hour}.csv"), format!("mmetar{hour:02}.csv")]
            );
        }

        assert_eq!(
            candidate_filenames(&FeedType::Synop, hour),
            vec![format!("synop{hour:02}.csv"), format!("synop{hour:03}.csv")]
        );

        for feed in [FeedType::Buoy, FeedType::Ship] {
            assert_eq!(
                candidate_filenames(&feed, hour),
                vec![format!("{}{:02}.csv", feed.as_str(), hour)]
            );
        }
    }
}

#[test]
fn canonical_name_is_always_the_first_candidate() {
    for feed in FeedType::known() {
        for hour in 0..24u32 {
            let cands = candidate_filenames(&feed, hour);
            assert!(!cands.is_empty());
            assert_eq!(cands[0], canonical_filename(&feed, hour));
        }
    }
}

#[test]
fn feed_names_normalise_and_round_trip_through_serde() {
    assert_eq!(FeedType::from_name(" METAR "), FeedType::Metar);
    assert_eq!(FeedType::from_name("Drifter"), FeedType::Other("drifter".to_string()));

    let json = serde_json::to_string(&FeedType::Synop).unwrap();
    assert_eq!(json, "\"synop\"");
    let back: FeedType = serde_json::from_str("\"drifter\"").unwrap();
    assert_eq!(back.as_str(), "drifter");
}

#[test]
fn status_strings_parse_and_reject_unknown() {
    for s in DeliveryStatus::all() {
        assert_eq!(DeliveryStatus::parse(s.as_str()).unwrap(), s);
    }
    let err = DeliveryStatus::parse("lost").unwrap_err();
    assert!(err.to_string().contains("lost"));
}

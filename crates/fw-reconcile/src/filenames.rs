//! Filename conventions per feed type.
//!
//! | Feed    | Hour 0                                 | Hour > 0                          |
//! |---------|----------------------------------------|-----------------------------------|
//! | metar   | `mmetar.csv`                           | `mmetar{h}.csv`, `mmetar{hh}.csv` |
//! | synop   | `synop{hh}.csv`, `synop{hhh}.csv`      | same                              |
//! | others  | `{feed}{hh}.csv`                       | same                              |
//!
//! The synop three-digit alternate is kept as observed on the remote source
//! even though no file has been seen under that name.

use crate::FeedType;

/// Name assigned to a slot at generation time and persisted with the record.
pub fn canonical_filename(feed: &FeedType, hour: u32) -> String {
    match feed {
        FeedType::Metar if hour == 0 => "mmetar.csv".to_string(),
        FeedType::Metar => format!("mmetar{hour}.csv"),
        other => format!("{}{:02}.csv", other.as_str(), hour),
    }
}

/// Acceptable remote filenames for a slot, in the order they must be tried.
///
/// Never empty. Metar hours 10..=23 render identically padded and unpadded;
/// both entries are kept so the list stays positionally stable across hours.
pub fn candidate_filenames(feed: &FeedType, hour: u32) -> Vec<String> {
    match feed {
        FeedType::Metar if hour == 0 => vec!["mmetar.csv".to_string()],
        FeedType::Metar => vec![format!("mmetar{hour}.csv"), format!("mmetar{hour:02}.csv")],
        FeedType::Synop => vec![
            format!("{}{:02}.csv", feed.as_str(), hour),
            format!("{}{:03}.csv", feed.as_str(), hour),
        ],
        other => vec![format!("{}{:02}.csv", other.as_str(), hour)],
    }
}

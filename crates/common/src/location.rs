//! Locations covered by the ABS consumer price index.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A location with its own "All groups CPI" series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Location {
    /// Weighted average of the eight capital cities
    #[default]
    Australia,
    /// Sydney
    Sydney,
    /// Melbourne
    Melbourne,
    /// Brisbane
    Brisbane,
    /// Adelaide
    Adelaide,
    /// Perth
    Perth,
    /// Hobart
    Hobart,
    /// Darwin
    Darwin,
    /// Canberra
    Canberra,
}

impl Location {
    /// Every location, Australia first.
    pub const ALL: [Location; 9] = [
        Location::Australia,
        Location::Sydney,
        Location::Melbourne,
        Location::Brisbane,
        Location::Adelaide,
        Location::Perth,
        Location::Hobart,
        Location::Darwin,
        Location::Canberra,
    ];

    /// Title-cased name as it appears in the ABS column headers.
    pub fn name(&self) -> &'static str {
        match self {
            Location::Australia => "Australia",
            Location::Sydney => "Sydney",
            Location::Melbourne => "Melbourne",
            Location::Brisbane => "Brisbane",
            Location::Adelaide => "Adelaide",
            Location::Perth => "Perth",
            Location::Hobart => "Hobart",
            Location::Darwin => "Darwin",
            Location::Canberra => "Canberra",
        }
    }

    /// Header of the index-number column for this location in sheet `Data1`.
    pub fn index_column(&self) -> String {
        format!("Index Numbers ;  All groups CPI ;  {} ;", self.name())
    }

    /// Header of the year-on-year percentage change column for this location.
    pub fn change_column(&self) -> String {
        format!(
            "Percentage Change from Corresponding Quarter of Previous Year ;  All groups CPI ;  {} ;",
            self.name()
        )
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Location::ALL
            .into_iter()
            .find(|location| location.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let options: Vec<&str> = Location::ALL.iter().map(|l| l.name()).collect();
                format!(
                    "Unknown location '{wanted}'. Options are {}",
                    options.join(", ")
                )
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("melbourne".parse::<Location>().unwrap(), Location::Melbourne);
        assert_eq!(" CANBERRA ".parse::<Location>().unwrap(), Location::Canberra);
        assert!("Geelong".parse::<Location>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for location in Location::ALL {
            assert_eq!(location.to_string().parse::<Location>().unwrap(), location);
        }
    }

    #[test]
    fn test_column_names() {
        assert_eq!(
            Location::Australia.index_column(),
            "Index Numbers ;  All groups CPI ;  Australia ;"
        );
        assert_eq!(
            Location::Perth.change_column(),
            "Percentage Change from Corresponding Quarter of Previous Year ;  All groups CPI ;  Perth ;"
        );
    }

    #[test]
    fn test_serializes_as_title_case_name() {
        assert_eq!(
            serde_json::to_string(&Location::Sydney).unwrap(),
            "\"Sydney\""
        );
        let parsed: Location = serde_json::from_str("\"Hobart\"").unwrap();
        assert_eq!(parsed, Location::Hobart);
    }

    #[test]
    fn test_default_is_australia() {
        assert_eq!(Location::default(), Location::Australia);
    }
}

//! Single-user session state and the reducer that advances it.
//!
//! Every user interaction becomes an [`Event`]; [`Session::reduce`] returns the
//! next state without performing any I/O. Side effects (HTTP calls, inference)
//! live in [`crate::app`].

use chrono::NaiveDate;

use crate::model::{CityCandidate, FeatureRecord, Location};

/// Where the last successful fetch was triggered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    Map,
    Manual,
    Refresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A one-shot message for the user, replaced by the next event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A point was picked on the map and reverse geocoded.
    CoordinatesPicked { latitude: f64, longitude: f64, label: String },
    /// A city search finished. An empty list means no match.
    SearchCompleted { query: String, results: Vec<CityCandidate> },
    /// A city search could not reach the service. Earlier results stay.
    SearchFailed(String),
    /// One of the search results was chosen.
    CityChosen { candidate: CityCandidate, country_name: String },
    DateSelected(NaiveDate),
    FetchSucceeded { record: FeatureRecord, source: FetchSource },
    FetchFailed(String),
    /// Refresh was requested before any location was chosen.
    RefreshWithoutLocation,
    /// The user edited the form by hand.
    FormSubmitted(FeatureRecord),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub location: Option<Location>,
    /// Raw coordinates of the last processed map pick, used to ignore repeats.
    pub last_pick: Option<(f64, f64)>,
    pub search_query: Option<String>,
    pub search_results: Vec<CityCandidate>,
    pub target_date: NaiveDate,
    pub form: FeatureRecord,
    pub notice: Option<Notice>,
}

impl Session {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            location: None,
            last_pick: None,
            search_query: None,
            search_results: Vec::new(),
            target_date: today,
            form: FeatureRecord::default(),
            notice: None,
        }
    }

    /// True if these raw coordinates differ from the last processed pick.
    pub fn is_new_pick(&self, latitude: f64, longitude: f64) -> bool {
        self.last_pick != Some((latitude, longitude))
    }

    pub fn reduce(mut self, event: Event) -> Self {
        self.notice = None;

        match event {
            Event::CoordinatesPicked { latitude, longitude, label } => {
                if !self.is_new_pick(latitude, longitude) {
                    return self;
                }
                self.last_pick = Some((latitude, longitude));
                self.location = Some(Location::from_raw(latitude, longitude, label));
            }
            Event::SearchCompleted { query, results } => {
                if results.is_empty() {
                    self.notice = Some(Notice::new(NoticeLevel::Info, "No matching results."));
                }
                self.search_query = Some(query);
                self.search_results = results;
            }
            Event::SearchFailed(message) => {
                self.notice =
                    Some(Notice::new(NoticeLevel::Error, format!("City search failed: {message}")));
            }
            Event::CityChosen { candidate, country_name } => {
                let label = format!("{}, {}", candidate.name, country_name);
                self.location = Some(Location::from_raw(
                    candidate.latitude,
                    candidate.longitude,
                    label,
                ));
            }
            Event::DateSelected(date) => {
                self.target_date = date;
            }
            Event::FetchSucceeded { record, source } => {
                self.form = record;
                let message = match source {
                    FetchSource::Map => "Updated from the map".to_string(),
                    FetchSource::Manual => "Updated from manual entry".to_string(),
                    FetchSource::Refresh => {
                        format!("Updated for {}", self.target_date.format("%Y-%m-%d"))
                    }
                };
                self.notice = Some(Notice::new(NoticeLevel::Success, message));
            }
            Event::FetchFailed(message) => {
                self.notice = Some(Notice::new(NoticeLevel::Error, format!("Error: {message}")));
            }
            Event::RefreshWithoutLocation => {
                self.notice =
                    Some(Notice::new(NoticeLevel::Warning, "No location has been selected yet!"));
            }
            Event::FormSubmitted(record) => {
                self.form = record;
            }
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CloudCover, Season};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn hanoi() -> CityCandidate {
        CityCandidate {
            name: "Hanoi".into(),
            admin1: Some("Hanoi".into()),
            latitude: 21.0245,
            longitude: 105.84117,
            country_code: "VN".into(),
            country: Some("Vietnam".into()),
        }
    }

    #[test]
    fn new_session_has_defaults() {
        let s = Session::new(today());
        assert!(s.location.is_none());
        assert_eq!(s.form, FeatureRecord::default());
        assert_eq!(s.target_date, today());
    }

    #[test]
    fn pick_normalizes_coordinates() {
        let s = Session::new(today()).reduce(Event::CoordinatesPicked {
            latitude: 95.0,
            longitude: 190.0,
            label: "Somewhere".into(),
        });
        let loc = s.location.unwrap();
        assert_eq!((loc.latitude, loc.longitude), (90.0, -170.0));
        assert_eq!(s.last_pick, Some((95.0, 190.0)));
    }

    #[test]
    fn repeated_pick_is_ignored() {
        let s = Session::new(today()).reduce(Event::CoordinatesPicked {
            latitude: 16.0,
            longitude: 108.0,
            label: "Da Nang, Vietnam".into(),
        });
        assert!(!s.is_new_pick(16.0, 108.0));

        let again = s.clone().reduce(Event::CoordinatesPicked {
            latitude: 16.0,
            longitude: 108.0,
            label: "Other".into(),
        });
        assert_eq!(again.location.unwrap().label, "Da Nang, Vietnam");
    }

    #[test]
    fn choosing_city_labels_with_country() {
        let s = Session::new(today()).reduce(Event::CityChosen {
            candidate: hanoi(),
            country_name: "Viet Nam".into(),
        });
        assert_eq!(s.location.unwrap().label, "Hanoi, Viet Nam");
    }

    #[test]
    fn empty_search_is_info_not_error() {
        let s = Session::new(today())
            .reduce(Event::SearchCompleted { query: "Atlantis".into(), results: vec![] });
        assert_eq!(s.notice.unwrap().level, NoticeLevel::Info);
        assert!(s.search_results.is_empty());
    }

    #[test]
    fn search_results_replace_previous() {
        let s = Session::new(today())
            .reduce(Event::SearchCompleted { query: "Hanoi".into(), results: vec![hanoi()] });
        assert_eq!(s.search_results.len(), 1);
        assert!(s.notice.is_none());
    }

    #[test]
    fn failed_search_keeps_results_and_reports() {
        let s = Session::new(today())
            .reduce(Event::SearchCompleted { query: "Hanoi".into(), results: vec![hanoi()] })
            .reduce(Event::SearchFailed("offline".into()));
        assert_eq!(s.search_results, vec![hanoi()]);
        assert_eq!(s.search_query.as_deref(), Some("Hanoi"));
        let notice = s.notice.unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "City search failed: offline");
    }

    #[test]
    fn successful_fetch_replaces_whole_form() {
        let record = FeatureRecord {
            temperature: -3.0,
            cloud_cover: CloudCover::Overcast,
            season: Season::Winter,
            ..FeatureRecord::default()
        };
        let s = Session::new(today())
            .reduce(Event::FetchSucceeded { record: record.clone(), source: FetchSource::Map });
        assert_eq!(s.form, record);
        assert_eq!(s.notice.unwrap().level, NoticeLevel::Success);
    }

    #[test]
    fn failed_fetch_keeps_prior_form() {
        let edited = FeatureRecord { humidity: 90, ..FeatureRecord::default() };
        let s = Session::new(today())
            .reduce(Event::FormSubmitted(edited.clone()))
            .reduce(Event::FetchFailed("Not enough data for this date.".into()));
        assert_eq!(s.form, edited);
        let notice = s.notice.unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.message.contains("Not enough data"));
    }

    #[test]
    fn refresh_message_names_the_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
        let refreshed = Event::FetchSucceeded {
            record: FeatureRecord::default(),
            source: FetchSource::Refresh,
        };
        let s = Session::new(today()).reduce(Event::DateSelected(date)).reduce(refreshed);
        assert_eq!(s.notice.unwrap().message, "Updated for 2026-10-20");
    }

    #[test]
    fn refresh_without_location_warns() {
        let s = Session::new(today()).reduce(Event::RefreshWithoutLocation);
        assert_eq!(s.notice.unwrap().level, NoticeLevel::Warning);
    }
}

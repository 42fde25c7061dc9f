//! The prompt loop: one user action per iteration, each run to completion
//! before the screen is redrawn.

use chrono::{Days, Local, NaiveDate};
use inquire::{
    CustomType, DateSelect, InquireError, Select, Text,
    validator::{ErrorMessage, Validation},
};
use skycast_core::{
    App, CityCandidate, CloudCover, Config, FeatureRecord, LocationType, Season, Session,
    config::parse_country_code,
    model::{
        PERCENT_RANGE, PRESSURE_RANGE, TEMPERATURE_RANGE, UV_INDEX_MAX, VISIBILITY_RANGE,
        WIND_SPEED_RANGE,
    },
};
use std::fmt;

use crate::view;

/// How far ahead the date picker allows.
pub const MAX_DAYS_AHEAD: u64 = 14;

/// Initial map position (Da Nang).
const DEFAULT_PICK: (f64, f64) = (16.047, 108.206);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    PickPoint,
    SearchCity,
    ChooseDate,
    Refresh,
    EditForm,
    Predict,
    Quit,
}

impl Action {
    const ALL: [Action; 7] = [
        Action::PickPoint,
        Action::SearchCity,
        Action::ChooseDate,
        Action::Refresh,
        Action::EditForm,
        Action::Predict,
        Action::Quit,
    ];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::PickPoint => "Pick a point on the map (coordinates)",
            Action::SearchCity => "Search for a city",
            Action::ChooseDate => "Choose the date",
            Action::Refresh => "Fetch data for this date",
            Action::EditForm => "Edit parameters",
            Action::Predict => "Run prediction",
            Action::Quit => "Quit",
        })
    }
}

/// Latest selectable date for a given day.
pub fn max_date(today: NaiveDate) -> NaiveDate {
    today.checked_add_days(Days::new(MAX_DAYS_AHEAD)).unwrap_or(today)
}

pub async fn run(app: &App, config: &Config) -> anyhow::Result<()> {
    let mut session = Session::new(Local::now().date_naive());

    loop {
        println!("\n{}", view::session(&session));

        let action = match Select::new("What next?", Action::ALL.to_vec()).prompt() {
            Ok(a) => a,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e.into()),
        };

        let step = match action {
            Action::PickPoint => pick_point(app, session).await,
            Action::SearchCity => search_city(app, session, config).await,
            Action::ChooseDate => choose_date(session),
            Action::Refresh => Ok(app.refresh(session).await),
            Action::EditForm => edit_form(session),
            Action::Predict => {
                predict(app, &session);
                Ok(session)
            }
            Action::Quit => break,
        };

        session = match step {
            Ok(next) => next,
            Err(InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e.into()),
        };
    }

    Ok(())
}

/// Map a cancelled prompt to `None` so the caller can go back to the menu.
fn optional<T>(result: Result<T, InquireError>) -> Result<Option<T>, InquireError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(InquireError::OperationCanceled) => Ok(None),
        Err(e) => Err(e),
    }
}

fn in_range(
    min: f64,
    max: f64,
) -> impl Fn(&f64) -> Result<Validation, inquire::CustomUserError> + Clone {
    move |v: &f64| {
        if (min..=max).contains(v) {
            Ok(Validation::Valid)
        } else {
            Ok(Validation::Invalid(ErrorMessage::Custom(format!(
                "Value must be between {min} and {max}"
            ))))
        }
    }
}

async fn pick_point(app: &App, session: Session) -> Result<Session, InquireError> {
    let (lat0, lon0) = session
        .location
        .as_ref()
        .map_or(DEFAULT_PICK, |l| (l.latitude, l.longitude));

    let lat = optional(CustomType::<f64>::new("Latitude:").with_default(lat0).prompt())?;
    let Some(lat) = lat else {
        return Ok(session);
    };
    let lon = optional(CustomType::<f64>::new("Longitude:").with_default(lon0).prompt())?;
    let Some(lon) = lon else {
        return Ok(session);
    };

    Ok(app.pick_coordinates(session, lat, lon).await)
}

fn country_code(input: &str) -> Result<Validation, inquire::CustomUserError> {
    Ok(match parse_country_code(input) {
        Ok(_) => Validation::Valid,
        Err(e) => Validation::Invalid(e.to_string().into()),
    })
}

async fn search_city(
    app: &App,
    session: Session,
    config: &Config,
) -> Result<Session, InquireError> {
    let Some(country) = optional(
        Text::new("Country code (ISO, e.g. VN):")
            .with_default(&config.default_country)
            .with_validator(country_code)
            .prompt(),
    )?
    else {
        return Ok(session);
    };

    let Some(city) = optional(Text::new("City:").with_placeholder("e.g. Ha Noi").prompt())? else {
        return Ok(session);
    };

    // A successful search with matches is the only outcome without a notice.
    let session = app.search_city(session, &city, &country).await;
    if session.search_results.is_empty() || session.notice.is_some() {
        return Ok(session);
    }
    println!("{}", view::search_results(&session.search_results));

    let Some(choice) =
        optional(Select::new("Results:", session.search_results.clone()).prompt())?
    else {
        return Ok(session);
    };

    let country_name = country_label(&choice, &country);
    Ok(app.choose_city(session, choice, country_name).await)
}

fn country_label(candidate: &CityCandidate, code: &str) -> String {
    candidate.country.clone().unwrap_or_else(|| code.trim().to_uppercase())
}

fn choose_date(session: Session) -> Result<Session, InquireError> {
    let today = Local::now().date_naive();
    let picked = optional(
        DateSelect::new("Date:")
            .with_default(session.target_date)
            .with_max_date(max_date(today))
            .prompt(),
    )?;

    Ok(match picked {
        Some(date) => App::select_date(session, date),
        None => session,
    })
}

fn edit_form(session: Session) -> Result<Session, InquireError> {
    let Some(record) = optional(prompt_record(&session.form))? else {
        return Ok(session);
    };
    Ok(App::submit_form(session, record))
}

fn select_index<T: PartialEq>(all: &[T], current: &T) -> usize {
    all.iter().position(|v| v == current).unwrap_or(0)
}

fn prompt_record(current: &FeatureRecord) -> Result<FeatureRecord, InquireError> {
    let season = Select::new("Season:", Season::all().to_vec())
        .with_starting_cursor(select_index(Season::all(), &current.season))
        .prompt()?;
    let location = Select::new("Location:", LocationType::all().to_vec())
        .with_starting_cursor(select_index(LocationType::all(), &current.location))
        .prompt()?;
    let temperature = CustomType::<f64>::new("Temperature (°C):")
        .with_default(current.temperature)
        .with_validator(in_range(TEMPERATURE_RANGE.0, TEMPERATURE_RANGE.1))
        .prompt()?;
    let humidity = CustomType::<u8>::new("Humidity (%):")
        .with_default(current.humidity)
        .with_validator(|v: &u8| {
            Ok(if *v <= 100 {
                Validation::Valid
            } else {
                Validation::Invalid("Value must be between 0 and 100".into())
            })
        })
        .prompt()?;
    let pressure = CustomType::<f64>::new("Atmospheric Pressure (hPa):")
        .with_default(current.pressure)
        .with_validator(in_range(PRESSURE_RANGE.0, PRESSURE_RANGE.1))
        .prompt()?;
    let wind_speed = CustomType::<f64>::new("Wind Speed (km/h):")
        .with_default(current.wind_speed)
        .with_validator(in_range(WIND_SPEED_RANGE.0, WIND_SPEED_RANGE.1))
        .prompt()?;
    let precipitation = CustomType::<f64>::new("Precipitation (%):")
        .with_default(current.precipitation)
        .with_validator(in_range(PERCENT_RANGE.0, PERCENT_RANGE.1))
        .prompt()?;
    let cloud_cover = Select::new("Cloud Cover:", CloudCover::all().to_vec())
        .with_starting_cursor(select_index(CloudCover::all(), &current.cloud_cover))
        .prompt()?;
    let uv_index = CustomType::<u8>::new("UV Index:")
        .with_default(current.uv_index)
        .with_validator(|v: &u8| {
            Ok(if *v <= UV_INDEX_MAX {
                Validation::Valid
            } else {
                Validation::Invalid(format!("Value must be between 0 and {UV_INDEX_MAX}").into())
            })
        })
        .prompt()?;
    let visibility_km = CustomType::<f64>::new("Visibility (km):")
        .with_default(current.visibility_km)
        .with_validator(in_range(VISIBILITY_RANGE.0, VISIBILITY_RANGE.1))
        .prompt()?;

    Ok(FeatureRecord {
        temperature,
        humidity,
        wind_speed,
        precipitation,
        pressure,
        cloud_cover,
        season,
        visibility_km,
        location,
        uv_index,
    })
}

fn predict(app: &App, session: &Session) {
    match app.predict(&session.form) {
        Ok(result) => println!("\n{}", view::prediction(&result)),
        Err(e) => println!("\n[error] {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_date_is_two_weeks_out() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(max_date(today), NaiveDate::from_ymd_opt(2026, 10, 30).unwrap());
    }

    #[test]
    fn select_index_finds_current_or_defaults() {
        assert_eq!(select_index(Season::all(), &Season::Autumn), 2);
        assert_eq!(select_index(CloudCover::all(), &CloudCover::Overcast), 3);
        assert_eq!(select_index::<Season>(&[], &Season::Winter), 0);
    }

    #[test]
    fn range_validator_accepts_bounds() {
        let v = in_range(850.0, 1110.0);
        assert!(matches!(v(&850.0), Ok(Validation::Valid)));
        assert!(matches!(v(&1110.0), Ok(Validation::Valid)));
        assert!(matches!(v(&849.9), Ok(Validation::Invalid(_))));
    }

    #[test]
    fn country_prompt_accepts_only_iso_codes() {
        assert!(matches!(country_code("vn"), Ok(Validation::Valid)));
        assert!(matches!(country_code("Vietnam"), Ok(Validation::Invalid(_))));
        assert!(matches!(country_code(""), Ok(Validation::Invalid(_))));
    }

    #[test]
    fn country_label_falls_back_to_code() {
        let c = CityCandidate {
            name: "Hue".into(),
            admin1: None,
            latitude: 16.46,
            longitude: 107.59,
            country_code: "VN".into(),
            country: None,
        };
        assert_eq!(country_label(&c, " vn"), "VN");
    }

    #[test]
    fn menu_lists_every_action_once() {
        let names: Vec<String> = Action::ALL.iter().map(|a| a.to_string()).collect();
        let mut dedup = names.clone();
        dedup.dedup();
        assert_eq!(names.len(), dedup.len());
        assert_eq!(Action::ALL.last(), Some(&Action::Quit));
    }
}

//! Location input resolution: selected city record, manual coordinates, or
//! server-side geocoding.

use crate::RequestError;

/// City picked from the reference dataset. Coordinates were resolved when the
/// record was selected and are not re-entered by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct CityRecord {
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// How the user specified the poster location.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    /// City-selection mode: coordinates come from the resolved record.
    City(CityRecord),
    /// Manual mode: raw coordinate fields, parsed on resolve. Both must be
    /// present and parse as floating-point numbers.
    Coordinates {
        city: String,
        country: String,
        latitude: String,
        longitude: String,
    },
    /// No coordinates at all; the backend geocodes from city and country.
    Geocode { city: String, country: String },
}

/// A location ready to go on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub city: String,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl LocationInput {
    pub fn resolve(&self) -> Result<ResolvedLocation, RequestError> {
        match self {
            LocationInput::City(record) => Ok(ResolvedLocation {
                city: record.city.clone(),
                country: record.country.clone(),
                latitude: Some(record.latitude),
                longitude: Some(record.longitude),
            }),
            LocationInput::Coordinates {
                city,
                country,
                latitude,
                longitude,
            } => {
                let lat = parse_coordinate("latitude", latitude)?;
                let lon = parse_coordinate("longitude", longitude)?;
                Ok(ResolvedLocation {
                    city: city.clone(),
                    country: country.clone(),
                    latitude: Some(lat),
                    longitude: Some(lon),
                })
            }
            LocationInput::Geocode { city, country } => {
                if city.trim().is_empty() {
                    return Err(RequestError::MissingLocation);
                }
                Ok(ResolvedLocation {
                    city: city.clone(),
                    country: country.clone(),
                    latitude: None,
                    longitude: None,
                })
            }
        }
    }
}

fn parse_coordinate(field: &'static str, value: &str) -> Result<f64, RequestError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| RequestError::InvalidCoordinate {
            field,
            value: value.to_string(),
        })
}

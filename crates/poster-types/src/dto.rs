//! Request and response DTOs for the poster generation backend API.

use serde::{Deserialize, Serialize};

/// Maximum rendering distance the backend accepts (meters).
pub const MAX_DISTANCE: u32 = 25_000;

/// Distance above which generation gets slow and memory-hungry (meters).
pub const WARNING_THRESHOLD: u32 = 20_000;

/// Street network selector for map generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Drive,
    Walk,
    Bike,
    All,
}

impl NetworkType {
    pub fn as_str(self) -> &'static str {
        match self {
            NetworkType::Drive => "drive",
            NetworkType::Walk => "walk",
            NetworkType::Bike => "bike",
            NetworkType::All => "all",
        }
    }
}

impl std::str::FromStr for NetworkType {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drive" => Ok(NetworkType::Drive),
            "walk" => Ok(NetworkType::Walk),
            "bike" => Ok(NetworkType::Bike),
            "all" => Ok(NetworkType::All),
            other => Err(RequestError::InvalidNetworkType(other.to_string())),
        }
    }
}

impl std::fmt::Display for NetworkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output file format for the rendered poster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Svg,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "png" => Ok(OutputFormat::Png),
            "svg" => Ok(OutputFormat::Svg),
            other => Err(RequestError::InvalidFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Poster generation request (POST /generate).
///
/// Coordinates are optional on the wire: when absent the backend geocodes
/// from city and country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub city: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    pub theme: String,
    pub distance: u32,
    pub network_type: NetworkType,
    pub format: OutputFormat,
    pub thumbnail: bool,
    pub hide_attribution: bool,
    pub poster_size: String,
}

impl GenerateRequest {
    /// Check the invariants the backend enforces, before spending a round trip.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.latitude.is_some() != self.longitude.is_some() {
            return Err(RequestError::IncompleteCoordinates);
        }
        if self.latitude.is_none() && self.city.trim().is_empty() {
            return Err(RequestError::MissingLocation);
        }
        if let Some(lat) = self.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(RequestError::CoordinateOutOfRange {
                    field: "latitude",
                    value: lat,
                });
            }
        }
        if let Some(lon) = self.longitude {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(RequestError::CoordinateOutOfRange {
                    field: "longitude",
                    value: lon,
                });
            }
        }
        if self.distance == 0 || self.distance > MAX_DISTANCE {
            return Err(RequestError::DistanceOutOfRange {
                distance: self.distance,
            });
        }
        Ok(())
    }
}

/// Validation errors raised before a request leaves the client.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    #[error("no location: provide a city or a coordinate pair")]
    MissingLocation,
    #[error("latitude and longitude must both be given")]
    IncompleteCoordinates,
    #[error("{field} is not a number: {value:?}")]
    InvalidCoordinate { field: &'static str, value: String },
    #[error("{field} {value} is out of range")]
    CoordinateOutOfRange { field: &'static str, value: f64 },
    #[error("distance {distance}m is outside 1..=25000m; recommended: 4000-6000m for dense cities, 8000-15000m for medium cities, 15000-25000m for large metros")]
    DistanceOutOfRange { distance: u32 },
    #[error("unknown network type: {0}")]
    InvalidNetworkType(String),
    #[error("unknown output format: {0}")]
    InvalidFormat(String),
}

/// Status of a generation task as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    /// Anything outside the documented set. Never applied to a job as-is.
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    /// Terminal statuses never transition again for the same task.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// Response to a submission (POST /generate).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub message: Option<String>,
}

/// One status snapshot for a task (GET /task/{task_id}).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub result: Option<PosterResult>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Finished-poster payload attached to a completed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosterResult {
    pub poster_url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    pub city: String,
    pub country: String,
    pub theme: String,
    pub coords: [f64; 2],
    pub created_at: String,
    #[serde(default)]
    pub poster_size: Option<String>,
    #[serde(default)]
    pub size_label: Option<String>,
}

impl PosterResult {
    /// Path under the temporary poster store, as `publish-to-gallery` expects it.
    pub fn publish_path(&self) -> &str {
        self.poster_url
            .strip_prefix("/temp_posters/")
            .unwrap_or_else(|| self.poster_url.trim_start_matches('/'))
    }
}

/// One renderable theme (GET /themes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub colors: ThemeColors,
}

/// Theme swatch; the backend may send an empty object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThemeColors {
    #[serde(default)]
    pub bg: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub accent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemesResponse {
    pub themes: Vec<Theme>,
}

/// One poster size preset (GET /poster-sizes). Width and height in inches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosterSize {
    pub value: String,
    pub label: String,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosterSizesResponse {
    pub sizes: Vec<PosterSize>,
    #[serde(rename = "default")]
    pub default_size: String,
}

/// One city entry in the gallery listing (GET /gallery).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityGalleryItem {
    pub city: String,
    pub country: String,
    pub slug: String,
    pub preview_image: String,
    pub theme_count: u32,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryResponse {
    pub cities: Vec<CityGalleryItem>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

/// One poster in a city detail listing (GET /city/{slug}).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosterItem {
    pub theme: String,
    pub theme_display_name: String,
    pub poster_url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    pub file_size: u64,
    pub format: String,
    pub created_at: String,
    #[serde(default)]
    pub poster_size: Option<String>,
    #[serde(default)]
    pub size_label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityDetail {
    pub city: String,
    pub slug: String,
    pub posters: Vec<PosterItem>,
}

/// Admin request to move a temporary poster into the public gallery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    pub password: String,
    /// Path relative to the temporary poster store, e.g.
    /// `beijing/noir_20260121_103000.png`.
    pub poster_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub gallery_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPasswordRequest {
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPasswordResponse {
    pub valid: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

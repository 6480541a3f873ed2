use serde::{Deserialize, Serialize};

pub const DEFAULT_RADIUS_METERS: f64 = 200.0;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    pub site_id: String,
    #[serde(default)]
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub radius_meters: Option<f64>,
}

impl SiteConfig {
    /// Allowed radius; unset or non-positive values fall back to 200 m.
    pub fn allowed_radius(&self) -> f64 {
        self.radius_meters
            .filter(|r| *r > 0.0)
            .unwrap_or(DEFAULT_RADIUS_METERS)
    }
}

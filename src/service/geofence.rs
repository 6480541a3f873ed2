use std::sync::Arc;
use std::time::Duration;

use crate::error::ClockError;
use crate::model::attendance::Coordinate;
use crate::model::employee::{Employee, EmployeeRole};
use crate::service::bounded;
use crate::store::SiteRegistry;
use crate::utils::geo::distance_meters;

pub const DEFAULT_MAX_ACCURACY_METERS: f64 = 200.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Denial {
    WeakSignal { accuracy: f64, max: f64 },
    SiteConfigMissing,
    OutOfRange { distance: f64, radius: f64 },
}

impl From<Denial> for ClockError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::WeakSignal { accuracy, max } => ClockError::WeakSignal { accuracy, max },
            Denial::SiteConfigMissing => ClockError::SiteConfigMissing,
            Denial::OutOfRange { distance, radius } => ClockError::OutOfRange { distance, radius },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeofenceDecision {
    Allowed,
    Denied(Denial),
}

/// Decides whether a position report is good enough for an attendance action.
/// Used identically for clock-in and clock-out.
#[derive(Clone)]
pub struct GeofenceValidator {
    sites: Arc<dyn SiteRegistry>,
    max_accuracy: f64,
    store_timeout: Duration,
}

impl GeofenceValidator {
    pub fn new(sites: Arc<dyn SiteRegistry>, max_accuracy: f64, store_timeout: Duration) -> Self {
        Self {
            sites,
            max_accuracy,
            store_timeout,
        }
    }

    /// Signal quality is checked first and applies to every role; only
    /// fixed-site staff are then held to their site's radius.
    pub async fn validate(
        &self,
        employee: &Employee,
        coordinate: Coordinate,
        accuracy: Option<f64>,
    ) -> Result<GeofenceDecision, ClockError> {
        if let Some(accuracy) = accuracy {
            if accuracy.is_nan() || accuracy > self.max_accuracy {
                return Ok(GeofenceDecision::Denied(Denial::WeakSignal {
                    accuracy,
                    max: self.max_accuracy,
                }));
            }
        }

        let site_id = match &employee.role {
            EmployeeRole::Roaming | EmployeeRole::Supervisor(_) => {
                return Ok(GeofenceDecision::Allowed);
            }
            EmployeeRole::FixedSite(site_id) => site_id,
        };

        let Some(site) = bounded(self.store_timeout, self.sites.find_site(site_id)).await? else {
            return Ok(GeofenceDecision::Denied(Denial::SiteConfigMissing));
        };

        let distance = distance_meters(
            coordinate.latitude,
            coordinate.longitude,
            site.latitude,
            site.longitude,
        );
        let radius = site.allowed_radius();

        // NaN compares false, so a broken coordinate never passes
        if distance <= radius {
            Ok(GeofenceDecision::Allowed)
        } else {
            Ok(GeofenceDecision::Denied(Denial::OutOfRange { distance, radius }))
        }
    }

    /// Like [`validate`](Self::validate) but folds a denial into the error.
    pub async fn require(
        &self,
        employee: &Employee,
        coordinate: Coordinate,
        accuracy: Option<f64>,
    ) -> Result<(), ClockError> {
        match self.validate(employee, coordinate, accuracy).await? {
            GeofenceDecision::Allowed => Ok(()),
            GeofenceDecision::Denied(denial) => Err(denial.into()),
        }
    }
}

//! Route capture state machine and route snapshot.
//!
//! The user captures two points (start, end). Once both are present a
//! route lookup can be performed, and the resulting [`RouteSnapshot`] is
//! what a generation request is built from. Capturing a third point
//! discards the previous pair and starts over with just the new point.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// A WGS84 position serialized as `[lng, lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat(pub f64, pub f64);

impl LngLat {
    /// Construct a position, rejecting out-of-range coordinates.
    pub fn new(lng: f64, lat: f64) -> Result<Self, CoreError> {
        if !(-180.0..=180.0).contains(&lng) || !(-90.0..=90.0).contains(&lat) {
            return Err(CoreError::Validation(format!(
                "Coordinate out of range: lng={lng}, lat={lat}"
            )));
        }
        Ok(Self(lng, lat))
    }

    pub fn lng(&self) -> f64 {
        self.0
    }

    pub fn lat(&self) -> f64 {
        self.1
    }
}

impl fmt::Display for LngLat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.0, self.1)
    }
}

/// Parses `"lng,lat"`.
impl FromStr for LngLat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lng, lat) = s
            .split_once(',')
            .ok_or_else(|| CoreError::Validation(format!("Expected 'lng,lat', got '{s}'")))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .map_err(|_| CoreError::Validation(format!("Invalid coordinate '{v}'")))
        };
        Self::new(parse(lng)?, parse(lat)?)
    }
}

// ---------------------------------------------------------------------------
// Route snapshot
// ---------------------------------------------------------------------------

/// An ordered route as returned by the route lookup endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSnapshot {
    /// Road link identifiers along the route, in travel order.
    pub link_ids: Vec<String>,
    /// Route geometry as a GeoJSON object.
    pub geojson: serde_json::Value,
}

impl RouteSnapshot {
    /// A route is usable when it has at least one link and a GeoJSON
    /// object with a string `type` member.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.link_ids.is_empty() {
            return Err(CoreError::Validation(
                "Route has no link identifiers".to_string(),
            ));
        }
        let has_type = self
            .geojson
            .as_object()
            .and_then(|obj| obj.get("type"))
            .is_some_and(serde_json::Value::is_string);
        if !has_type {
            return Err(CoreError::Validation(
                "Route geometry is not a GeoJSON object".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Capture state machine
// ---------------------------------------------------------------------------

/// Where the user is in picking the route endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureState {
    /// Zero or one point captured.
    Collecting(Option<LngLat>),
    /// Start and end captured; a route lookup may be performed.
    Ready(LngLat, LngLat),
}

/// Two-point route capture with reset-on-third-point semantics.
#[derive(Debug, Clone)]
pub struct RouteCapture {
    state: CaptureState,
    route: Option<RouteSnapshot>,
}

impl Default for RouteCapture {
    fn default() -> Self {
        Self {
            state: CaptureState::Collecting(None),
            route: None,
        }
    }
}

impl RouteCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Capture a point.
    ///
    /// A capture while [`CaptureState::Ready`] discards the previous pair
    /// (and any looked-up route) and leaves exactly the new point.
    pub fn capture(&mut self, point: LngLat) -> CaptureState {
        self.state = match self.state {
            CaptureState::Collecting(None) => CaptureState::Collecting(Some(point)),
            CaptureState::Collecting(Some(start)) => CaptureState::Ready(start, point),
            CaptureState::Ready(..) => {
                self.route = None;
                CaptureState::Collecting(Some(point))
            }
        };
        self.state
    }

    /// Captured points in order, for display and route lookup.
    pub fn points(&self) -> Vec<LngLat> {
        match self.state {
            CaptureState::Collecting(None) => Vec::new(),
            CaptureState::Collecting(Some(p)) => vec![p],
            CaptureState::Ready(a, b) => vec![a, b],
        }
    }

    /// Endpoints to send to the route lookup, available only when ready.
    pub fn endpoints(&self) -> Option<[LngLat; 2]> {
        match self.state {
            CaptureState::Ready(a, b) => Some([a, b]),
            CaptureState::Collecting(_) => None,
        }
    }

    /// Attach the result of a successful route lookup.
    pub fn attach_route(&mut self, route: RouteSnapshot) -> Result<(), CoreError> {
        if self.endpoints().is_none() {
            return Err(CoreError::Conflict(
                "Two points must be captured before a route can be attached".to_string(),
            ));
        }
        route.validate()?;
        self.route = Some(route);
        Ok(())
    }

    /// The looked-up route, present only after a successful lookup.
    pub fn route(&self) -> Option<&RouteSnapshot> {
        self.route.as_ref()
    }

    /// The "route ready" signal gating generation requests.
    pub fn is_route_ready(&self) -> bool {
        self.route.is_some()
    }

    /// Drop all captured points and any route.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

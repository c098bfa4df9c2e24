//! Coordinate Reference System identification
//!
//! scarmap never reprojects: a CRS is carried only so that inputs can be
//! checked for agreement and written back out with their outputs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// EPSG code if known
    epsg: Option<u32>,
    /// WKT representation
    wkt: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            epsg: Some(code),
            wkt: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            epsg: None,
            wkt: Some(wkt.into()),
        }
    }

    /// Parse an authority identifier.
    ///
    /// Accepts `EPSG:32633`, `epsg:32633` and the OGC URN form
    /// `urn:ogc:def:crs:EPSG::32633` used by GeoJSON named CRS members.
    pub fn from_identifier(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        let code = trimmed
            .rsplit_once(':')
            .filter(|(authority, _)| authority.to_ascii_uppercase().contains("EPSG"))
            .and_then(|(_, code)| code.parse::<u32>().ok())?;
        Some(Self::from_epsg(code))
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Check if two CRS are equivalent.
    ///
    /// EPSG codes win when both sides have one; otherwise WKT text must match.
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        match (self.epsg, other.epsg) {
            (Some(a), Some(b)) => a == b,
            _ => matches!((&self.wkt, &other.wkt), (Some(a), Some(b)) if a == b),
        }
    }

    /// OGC URN for GeoJSON `crs` members, when an EPSG code is known
    pub fn urn(&self) -> Option<String> {
        self.epsg.map(|code| format!("urn:ogc:def:crs:EPSG::{}", code))
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", &wkt[..wkt.len().min(50)]);
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

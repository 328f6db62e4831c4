use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::FacturxError;

/// Factur-X conformance level (profile).
///
/// Serializes as [`as_str`](Self::as_str); deserializes through [`FromStr`],
/// so only requestable levels are accepted as input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ConformanceLevel {
    /// Minimal machine-readable data.
    Minimum,
    /// Basic without line items. Detected on read, never requested.
    BasicWl,
    /// Line items with the EN 16931 core subset.
    Basic,
    /// Full EN 16931 (called EN16931 in current Factur-X releases).
    Comfort,
    /// Beyond EN 16931.
    Extended,
}

impl ConformanceLevel {
    /// Levels a caller may request.
    pub const REQUESTABLE: [Self; 4] = [Self::Minimum, Self::Basic, Self::Comfort, Self::Extended];

    /// The URN written to `GuidelineSpecifiedDocumentContextParameter/ID`.
    pub fn guideline_id(&self) -> &'static str {
        match self {
            Self::Minimum => "urn:factur-x.eu:1p0:minimum",
            Self::BasicWl => "urn:factur-x.eu:1p0:basicwl",
            Self::Basic => "urn:cen.eu:en16931:2017#compliant#urn:factur-x.eu:1p0:basic",
            Self::Comfort => "urn:cen.eu:en16931:2017",
            Self::Extended => "urn:cen.eu:en16931:2017#conformant#urn:factur-x.eu:1p0:extended",
        }
    }

    /// Parse a guideline URN back into a level.
    pub fn from_guideline_id(id: &str) -> Option<Self> {
        let id = id.trim();
        [
            Self::Minimum,
            Self::BasicWl,
            Self::Basic,
            Self::Comfort,
            Self::Extended,
        ]
        .into_iter()
        .find(|l| l.guideline_id() == id)
    }

    /// The XMP `fx:ConformanceLevel` value.
    pub fn xmp_name(&self) -> &'static str {
        match self {
            Self::Minimum => "MINIMUM",
            Self::BasicWl => "BASIC WL",
            Self::Basic => "BASIC",
            Self::Comfort => "EN 16931",
            Self::Extended => "EXTENDED",
        }
    }

    /// The AFRelationship value for the PDF file specification.
    pub fn af_relationship(&self) -> &'static str {
        match self {
            Self::Minimum | Self::BasicWl => "Data",
            _ => "Alternative",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimum => "minimum",
            Self::BasicWl => "basicwl",
            Self::Basic => "basic",
            Self::Comfort => "comfort",
            Self::Extended => "extended",
        }
    }
}

impl Default for ConformanceLevel {
    fn default() -> Self {
        Self::Basic
    }
}

impl fmt::Display for ConformanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only the requestable levels parse; anything else is an error, never a default.
impl FromStr for ConformanceLevel {
    type Err = FacturxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimum" => Ok(Self::Minimum),
            "basic" => Ok(Self::Basic),
            "comfort" => Ok(Self::Comfort),
            "extended" => Ok(Self::Extended),
            other => Err(FacturxError::Validation(format!(
                "unsupported Factur-X level '{other}' (expected minimum, basic, comfort or extended)"
            ))),
        }
    }
}

impl TryFrom<String> for ConformanceLevel {
    type Error = FacturxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ConformanceLevel> for String {
    fn from(level: ConformanceLevel) -> Self {
        level.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requestable_levels_parse() {
        assert_eq!("basic".parse::<ConformanceLevel>().unwrap(), ConformanceLevel::Basic);
        assert_eq!("Comfort".parse::<ConformanceLevel>().unwrap(), ConformanceLevel::Comfort);
        assert!("basicwl".parse::<ConformanceLevel>().is_err());
        assert!("premium".parse::<ConformanceLevel>().is_err());
        assert!("".parse::<ConformanceLevel>().is_err());
    }

    #[test]
    fn serde_accepts_what_from_str_accepts() {
        let level: ConformanceLevel = serde_json::from_str("\"extended\"").unwrap();
        assert_eq!(level, ConformanceLevel::Extended);
        assert_eq!(serde_json::to_string(&ConformanceLevel::Comfort).unwrap(), "\"comfort\"");
        for rejected in ["\"basicwl\"", "\"premium\"", "\"\""] {
            assert!(serde_json::from_str::<ConformanceLevel>(rejected).is_err(), "{rejected}");
        }
        assert_eq!(serde_json::to_string(&ConformanceLevel::BasicWl).unwrap(), "\"basicwl\"");
    }

    #[test]
    fn guideline_round_trip() {
        for level in [
            ConformanceLevel::Minimum,
            ConformanceLevel::BasicWl,
            ConformanceLevel::Basic,
            ConformanceLevel::Comfort,
            ConformanceLevel::Extended,
        ] {
            assert_eq!(ConformanceLevel::from_guideline_id(level.guideline_id()), Some(level));
        }
        assert_eq!(ConformanceLevel::from_guideline_id("urn:unknown"), None);
    }

    #[test]
    fn basic_guideline_literal() {
        assert_eq!(
            ConformanceLevel::Basic.guideline_id(),
            "urn:cen.eu:en16931:2017#compliant#urn:factur-x.eu:1p0:basic"
        );
    }
}

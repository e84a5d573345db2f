use crate::error::IconError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AspectRatio {
    Square,
    Standard,
    #[default]
    Widescreen,
    /// Requested as a square image and displayed with a circular crop.
    Circle,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 4] = [
        AspectRatio::Square,
        AspectRatio::Standard,
        AspectRatio::Widescreen,
        AspectRatio::Circle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Standard => "4:3",
            AspectRatio::Widescreen => "16:9",
            AspectRatio::Circle => "circle",
        }
    }

    /// The ratio sent to the image model.
    pub fn request_ratio(&self) -> &'static str {
        match self {
            AspectRatio::Circle => "1:1",
            other => other.as_str(),
        }
    }

    pub fn is_circular(&self) -> bool {
        matches!(self, AspectRatio::Circle)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = IconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1:1" | "square" => Ok(AspectRatio::Square),
            "4:3" => Ok(AspectRatio::Standard),
            "16:9" => Ok(AspectRatio::Widescreen),
            "circle" | "circular" => Ok(AspectRatio::Circle),
            other => {
                let expected: Vec<&str> = AspectRatio::ALL.iter().map(|r| r.as_str()).collect();
                Err(IconError::InvalidInput(format!(
                    "unsupported aspect ratio '{}', expected one of {}",
                    other,
                    expected.join(", ")
                )))
            }
        }
    }
}

impl Serialize for AspectRatio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AspectRatio {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_and_aliases() {
        assert_eq!("1:1".parse::<AspectRatio>().unwrap(), AspectRatio::Square);
        assert_eq!(" 16:9 ".parse::<AspectRatio>().unwrap(), AspectRatio::Widescreen);
        assert_eq!("Square".parse::<AspectRatio>().unwrap(), AspectRatio::Square);
        assert_eq!("circular".parse::<AspectRatio>().unwrap(), AspectRatio::Circle);
    }

    #[test]
    fn test_rejects_unknown_ratio() {
        let err = "9:16".parse::<AspectRatio>().unwrap_err();
        assert!(matches!(err, IconError::InvalidInput(_)));
        assert!("".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_circle_requests_square() {
        assert_eq!(AspectRatio::Circle.request_ratio(), "1:1");
        assert_eq!(AspectRatio::Standard.request_ratio(), "4:3");
        assert!(AspectRatio::Circle.is_circular());
    }

    #[test]
    fn test_serde_uses_canonical_token() {
        let json = serde_json::to_string(&AspectRatio::Widescreen).unwrap();
        assert_eq!(json, "\"16:9\"");
        assert!(serde_json::from_str::<AspectRatio>("\"21:9\"").is_err());
    }
}

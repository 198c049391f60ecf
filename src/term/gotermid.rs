use core::fmt::Debug;
use std::fmt::Display;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{GoError, GoResult, MAX_GO_ID_INTEGER};

/// The unique identifier of a GO term
///
/// GO identifiers are always the `GO:` prefix followed by seven digits,
/// so only the numerical part is stored.
///
/// # Examples
///
/// ```
/// use gbsc_enrich::GoTermId;
///
/// let id = GoTermId::try_from("GO:0016301").unwrap();
/// assert_eq!(id.as_u32(), 16301);
/// assert_eq!(id.to_string(), "GO:0016301");
///
/// assert!(GoTermId::try_from("HP:0000118").is_err());
/// ```
#[derive(Copy, Clone, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct GoTermId {
    inner: u32,
}

impl GoTermId {
    /// Returns the integer representation of the ID
    pub fn as_u32(&self) -> u32 {
        self.inner
    }
}

impl TryFrom<&str> for GoTermId {
    type Error = GoError;
    fn try_from(s: &str) -> GoResult<Self> {
        let digits = s
            .trim()
            .strip_prefix("GO:")
            .ok_or_else(|| GoError::InvalidInput(format!("not a GO term ID: {s}")))?;
        let inner = digits.parse::<u32>()?;
        if inner > MAX_GO_ID_INTEGER {
            return Err(GoError::InvalidInput(format!("GO term ID out of range: {s}")));
        }
        Ok(GoTermId { inner })
    }
}

impl From<u32> for GoTermId {
    fn from(inner: u32) -> Self {
        Self { inner }
    }
}

impl Debug for GoTermId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GoTermId({self})")
    }
}

impl Display for GoTermId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GO:{:07}", self.inner)
    }
}

impl Serialize for GoTermId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GoTermId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        GoTermId::try_from(s.as_str()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_and_display() {
        let id = GoTermId::try_from("GO:0000001").unwrap();
        assert_eq!(id, GoTermId::from(1u32));
        assert_eq!(id.to_string(), "GO:0000001");
        assert_eq!(format!("{id:?}"), "GoTermId(GO:0000001)");
    }

    #[test]
    fn short_ids_are_padded() {
        let id = GoTermId::try_from("GO:0001").unwrap();
        assert_eq!(id.to_string(), "GO:0000001");
    }

    #[test]
    fn invalid_ids() {
        assert!(GoTermId::try_from("0016301").is_err());
        assert!(GoTermId::try_from("GO:abc").is_err());
        assert!(GoTermId::try_from("GO:12345678").is_err());
        assert!(GoTermId::try_from("").is_err());
    }

    #[test]
    fn serde_as_string() {
        let id = GoTermId::from(5488u32);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"GO:0005488\"");
        let back: GoTermId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}

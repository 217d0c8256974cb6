use std::{fmt, sync::Arc};

use serde::{Serialize, Serializer};

/// Dense index of a municipality within its layer, in dataset order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MunicipalityId(pub u32);

impl MunicipalityId {
    #[inline] pub fn index(self) -> usize { self.0 as usize }
}

impl fmt::Display for MunicipalityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MunicipalityId({})", self.0)
    }
}

/// Whether a municipality is urban ("mestna").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UrbanFlag {
    Urban,
    NonUrban,
}

impl UrbanFlag {
    /// Classify a type code against the urban code of the dataset.
    #[inline]
    pub fn classify(type_code: &str, urban_code: &str) -> Self {
        if type_code == urban_code { UrbanFlag::Urban } else { UrbanFlag::NonUrban }
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            UrbanFlag::Urban => "DA",
            UrbanFlag::NonUrban => "NE",
        }
    }
}

impl fmt::Display for UrbanFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for UrbanFlag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Attributes of a single municipality ("obcina"). Immutable after load.
#[derive(Debug, Clone, PartialEq)]
pub struct Municipality {
    pub id: MunicipalityId,
    pub name: Arc<str>,
    pub area_km2: f64,
    pub type_code: Arc<str>,
    pub urban: UrbanFlag,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urban_flag_is_total() {
        assert_eq!(UrbanFlag::classify("D", "D"), UrbanFlag::Urban);
        for code in ["", "d", "N", "DD", " D"] {
            assert_eq!(UrbanFlag::classify(code, "D"), UrbanFlag::NonUrban, "code {code:?}");
        }
    }

    #[test]
    fn urban_flag_display() {
        assert_eq!(UrbanFlag::Urban.to_string(), "DA");
        assert_eq!(UrbanFlag::NonUrban.to_string(), "NE");
        assert_eq!(UrbanFlag::classify("M", "M").as_str(), "DA");
    }

    #[test]
    fn id_display_and_ordering() {
        assert_eq!(MunicipalityId(7).to_string(), "MunicipalityId(7)");
        assert!(MunicipalityId(0) < MunicipalityId(1));
        assert_eq!(MunicipalityId(5).index(), 5);
    }
}

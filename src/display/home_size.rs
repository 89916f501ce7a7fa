use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BookingError;

/// Home size tiers a client can pick for a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HomeSize {
    PocketPalace,
    FamilyHub,
    GrandEstate,
    EpicEstates,
}

impl HomeSize {
    pub const ALL: [HomeSize; 4] = [
        HomeSize::PocketPalace,
        HomeSize::FamilyHub,
        HomeSize::GrandEstate,
        HomeSize::EpicEstates,
    ];

    /// Key stored in the `home_size` column
    pub fn key(self) -> &'static str {
        match self {
            HomeSize::PocketPalace => "pocket_palace",
            HomeSize::FamilyHub => "family_hub",
            HomeSize::GrandEstate => "grand_estate",
            HomeSize::EpicEstates => "epic_estates",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            HomeSize::PocketPalace => "Pocket Palace",
            HomeSize::FamilyHub => "Family Hub",
            HomeSize::GrandEstate => "Grand Estate",
            HomeSize::EpicEstates => "Epic Estates",
        }
    }

    pub fn full_description(self) -> &'static str {
        match self {
            HomeSize::PocketPalace => "Pocket Palace (1-2 bedrooms, up to 120m²)",
            HomeSize::FamilyHub => "Family Hub (3 bedrooms, 120-200m²)",
            HomeSize::GrandEstate => "Grand Estate (4-5 bedrooms, 200-350m²)",
            HomeSize::EpicEstates => "Epic Estates (6+ bedrooms, over 350m²)",
        }
    }
}

impl Default for HomeSize {
    fn default() -> Self {
        HomeSize::FamilyHub
    }
}

impl fmt::Display for HomeSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for HomeSize {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HomeSize::ALL
            .into_iter()
            .find(|size| size.key() == s)
            .ok_or_else(|| {
                BookingError::Validation(format!(
                    "home size '{}' must be one of: {}",
                    s,
                    HomeSize::ALL.map(HomeSize::key).join(", ")
                ))
            })
    }
}

/// Human-readable name for a stored home size key; unknown or missing keys read as Family Hub.
pub fn get_home_size_display_name(home_size: Option<&str>) -> &'static str {
    resolve(home_size).display_name()
}

/// Long description for a stored home size key, defaulting like [`get_home_size_display_name`].
pub fn get_home_size_full_description(home_size: Option<&str>) -> &'static str {
    resolve(home_size).full_description()
}

pub fn is_valid_home_size(home_size: &str) -> bool {
    home_size.parse::<HomeSize>().is_ok()
}

fn resolve(home_size: Option<&str>) -> HomeSize {
    home_size.and_then(|s| s.parse().ok()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_maps_to_its_name_and_description() {
        let expected = [
            ("pocket_palace", "Pocket Palace", "Pocket Palace (1-2 bedrooms, up to 120m²)"),
            ("family_hub", "Family Hub", "Family Hub (3 bedrooms, 120-200m²)"),
            ("grand_estate", "Grand Estate", "Grand Estate (4-5 bedrooms, 200-350m²)"),
            ("epic_estates", "Epic Estates", "Epic Estates (6+ bedrooms, over 350m²)"),
        ];
        for (key, name, description) in expected {
            assert_eq!(get_home_size_display_name(Some(key)), name);
            assert_eq!(get_home_size_full_description(Some(key)), description);
        }
    }

    #[test]
    fn missing_or_unknown_defaults_to_family_hub() {
        for input in [None, Some(""), Some("mansion"), Some("Family Hub")] {
            assert_eq!(get_home_size_display_name(input), "Family Hub");
            assert_eq!(
                get_home_size_full_description(input),
                "Family Hub (3 bedrooms, 120-200m²)"
            );
        }
    }

    #[test]
    fn validation_accepts_only_stored_keys() {
        assert!(is_valid_home_size("grand_estate"));
        assert!(!is_valid_home_size("GRAND_ESTATE"));
        assert!(!is_valid_home_size(" grand_estate"));

        let err = "castle".parse::<HomeSize>().unwrap_err();
        assert!(err.to_string().contains("pocket_palace, family_hub, grand_estate, epic_estates"));
    }

    #[test]
    fn serde_uses_the_stored_keys() {
        let json = serde_json::to_string(&HomeSize::EpicEstates).unwrap();
        assert_eq!(json, "\"epic_estates\"");
        let parsed: HomeSize = serde_json::from_str("\"pocket_palace\"").unwrap();
        assert_eq!(parsed, HomeSize::PocketPalace);
    }
}

//! Core types for the persona system.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────
// Stakeholder Id
// ─────────────────────────────────────────────────────────────────

/// The five synthetic stakeholder roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StakeholderId {
    /// Sustainability lead at a municipality.
    Municipality,
    /// Category manager at an online retailer.
    ERetailer,
    /// Senior buyer at a brick-and-mortar retail chain.
    RetailBuyer,
    /// Innovation director at a competing brand.
    Competitor,
    /// Technical director at a waste processing plant.
    WasteExpert,
}

impl StakeholderId {
    /// Slug used in CLI args and config file names.
    pub fn slug(&self) -> &'static str {
        match self {
            StakeholderId::Municipality => "municipality",
            StakeholderId::ERetailer => "e-retailer",
            StakeholderId::RetailBuyer => "retail-buyer",
            StakeholderId::Competitor => "competitor",
            StakeholderId::WasteExpert => "waste-expert",
        }
    }

    /// All stakeholder ids in registration (display) order.
    pub fn all() -> &'static [StakeholderId] {
        &[
            StakeholderId::Municipality,
            StakeholderId::ERetailer,
            StakeholderId::RetailBuyer,
            StakeholderId::Competitor,
            StakeholderId::WasteExpert,
        ]
    }
}

impl fmt::Display for StakeholderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for StakeholderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "municipality" => Ok(StakeholderId::Municipality),
            "e-retailer" | "eretailer" | "e_retailer" => Ok(StakeholderId::ERetailer),
            "retail-buyer" | "retailbuyer" | "retail_buyer" => Ok(StakeholderId::RetailBuyer),
            "competitor" => Ok(StakeholderId::Competitor),
            "waste-expert" | "wasteexpert" | "waste_expert" => Ok(StakeholderId::WasteExpert),
            _ => Err(format!(
                "Unknown stakeholder '{}'. Valid: municipality, e-retailer, retail-buyer, competitor, waste-expert",
                s
            )),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Persona Config (loaded from TOML)
// ─────────────────────────────────────────────────────────────────

/// Persona configuration as stored in the bundled TOML files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Human-readable name shown in the selector and transcript.
    pub display_name: String,

    /// Role-defining instruction injected as the system prompt.
    pub system_instruction: String,
}

// ─────────────────────────────────────────────────────────────────
// Persona
// ─────────────────────────────────────────────────────────────────

/// A fully loaded persona. Immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct Persona {
    pub id: StakeholderId,
    pub display_name: String,
    pub system_instruction: String,
}

impl Persona {
    pub fn from_config(id: StakeholderId, config: PersonaConfig) -> Self {
        Self {
            id,
            display_name: config.display_name,
            system_instruction: config.system_instruction,
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name)
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stakeholder_slug() {
        assert_eq!(StakeholderId::Municipality.slug(), "municipality");
        assert_eq!(StakeholderId::ERetailer.slug(), "e-retailer");
        assert_eq!(StakeholderId::RetailBuyer.slug(), "retail-buyer");
        assert_eq!(StakeholderId::Competitor.slug(), "competitor");
        assert_eq!(StakeholderId::WasteExpert.slug(), "waste-expert");
    }

    #[test]
    fn test_stakeholder_from_str() {
        assert_eq!(
            "municipality".parse::<StakeholderId>().unwrap(),
            StakeholderId::Municipality
        );
        assert_eq!(
            "e-retailer".parse::<StakeholderId>().unwrap(),
            StakeholderId::ERetailer
        );
        assert_eq!(
            "WASTE-EXPERT".parse::<StakeholderId>().unwrap(),
            StakeholderId::WasteExpert
        );
        assert!("unknown".parse::<StakeholderId>().is_err());
    }

    #[test]
    fn test_slug_round_trip() {
        for id in StakeholderId::all() {
            assert_eq!(id.slug().parse::<StakeholderId>().unwrap(), *id);
        }
    }

    #[test]
    fn test_all_count_and_order() {
        let all = StakeholderId::all();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0], StakeholderId::Municipality);
        assert_eq!(all[4], StakeholderId::WasteExpert);
    }

    #[test]
    fn test_serde_round_trip() {
        let json = serde_json::to_string(&StakeholderId::RetailBuyer).unwrap();
        assert_eq!(json, "\"retail-buyer\"");
        let parsed: StakeholderId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, StakeholderId::RetailBuyer);
    }
}

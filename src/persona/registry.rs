//! Bundled persona registry, loaded once at startup.

use std::str::FromStr;

use crate::error::{Error, Result};

use super::types::{Persona, PersonaConfig, StakeholderId};

/// Registry of the available stakeholder personas.
///
/// Loaded once from bundled TOML configs; iteration order equals
/// registration order, which drives the selector listing.
pub struct PersonaRegistry {
    personas: Vec<Persona>,
}

impl PersonaRegistry {
    /// Load all bundled personas. Fails loudly if a bundled config is
    /// malformed, which can only happen from a packaging mistake.
    pub fn load() -> Result<Self> {
        let mut personas = Vec::with_capacity(StakeholderId::all().len());

        for id in StakeholderId::all() {
            let raw = bundled_config(*id);
            let config: PersonaConfig =
                toml::from_str(raw).map_err(|e| Error::PersonaConfigInvalid {
                    id: id.slug().to_string(),
                    message: e.to_string(),
                })?;

            if config.system_instruction.trim().is_empty() {
                return Err(Error::PersonaConfigInvalid {
                    id: id.slug().to_string(),
                    message: "system_instruction is empty".to_string(),
                });
            }

            personas.push(Persona::from_config(*id, config));
        }

        Ok(Self { personas })
    }

    /// All personas in registration order.
    pub fn all(&self) -> &[Persona] {
        &self.personas
    }

    /// Look up a persona by id slug.
    pub fn get(&self, id: &str) -> Result<&Persona> {
        let parsed = StakeholderId::from_str(id).map_err(|_| Error::unknown_persona(id))?;
        self.get_by_id(parsed)
    }

    /// Look up a persona by typed id.
    pub fn get_by_id(&self, id: StakeholderId) -> Result<&Persona> {
        self.personas
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::unknown_persona(id.slug()))
    }
}

/// The bundled TOML config for a stakeholder.
fn bundled_config(id: StakeholderId) -> &'static str {
    match id {
        StakeholderId::Municipality => {
            include_str!("../../config/personas/municipality.toml")
        }
        StakeholderId::ERetailer => include_str!("../../config/personas/e-retailer.toml"),
        StakeholderId::RetailBuyer => {
            include_str!("../../config/personas/retail-buyer.toml")
        }
        StakeholderId::Competitor => include_str!("../../config/personas/competitor.toml"),
        StakeholderId::WasteExpert => {
            include_str!("../../config/personas/waste-expert.toml")
        }
    }
}

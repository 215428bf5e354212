//! Stakeholder persona system
//!
//! Personas are fixed role instructions that bias the generation model's
//! voice and perspective. The set is closed: five synthetic stakeholders,
//! loaded once at startup from bundled configs and never mutated.

mod registry;
mod types;

pub use registry::PersonaRegistry;
pub use types::{Persona, PersonaConfig, StakeholderId};

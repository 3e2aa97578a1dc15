//! Skill registry for stepwise.
//!
//! Skills are external programs that each implement one capability. The
//! orchestrator only needs two things from the registry: the descriptors it
//! hands to decomposition, and a way to resolve a skill name to something it
//! can spawn. Both go through the [`SkillRegistry`] trait; [`SkillsConfig`]
//! is the file-backed implementation read from `skills.yaml`.

mod config;
mod registry;


pub use config::{SkillDefaults, SkillProfile, SkillsConfig};
pub use registry::{NO_MATCH_SKILL, SkillDescriptor, SkillEntry, SkillRegistry};

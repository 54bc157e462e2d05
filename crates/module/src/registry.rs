//! Trait registry seam.
//!
//! Art assets live outside this module; the core only needs to know how many
//! roles and palettes are registered so it can reject inputs that would point
//! past the end of either list.

use dafo_types::{CustomInput, ROLE_COUNT};
use serde::{Deserialize, Serialize};

use crate::error::DafoError;

/// Sizes of the external trait registries.
pub trait TraitRegistry {
    fn role_count(&self) -> usize;
    fn palette_count(&self) -> usize;
}

/// Registry sizes fixed by configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitCounts {
    pub roles: usize,
    pub palettes: usize,
}

impl Default for TraitCounts {
    fn default() -> Self {
        Self {
            roles: ROLE_COUNT,
            palettes: 3,
        }
    }
}

impl TraitRegistry for TraitCounts {
    fn role_count(&self) -> usize {
        self.roles
    }

    fn palette_count(&self) -> usize {
        self.palettes
    }
}

/// Check that `input` only references registered traits.
pub fn validate_custom_input(
    registry: &impl TraitRegistry,
    input: &CustomInput,
) -> Result<(), DafoError> {
    let role_count = registry.role_count();
    if input.role.index() >= role_count {
        return Err(DafoError::IndexOutOfBounds {
            trait_name: "Role",
            index: input.role.index(),
            count: role_count,
        });
    }

    let palette_count = registry.palette_count();
    if input.palette as usize >= palette_count {
        return Err(DafoError::IndexOutOfBounds {
            trait_name: "Palette",
            index: input.palette as usize,
            count: palette_count,
        });
    }

    Ok(())
}

//! `urn:uuid:` identifiers for resources created by this tool.
//!
//! Every library and measure gets a freshly generated canonical URL of the form
//! `urn:uuid:<lowercase hyphenated v4 uuid>`. The measure refers to its library through this URL,
//! not through the id the server assigns, so the URL must be known before the library is posted.

use std::fmt;
use uuid::Uuid;

const URN_UUID_PREFIX: &str = "urn:uuid:";

/// A UUID used as a resource's canonical URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UrnUuid(Uuid);

impl Default for UrnUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl UrnUuid {
    /// Generates a new random (v4) identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The full canonical URL, `urn:uuid:<id>`.
    pub fn urn(&self) -> String {
        format!("{URN_UUID_PREFIX}{self}")
    }
}

impl From<Uuid> for UrnUuid {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for UrnUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Hyphenated formatting is always lowercase
        write!(f, "{}", self.0.hyphenated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urn_uses_lowercase_hyphenated_form() {
        let id = UrnUuid::from(Uuid::from_u128(0x550E8400_E29B_41D4_A716_446655440000));
        assert_eq!(id.to_string(), "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(id.urn(), "urn:uuid:550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn new_ids_are_unique() {
        assert_ne!(UrnUuid::new(), UrnUuid::new());
    }
}

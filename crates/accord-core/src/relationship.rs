//! Relationship registry boundary.
//!
//! Pairing mechanics (invite codes, acceptance) are out of scope; the
//! engine only needs to resolve a relationship ID to its two party
//! identifiers, one of which may still be missing while pairing is
//! incomplete.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The parties of a relationship.
///
/// `partner_b` is `None` while pairing is incomplete; no session can be
/// created for such a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipParties {
    pub partner_a: String,
    #[serde(default)]
    pub partner_b: Option<String>,
}

impl RelationshipParties {
    /// Returns true if both partners are present.
    pub fn is_complete(&self) -> bool {
        self.partner_b.is_some()
    }

    /// Returns the partner of `party_id`, if the pair is complete and
    /// `party_id` is one of the two partners.
    pub fn other(&self, party_id: &str) -> Option<&str> {
        let partner_b = self.partner_b.as_deref()?;
        if party_id == self.partner_a {
            Some(partner_b)
        } else if party_id == partner_b {
            Some(self.partner_a.as_str())
        } else {
            None
        }
    }
}

/// Resolves relationship IDs to their parties.
#[async_trait]
pub trait RelationshipRegistry: Send + Sync {
    /// Resolves a relationship to its party identifiers.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(parties))`: relationship found (possibly incomplete)
    /// - `Ok(None)`: no such relationship
    /// - `Err(_)`: storage failure
    async fn resolve(&self, relationship_id: &str) -> Result<Option<RelationshipParties>>;
}

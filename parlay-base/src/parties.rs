//! Parties participating in a secure computation.
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::constants::graph_size_limit_constants;
use crate::errors::Result;

/// ID of a party within its context, equal to the number of parties
/// registered in the context before it.
pub type PartyId = u64;

#[derive(Debug)]
struct PartyBody {
    id: PartyId,
    name: String,
}

/// A named participant of the secure computation.
///
/// Parties own secret inputs and receive revealed outputs. A party is
/// registered in a context via [crate::graphs::Context::create_party] and is
/// immutable afterwards.
///
/// [Clone] trait duplicates the pointer, not the underlying party.
///
/// [PartialEq] compares parties by name: two parties with the same name
/// designate the same participant.
pub struct Party {
    body: Arc<PartyBody>,
}

impl Clone for Party {
    fn clone(&self) -> Self {
        Party {
            body: self.body.clone(),
        }
    }
}

impl PartialEq for Party {
    fn eq(&self, other: &Self) -> bool {
        self.body.name == other.body.name
    }
}

impl Eq for Party {}

impl Hash for Party {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.body.name.hash(state);
    }
}

impl fmt::Debug for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Party")
            .field("id", &self.body.id)
            .field("name", &self.body.name)
            .finish()
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.body.name)
    }
}

impl Party {
    /// Returns the name of the party.
    pub fn get_name(&self) -> String {
        self.body.name.clone()
    }

    /// Returns the ID of the party within its context.
    pub fn get_id(&self) -> PartyId {
        self.body.id
    }
}

pub(crate) fn create_party_handle(id: PartyId, name: String) -> Party {
    Party {
        body: Arc::new(PartyBody { id, name }),
    }
}

/// Checks that a string is usable as a party name.
///
/// Party names are wire identifiers of the external runtime, so empty and
/// oversized names are rejected at construction time.
pub fn check_party_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(runtime_error!("Party name can't be empty"));
    }
    if name.len() > graph_size_limit_constants::MAX_NAME_LENGTH {
        return Err(runtime_error!(
            "Party name is longer than {} bytes",
            graph_size_limit_constants::MAX_NAME_LENGTH
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_party_equality_by_name() {
        let p1 = create_party_handle(0, "Bettor0".to_owned());
        let p2 = create_party_handle(5, "Bettor0".to_owned());
        let p3 = create_party_handle(1, "Bettor1".to_owned());
        assert_eq!(p1, p2);
        assert!(p1 != p3);
        let p4 = p1.clone();
        assert_eq!(p1, p4);
        assert_eq!(p4.get_id(), 0);
        assert_eq!(p4.get_name(), "Bettor0");
    }

    #[test]
    fn test_party_name_checks() {
        assert!(check_party_name("OutParty").is_ok());
        assert!(check_party_name("").is_err());
        let long_name = "x".repeat(1000);
        assert!(check_party_name(&long_name).is_err());
    }
}

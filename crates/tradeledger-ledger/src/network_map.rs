//! Directory of known parties and the notary.

use std::collections::HashMap;

use tradeledger_types::{LedgerError, Party, PartyKey, Result};

/// Who is on the network. Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct NetworkMap {
    notary: Party,
    by_name: HashMap<String, Party>,
}

impl NetworkMap {
    #[must_use]
    pub fn new(notary: Party) -> Self {
        Self {
            notary,
            by_name: HashMap::new(),
        }
    }

    /// Add or replace a party entry.
    pub fn add(&mut self, party: Party) {
        self.by_name.insert(party.name.clone(), party);
    }

    #[must_use]
    pub fn with_party(mut self, party: Party) -> Self {
        self.add(party);
        self
    }

    /// The notary every transaction must name.
    #[must_use]
    pub fn notary(&self) -> &Party {
        &self.notary
    }

    /// Look a party up by legal name.
    ///
    /// # Errors
    /// [`LedgerError::UnknownParty`] if nobody registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<Party> {
        self.by_name
            .get(name)
            .cloned()
            .ok_or_else(|| LedgerError::UnknownParty(name.to_string()))
    }

    #[must_use]
    pub fn by_key(&self, key: &PartyKey) -> Option<&Party> {
        self.by_name.values().find(|p| &p.key == key)
    }

    /// All non-notary parties, sorted by name.
    #[must_use]
    pub fn parties(&self) -> Vec<Party> {
        let mut parties: Vec<Party> = self.by_name.values().cloned().collect();
        parties.sort_by(|a, b| a.name.cmp(&b.name));
        parties
    }
}

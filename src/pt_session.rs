//! Owner book plus per-owner ledgers

use hashbrown::HashMap;

use crate::pt_interface::Owner;
use crate::pt_ledger::WinLedger;
use crate::pt_owners::OwnerBook;

/// Caller-owned tracking state.
///
/// Holds the owner book and one ledger per owner; owners never share ledger
/// entries, even for the same peer id.
#[derive(Debug, Default)]
pub struct Session {
    pub owners: OwnerBook,
    ledgers: HashMap<Owner, WinLedger>,
}

impl Session {
    pub fn new(owners: OwnerBook) -> Self {
        Self {
            owners,
            ledgers: HashMap::new(),
        }
    }

    pub fn ledger(&self, owner: &str) -> Option<&WinLedger> {
        self.ledgers.get(owner)
    }

    pub fn ledger_mut(&mut self, owner: &str) -> &mut WinLedger {
        self.ledgers.entry(owner.to_string()).or_default()
    }
}

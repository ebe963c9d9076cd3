//! Owner -> peer-set mapping
//!
//! An owner is a user-chosen label grouping the peer identifiers it tracks.
//! Sets suppress duplicates on insert; iteration follows first insertion.

use std::fs;
use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use log::debug;
use thiserror::Error;

use crate::pt_interface::{Owner, PeerId};

/// Roster column holding the owner label
pub const USERNAME_COLUMN: &str = "Username";

/// Roster columns that never hold peer ids
pub const NON_PEER_COLUMNS: [&str; 3] = [USERNAME_COLUMN, "Status", "Last Update"];

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("failed to read roster: {0}")]
    Io(#[from] std::io::Error),

    #[error("roster has no '{0}' column")]
    MissingColumn(&'static str),
}

#[derive(Clone, Debug, Default)]
pub struct OwnerBook {
    owners: IndexMap<Owner, IndexSet<PeerId>>,
}

impl OwnerBook {
    pub fn new() -> Self {
        Self {
            owners: IndexMap::new(),
        }
    }

    /// Register an owner with an empty set. Returns false if already known
    /// or the label is blank.
    pub fn add_owner(&mut self, owner: &str) -> bool {
        let owner = owner.trim();
        if owner.is_empty() || self.owners.contains_key(owner) {
            return false;
        }
        self.owners.insert(owner.to_string(), IndexSet::new());
        true
    }

    /// Add one peer id, creating the owner on demand. Returns false for a
    /// duplicate or blank id.
    pub fn add_peer(&mut self, owner: &str, peer_id: &str) -> bool {
        let owner = owner.trim();
        let peer_id = peer_id.trim();
        if owner.is_empty() || peer_id.is_empty() {
            return false;
        }
        self.owners
            .entry(owner.to_string())
            .or_default()
            .insert(peer_id.to_string())
    }

    /// Add whitespace separated peer ids, returns how many were new
    pub fn add_peers_text(&mut self, owner: &str, text: &str) -> usize {
        text.split_whitespace()
            .filter(|peer_id| self.add_peer(owner, peer_id))
            .count()
    }

    pub fn peers(&self, owner: &str) -> Option<&IndexSet<PeerId>> {
        self.owners.get(owner)
    }

    pub fn contains(&self, owner: &str) -> bool {
        self.owners.contains_key(owner)
    }

    pub fn owners(&self) -> impl Iterator<Item = &Owner> {
        self.owners.keys()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn load_roster(path: impl AsRef<Path>) -> Result<Self, RosterError> {
        let content = fs::read_to_string(path)?;
        Self::parse_roster(&content)
    }

    /// Parse a roster export: a header row naming `Username`, `Status`,
    /// `Last Update` and any number of peer columns, then one row per owner.
    pub fn parse_roster(content: &str) -> Result<Self, RosterError> {
        let mut lines = content.lines().filter(|l| !l.trim().is_empty());
        let header: Vec<String> = match lines.next() {
            Some(line) => split_row(line),
            None => return Err(RosterError::MissingColumn(USERNAME_COLUMN)),
        };

        let username_idx = header
            .iter()
            .position(|h| h == USERNAME_COLUMN)
            .ok_or(RosterError::MissingColumn(USERNAME_COLUMN))?;
        let peer_columns: Vec<usize> = header
            .iter()
            .enumerate()
            .filter(|(_, h)| !NON_PEER_COLUMNS.contains(&h.as_str()))
            .map(|(i, _)| i)
            .collect();

        let mut book = OwnerBook::new();
        for line in lines {
            let row = split_row(line);
            let owner = match row.get(username_idx) {
                Some(owner) if !owner.is_empty() => owner.clone(),
                _ => continue,
            };

            book.add_owner(&owner);
            for &i in &peer_columns {
                if let Some(peer_id) = row.get(i) {
                    book.add_peer(&owner, peer_id);
                }
            }
        }

        debug!("roster: {} owners", book.len());
        Ok(book)
    }
}

/// Split a CSV line; double-quoted cells may contain commas and `""` escapes
fn split_row(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => cells.push(std::mem::take(&mut cell).trim().to_string()),
            _ => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}

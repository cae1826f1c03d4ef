//! Transfer progress: percentage arithmetic and the map of in-flight transfers.

use std::collections::BTreeMap;

/// `round(100 * loaded / total)`, or `None` while the total is unknown.
pub fn upload_percent(loaded: u64, total: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let (loaded, total) = (loaded.min(total) as u128, total as u128);
    Some(((loaded * 200 + total) / (total * 2)) as u8)
}

/// `floor(100 * written / expected)`, with an expected size of zero or
/// unknown treated as 1 and the result clamped to 100.
pub fn download_percent(written: u64, expected: Option<u64>) -> u8 {
    let expected = expected.unwrap_or(0).max(1) as u128;
    (written as u128 * 100 / expected).min(100) as u8
}

/// Identifies one transfer among those that ever used a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransferTicket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
struct ProgressEntry {
    percent: u8,
    ticket: TransferTicket,
}

/// Percent-complete per transfer key.
///
/// An entry only answers to the ticket handed out by [`ProgressMap::start`],
/// so a late update or clear from an older transfer under the same key is
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressMap {
    entries: BTreeMap<String, ProgressEntry>,
    next_ticket: u64,
}

impl ProgressMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, key: &str) -> TransferTicket {
        self.next_ticket += 1;
        let ticket = TransferTicket(self.next_ticket);
        self.entries
            .insert(key.to_string(), ProgressEntry { percent: 0, ticket });
        ticket
    }

    /// Returns whether the stored value changed.
    pub fn update(&mut self, key: &str, ticket: TransferTicket, percent: u8) -> bool {
        let percent = percent.min(100);
        match self.entries.get_mut(key) {
            Some(entry) if entry.ticket == ticket && entry.percent != percent => {
                entry.percent = percent;
                true
            }
            _ => false,
        }
    }

    pub fn finish(&mut self, key: &str, ticket: TransferTicket) -> bool {
        match self.entries.get(key) {
            Some(entry) if entry.ticket == ticket => {
                self.entries.remove(key);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<u8> {
        self.entries.get(key).map(|entry| entry.percent)
    }

    pub fn snapshot(&self) -> BTreeMap<String, u8> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.percent))
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

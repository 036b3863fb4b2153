use std::collections::HashMap;

use log::warn;

use super::model::{IdentityKey, Record};

// ---------------------------------------------------------------------------
// CanonicalIndex – LS identity → dense position, defined by the primary source
// ---------------------------------------------------------------------------

/// Maps every (run:fill, LS range) key of the primary source to its position
/// in that source's file.
///
/// Only [`CanonicalIndex::build`] writes to the map; afterwards it is shared
/// immutably by every source that is aligned against it.
#[derive(Debug, Clone, Default)]
pub struct CanonicalIndex {
    positions: HashMap<IdentityKey, usize>,
    accepted: usize,
    overwritten: usize,
}

impl CanonicalIndex {
    /// Assign positions `0, 1, 2, …` to the records in order.
    ///
    /// A key seen twice keeps the later position. Each such collision is
    /// logged and counted in [`overwritten`](Self::overwritten).
    pub fn build<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut index = Self::default();
        for (position, record) in records.into_iter().enumerate() {
            let key = record.key();
            if let Some(previous) = index.positions.insert(key, position) {
                warn!(
                    "duplicate LS {} in primary source: position {previous} replaced by {position}",
                    record.key()
                );
                index.overwritten += 1;
            }
            index.accepted = position + 1;
        }
        index
    }

    pub fn position(&self, key: &IdentityKey) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.positions.contains_key(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of primary records the index was built from.
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Number of primary records whose key had already been seen.
    pub fn overwritten(&self) -> usize {
        self.overwritten
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csv::StringRecord;

    fn rec(run_fill: &str, ls: &str) -> Record {
        let fields = StringRecord::from(vec![run_fill, ls, "t", "s", "e", "1.0", "1.0", "x", "y"]);
        Record::from_fields(0, fields).unwrap()
    }

    #[test]
    fn positions_follow_file_order() {
        let records: Vec<Record> = (1..=5)
            .map(|ls| rec("318982:6868", &format!("{ls}:{ls}")))
            .collect();
        let index = CanonicalIndex::build(&records);

        assert_eq!(index.len(), 5);
        assert_eq!(index.accepted(), 5);
        assert_eq!(index.overwritten(), 0);
        for (expected, record) in records.iter().enumerate() {
            assert_eq!(index.position(&record.key()), Some(expected));
        }
    }

    #[test]
    fn duplicate_key_keeps_last_position_and_is_counted() {
        let records = vec![
            rec("1:1", "1:1"),
            rec("1:1", "2:2"),
            rec("1:1", "1:1"),
            rec("1:1", "3:3"),
        ];
        let index = CanonicalIndex::build(&records);

        assert_eq!(index.len(), 3);
        assert_eq!(index.accepted(), 4);
        assert_eq!(index.overwritten(), 1);
        assert_eq!(index.position(&IdentityKey::new("1:1", "1:1")), Some(2));
        assert_eq!(index.position(&IdentityKey::new("1:1", "3:3")), Some(3));
    }

    #[test]
    fn run_and_ls_both_take_part_in_the_key() {
        let records = vec![rec("300027:6016", "1:1"), rec("300043:6016", "1:1")];
        let index = CanonicalIndex::build(&records);
        assert_eq!(index.len(), 2);
        assert!(!index.contains(&IdentityKey::new("300050:6016", "1:1")));
    }
}

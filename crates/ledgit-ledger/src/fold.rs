use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use ledgit_types::{Address, Timestamp};

use crate::records::Record;

/// A parsed row with its position in the table and its attested author.
#[derive(Clone, Debug, PartialEq)]
pub struct Stamped<R> {
    pub seq: u64,
    pub author: Address,
    pub record: R,
}

impl<R: Record> Stamped<R> {
    /// Recency order: newest timestamp wins, the later append breaks ties.
    pub fn recency(&self) -> (Timestamp, u64) {
        (self.record.timestamp(), self.seq)
    }
}

/// Resolve the current version of every entity.
///
/// Keeps, for each [`Record::key`], the most recent row by
/// [`Stamped::recency`]. The result is ordered oldest to newest. Every
/// "current state" read in ledgit goes through here.
pub fn fold_latest<R: Record>(rows: impl IntoIterator<Item = Stamped<R>>) -> Vec<Stamped<R>> {
    let mut latest: BTreeMap<R::Key, Stamped<R>> = BTreeMap::new();
    for row in rows {
        match latest.entry(row.record.key()) {
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
            Entry::Occupied(mut slot) => {
                if row.recency() >= slot.get().recency() {
                    slot.insert(row);
                }
            }
        }
    }
    let mut out: Vec<Stamped<R>> = latest.into_values().collect();
    out.sort_by_key(|r| r.recency());
    out
}

/// The single most recent row.
pub fn latest<R: Record>(rows: impl IntoIterator<Item = Stamped<R>>) -> Option<Stamped<R>> {
    rows.into_iter().max_by_key(|r| r.recency())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RefRow;
    use ledgit_types::RecordId;
    use proptest::prelude::*;

    fn ref_row(seq: u64, name: &str, commit: RecordId, ts: u64) -> Stamped<RefRow> {
        Stamped {
            seq,
            author: Address::new_unchecked("a"),
            record: RefRow {
                schema_version: 2,
                repo_name: "demo".into(),
                ref_name: name.into(),
                commit_id: commit,
                timestamp: Timestamp::from_millis(ts),
            },
        }
    }

    #[test]
    fn newest_timestamp_wins() {
        let (c1, c2) = (RecordId::generate(), RecordId::generate());
        let rows = vec![
            ref_row(0, "feature", c1, 10),
            ref_row(1, "main", c1, 11),
            ref_row(2, "feature", c2, 20),
        ];
        let folded = fold_latest(rows);
        assert_eq!(folded.len(), 2);
        let feature = folded.iter().find(|r| r.record.ref_name == "feature").unwrap();
        assert_eq!(feature.record.commit_id, c2);
    }

    #[test]
    fn timestamp_beats_append_order() {
        let (c1, c2) = (RecordId::generate(), RecordId::generate());
        // the later append carries an older timestamp
        let rows = vec![ref_row(0, "main", c1, 50), ref_row(1, "main", c2, 40)];
        assert_eq!(fold_latest(rows)[0].record.commit_id, c1);
    }

    #[test]
    fn ties_go_to_later_append() {
        let (c1, c2) = (RecordId::generate(), RecordId::generate());
        let rows = vec![ref_row(0, "main", c1, 0), ref_row(1, "main", c2, 0)];
        assert_eq!(fold_latest(rows.clone())[0].record.commit_id, c2);
        assert_eq!(latest(rows).unwrap().record.commit_id, c2);
    }

    #[test]
    fn output_is_oldest_first() {
        let c = RecordId::generate();
        let rows = vec![ref_row(0, "b", c, 30), ref_row(1, "a", c, 10), ref_row(2, "c", c, 20)];
        let names: Vec<_> = fold_latest(rows)
            .into_iter()
            .map(|r| r.record.ref_name)
            .collect();
        assert_eq!(names, vec!["a", "c", "b"]);
    }

    proptest! {
        #[test]
        fn fold_picks_max_recency_per_key(stamps in proptest::collection::vec((0u8..4, 0u64..50), 1..40)) {
            let c = RecordId::generate();
            let rows: Vec<_> = stamps
                .iter()
                .enumerate()
                .map(|(seq, (key, ts))| ref_row(seq as u64, &format!("b{key}"), c, *ts))
                .collect();
            let folded = fold_latest(rows.clone());
            for winner in &folded {
                for row in rows.iter().filter(|r| r.record.ref_name == winner.record.ref_name) {
                    prop_assert!(row.recency() <= winner.recency());
                }
            }
        }
    }
}

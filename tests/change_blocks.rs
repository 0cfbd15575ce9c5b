//! Tests for change block compression and replay.

use proptest::prelude::*;

use glazier::{Block, Change, ChangeBlockSequence, ChangeType};

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn element_replay_of_mixed_blocks() {
    let mut seq = ChangeBlockSequence::new();
    assert!(seq.insert(0, 2));
    assert!(seq.insert(4, 6));
    assert!(seq.delete(8, 10));
    assert!(seq.delete(10, 12));

    let steps: Vec<Change> = seq.iter().collect();
    let expected: Vec<Change> = [
        (0, ChangeType::Insert),
        (1, ChangeType::Insert),
        (4, ChangeType::Insert),
        (5, ChangeType::Insert),
        (8, ChangeType::Delete),
        (8, ChangeType::Delete),
        (10, ChangeType::Delete),
        (10, ChangeType::Delete),
    ]
    .into_iter()
    .map(|(index, kind)| Change { index, kind })
    .collect();
    assert_eq!(steps, expected);
}

#[test]
fn refused_update_leaves_sequence_alone() {
    let mut seq = ChangeBlockSequence::new();
    assert!(seq.insert(2, 4));
    let before = seq.clone();
    assert!(!seq.update(3, 4));
    assert_eq!(seq, before);

    let mut only_insert = ChangeBlockSequence::new();
    assert!(only_insert.insert(2, 4));
    assert_eq!(seq, only_insert);
}

#[test]
fn block_replay() {
    let mut seq = ChangeBlockSequence::new();
    assert!(seq.update(1, 3));
    assert!(seq.update(3, 4));
    assert!(seq.insert(6, 7));
    assert!(seq.delete(9, 12));

    let mut iter = seq.iter();
    let mut blocks = Vec::new();
    while let Some(block) = iter.next_block() {
        assert_eq!(iter.block_start(), Some(block.start));
        assert_eq!(iter.block_end(), Some(block.end));
        blocks.push(block);
    }
    assert_eq!(
        blocks,
        vec![
            Block { start: 1, end: 4, kind: ChangeType::Update },
            Block { start: 6, end: 7, kind: ChangeType::Insert },
            Block { start: 9, end: 12, kind: ChangeType::Delete },
        ]
    );

    iter.reset();
    assert_eq!(iter.count(), 3 + 1 + 3);
}

#[test]
fn typing_then_backspacing_cancels() {
    let mut seq = ChangeBlockSequence::new();
    for i in 0..5 {
        assert!(seq.insert(10 + i, 11 + i));
    }
    for i in (0..5).rev() {
        assert!(seq.delete(10 + i, 11 + i));
    }
    assert!(seq.is_empty());
}

#[test]
fn backspacing_past_typed_text() {
    let mut seq = ChangeBlockSequence::new();
    assert!(seq.insert(3, 5));
    // delete the two typed characters and one original before them
    assert!(!seq.delete(2, 5));
    // deleting forward from the typed start works
    assert!(seq.delete(3, 6));
    assert_eq!(seq.to_string(), "D[3,4)");
}

// =============================================================================
// Replay properties
// =============================================================================

#[derive(Clone, Debug)]
enum Edit {
    Insert { back: usize, skip: usize, len: usize },
    Delete { back: usize, skip: usize, len: usize },
    Update { back: usize, skip: usize, len: usize },
}

fn arbitrary_edit() -> impl Strategy<Value = Edit> {
    let shape = (0..3usize, 0..4usize, 0..4usize);
    prop_oneof![
        shape.clone().prop_map(|(back, skip, len)| Edit::Insert { back, skip, len }),
        shape.clone().prop_map(|(back, skip, len)| Edit::Delete { back, skip, len }),
        shape.prop_map(|(back, skip, len)| Edit::Update { back, skip, len }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Whatever edits are accepted, replaying the blocks onto the original
    /// list reproduces the live list; refused edits change nothing.
    #[test]
    fn replay_reproduces_live_list(edits in prop::collection::vec(arbitrary_edit(), 1..30)) {
        let original: Vec<u32> = (0..20).collect();
        let mut live = original.clone();
        let mut next_value = 1000;
        let mut seq = ChangeBlockSequence::new();

        for edit in &edits {
            let (back, skip, len) = match edit {
                Edit::Insert { back, skip, len }
                | Edit::Delete { back, skip, len }
                | Edit::Update { back, skip, len } => (*back, *skip, *len),
            };
            let start = (seq.cursor() + skip).saturating_sub(back).min(live.len());
            let before = seq.clone();

            let accepted = match edit {
                Edit::Insert { .. } => {
                    let accepted = seq.insert(start, start + len);
                    if accepted {
                        for i in 0..len {
                            live.insert(start + i, next_value);
                            next_value += 1;
                        }
                    }
                    accepted
                }
                Edit::Delete { .. } => {
                    let end = (start + len).min(live.len());
                    let accepted = seq.delete(start, end);
                    if accepted {
                        live.drain(start..end);
                    }
                    accepted
                }
                Edit::Update { .. } => {
                    let end = (start + len).min(live.len());
                    let accepted = seq.update(start, end);
                    if accepted {
                        for value in &mut live[start..end] {
                            *value = next_value;
                            next_value += 1;
                        }
                    }
                    accepted
                }
            };

            if !accepted {
                prop_assert_eq!(&seq, &before);
            }
        }

        let mut replayed = original.clone();
        seq.apply_to(&mut replayed, |i| live[i]);
        prop_assert_eq!(&replayed, &live);
    }

    /// Blocks are ordered, non-empty, and adjacent blocks never could have
    /// been one.
    #[test]
    fn blocks_are_minimal(edits in prop::collection::vec(arbitrary_edit(), 1..30)) {
        let mut seq = ChangeBlockSequence::new();
        for edit in &edits {
            match edit {
                Edit::Insert { skip, len, .. } => { seq.insert(seq.cursor() + skip, seq.cursor() + skip + len); }
                Edit::Delete { skip, len, .. } => { seq.delete(seq.cursor() + skip, seq.cursor() + skip + len); }
                Edit::Update { skip, len, .. } => { seq.update(seq.cursor() + skip, seq.cursor() + skip + len); }
            }
        }

        let blocks = seq.blocks();
        for block in blocks {
            prop_assert!(block.start < block.end);
        }
        for pair in blocks.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let a_cursor = if a.kind == ChangeType::Delete { a.start } else { a.end };
            prop_assert!(b.start >= a_cursor);
            prop_assert!(!(a.kind == b.kind && b.start == a_cursor));
        }
    }
}

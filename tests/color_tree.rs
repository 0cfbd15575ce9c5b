//! Scenario tests for the color tree, its coder and its iterator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use glazier::{Color, ColorCoder, ColorSet, ColorTree, Error, TreeIterator};

// =============================================================================
// Helper functions
// =============================================================================

struct Colors {
    a: Color,
    b: Color,
    c: Color,
    all: ColorSet,
}

fn tree<V>() -> (ColorTree<V>, Colors) {
    let coder = ColorCoder::new(["A", "B", "C"]).unwrap();
    let colors = Colors {
        a: coder.color_to_byte("A").unwrap(),
        b: coder.color_to_byte("B").unwrap(),
        c: coder.color_to_byte("C").unwrap(),
        all: coder.all(),
    };
    return (ColorTree::new(coder), colors);
}

// =============================================================================
// Coder
// =============================================================================

#[test]
fn coder_round_trips_every_name() {
    let names = ["one", "two", "three", "four", "five", "six", "seven"];
    let coder = ColorCoder::new(names).unwrap();
    for name in names {
        let color = coder.color_to_byte(name).unwrap();
        assert_eq!(coder.byte_to_color(color.bits()), Ok(name));
    }
}

#[test]
fn coder_round_trips_every_subset() {
    let names = ["w", "x", "y", "z"];
    let coder = ColorCoder::new(names).unwrap();
    for mask in 0u8..16 {
        let subset: Vec<&str> = (0..4).filter(|i| mask & (1 << i) != 0).map(|i| names[i]).collect();
        let set = coder.colors_to_byte(&subset).unwrap();
        assert_eq!(coder.byte_to_colors(set).to_vec(), subset);
    }
}

// =============================================================================
// Sequences
// =============================================================================

#[test]
fn months_scenario() {
    let (mut tree, k) = tree();
    tree.add(0, k.all, k.b, "Jan", 5).unwrap();
    tree.add(0, k.all, k.a, "Mar", 5).unwrap();
    assert_eq!(tree.as_sequence_of_colors(), "AAAAABBBBB");

    tree.remove(0, k.all, 3).unwrap();
    assert_eq!(tree.as_sequence_of_colors(), "AABBBBB");
    tree.validate();
}

#[test]
fn insert_then_remove_everything() {
    let (mut tree, k) = tree();
    let n = 300;
    for i in 0..n {
        let color = [k.a, k.b, k.c][i % 3];
        tree.add(i, k.all, color, i, 1).unwrap();
    }
    assert_eq!(tree.size(k.all), n);
    assert_eq!(tree.node_count(), n);

    tree.remove(0, k.all, n).unwrap();
    assert_eq!(tree.as_sequence_of_colors(), "");
    assert!(tree.is_empty());
    tree.validate();
}

#[test]
fn remove_past_end_is_refused() {
    let (mut tree, k) = tree();
    tree.add(0, k.all, k.a, 'x', 3).unwrap();
    tree.add(3, k.all, k.b, 'y', 3).unwrap();
    assert_eq!(
        tree.remove(2, k.a.into(), 2),
        Err(Error::RangeOutOfBounds { index: 2, length: 2, size: 3 })
    );
    assert_eq!(tree.as_sequence_of_colors(), "AAABBB");
}

#[test]
fn remove_spanning_many_runs() {
    let (mut tree, k) = tree();
    for i in 0..20 {
        let color = if i % 2 == 0 { k.a } else { k.b };
        tree.add(tree.size(k.all), k.all, color, i, 2).unwrap();
    }
    // drop every B in the middle of the sequence
    tree.remove(2, k.b.into(), 16).unwrap();
    assert_eq!(tree.size(k.b.into()), 4);
    assert_eq!(tree.size(k.a.into()), 20);
    assert_eq!(tree.as_sequence_of_colors(), "AABBAAAAAAAAAAAAAAAAAABB");
    tree.validate();
}

// =============================================================================
// Filter-style usage
// =============================================================================

/// Two colors track a filter: which source elements pass, and where they sit.
#[test]
fn filter_tracking() {
    let (mut tree, k) = tree();
    let accepted = k.a;
    let rejected = k.b;
    let words = ["ant", "bee", "cat", "dog", "eel", "fox"];
    for (i, word) in words.iter().enumerate() {
        let color = if word.contains('e') { rejected } else { accepted };
        tree.add(i, k.all, color, *word, 1).unwrap();
    }

    let filtered: Vec<&str> = tree.iter(accepted.into()).copied().collect();
    assert_eq!(filtered, vec!["ant", "cat", "dog", "fox"]);

    // "dog" is source index 3 and filtered index 2
    assert_eq!(tree.convert_index_color(3, k.all, accepted.into()), Ok(2));
    assert_eq!(tree.convert_index_color(2, accepted.into(), k.all), Ok(3));
    // "eel" is rejected; it would sit at filtered index 3
    assert_eq!(tree.convert_index_color(4, k.all, accepted.into()), Ok(3));

    // "bee" starts passing the filter
    let bee = tree.get(1, k.all).unwrap();
    tree.set_color(bee, accepted).unwrap();
    assert_eq!(tree.index_of_node(bee, accepted.into()), Ok(1));
    assert_eq!(tree.size(accepted.into()), 5);

    // removing a source element also removes it from the filtered view
    tree.remove(0, k.all, 1).unwrap();
    assert_eq!(tree.iter(accepted.into()).next(), Some(&"bee"));
    tree.validate();
}

#[test]
fn handles_are_stable_across_unrelated_edits() {
    let (mut tree, k) = tree();
    let watched = tree.add(0, k.all, k.c, 1000, 1).unwrap();
    for i in 0..50 {
        tree.add(0, k.all, k.a, i, 1).unwrap();
        tree.add(tree.size(k.all), k.all, k.b, -i - 1, 1).unwrap();
    }
    tree.remove(10, k.all, 20).unwrap();
    assert_eq!(tree.index_of_node(watched, k.all), Ok(30));
    assert_eq!(tree.get(30, k.all), Ok(watched));
    assert_eq!(tree.index_of_node(watched, k.c.into()), Ok(0));
    assert_eq!(tree.value(watched), Ok(&1000));
    tree.validate();
}

// =============================================================================
// Iteration
// =============================================================================

#[test]
fn iterator_reports_positions_in_every_view() {
    let (mut tree, k) = tree();
    tree.add(0, k.all, k.a, 'a', 3).unwrap();
    tree.add(3, k.all, k.b, 'b', 2).unwrap();
    tree.add(5, k.all, k.c, 'c', 1).unwrap();
    tree.add(6, k.all, k.a, 'd', 2).unwrap();

    let mut cursor = TreeIterator::new(&tree);
    let mut b_positions = Vec::new();
    while cursor.next(k.all).is_some() {
        b_positions.push(cursor.index(k.b.into()));
    }
    assert_eq!(b_positions, vec![0, 0, 0, 0, 1, 2, 2, 2]);

    let runs: Vec<(char, usize, usize)> = tree.runs(k.a | k.c).map(|r| (*r.value, r.start, r.end)).collect();
    assert_eq!(runs, vec![('a', 0, 3), ('c', 3, 4), ('d', 4, 6)]);
}

#[test]
fn iterator_resumes_at_offset() {
    let (mut tree, k) = tree();
    for i in 0..10 {
        let color = if i % 3 == 0 { k.a } else { k.b };
        tree.add(i, k.all, color, i, 1).unwrap();
    }
    for start in 0..=tree.size(k.b.into()) {
        let mut cursor = TreeIterator::starting_at(&tree, start, k.b.into()).unwrap();
        let mut rest = Vec::new();
        while cursor.next(k.b.into()).is_some() {
            rest.push(*cursor.value().unwrap());
        }
        let expected: Vec<usize> = (0..10).filter(|i| i % 3 != 0).skip(start).collect();
        assert_eq!(rest, expected);
    }
}

// =============================================================================
// Randomized stress
// =============================================================================

#[test]
fn random_edits_keep_invariants() {
    let (mut tree, k) = tree();
    let palette = [k.a, k.b, k.c];
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut model: Vec<(Color, u8)> = Vec::new();

    for _ in 0..2000 {
        let len = model.len();
        match rng.gen_range(0..4) {
            0 | 1 => {
                let pos = rng.gen_range(0..=len);
                let color = palette[rng.gen_range(0..3)];
                let value = rng.gen_range(0..2u8);
                let run = rng.gen_range(1..4);
                tree.add(pos, k.all, color, value, run).unwrap();
                for _ in 0..run {
                    model.insert(pos, (color, value));
                }
            }
            2 if len > 0 => {
                let pos = rng.gen_range(0..len);
                let count = rng.gen_range(1..=(len - pos).min(5));
                tree.remove(pos, k.all, count).unwrap();
                model.drain(pos..pos + count);
            }
            3 if len > 0 => {
                let pos = rng.gen_range(0..len);
                let node = tree.get(pos, k.all).unwrap();
                let start = tree.index_of_node(node, k.all).unwrap();
                let run = tree.run_len(node).unwrap();
                let color = palette[rng.gen_range(0..3)];
                tree.set_color(node, color).unwrap();
                for element in &mut model[start..start + run] {
                    element.0 = color;
                }
            }
            _ => {}
        }

        let sequence: String = model
            .iter()
            .map(|(color, _)| tree.coder().name(*color).unwrap())
            .collect();
        assert_eq!(tree.as_sequence_of_colors(), sequence);
    }
    tree.validate();
}

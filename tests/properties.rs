//! End-to-end behaviour of the diff engine on whole texts.

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use tola_textdiff::{BlockKind, DiffConfig, FragmentKind, MoveDirection, TextDiff, TextDiffer, diff, diff_with_config};

fn lines(items: &[&str]) -> String {
    items.iter().map(|line| format!("{line}\n")).collect()
}

fn assert_blocks_consistent(result: &TextDiff, old: &str, new: &str) {
    for block in result.blocks() {
        if block.kind() != BlockKind::Unchanged {
            continue;
        }
        let (Some(o), Some(n)) = (block.old(), block.new()) else {
            panic!("unchanged block without both spans: {block:?}");
        };
        assert_eq!(o.slice(old), n.slice(new));
    }
}

// =============================================================================
// Examples
// =============================================================================

#[test]
fn test_insert_between_words() {
    let result = diff("hello world", "hello there world").unwrap();
    let fragments: Vec<_> = result.fragments().iter().map(|f| (f.kind(), f.text())).collect();
    assert_eq!(
        fragments,
        [
            (FragmentKind::Copy, "hello "),
            (FragmentKind::Insert, "there "),
            (FragmentKind::Copy, "world"),
        ]
    );
}

#[test]
fn test_word_moved_to_front() {
    let result = diff("A B C D", "D A B C").unwrap();
    assert_eq!(result.move_groups().len(), 1);
    let group = &result.move_groups()[0];
    assert_eq!(group.direction(), MoveDirection::Up);

    let start = result
        .fragments()
        .iter()
        .find(|f| f.kind() == FragmentKind::MoveStart)
        .unwrap();
    let end = result
        .fragments()
        .iter()
        .find(|f| f.kind() == FragmentKind::MoveEnd)
        .unwrap();
    assert_eq!(start.text(), "D");
    assert_eq!(end.text(), "D");
    assert_eq!(start.group(), end.group());
}

#[test]
fn test_insert_into_empty() {
    let result = diff("", "hello").unwrap();
    assert_eq!(result.fragments().len(), 1);
    assert_eq!(result.fragments()[0].kind(), FragmentKind::Insert);
    assert_eq!(result.fragments()[0].text(), "hello");
}

// =============================================================================
// Moves
// =============================================================================

#[test]
fn test_single_line_relocation() {
    let old = lines(&["line one alpha", "line two beta", "line three gamma", "line four delta"]);
    let new = lines(&["line three gamma", "line one alpha", "line two beta", "line four delta"]);
    let result = diff(&old, &new).unwrap();

    assert_eq!(result.move_groups().len(), 1);
    assert_eq!(result.move_groups()[0].direction(), MoveDirection::Up);
    // No short unchanged leftovers
    for block in result.blocks().iter().filter(|b| b.kind() == BlockKind::Unchanged) {
        assert!(block.words() >= 3, "short block {block:?}");
    }
    assert_eq!(result.new_text(), new);
    assert_eq!(result.old_text(), old);
    assert_blocks_consistent(&result, &old, &new);
}

#[test]
fn test_line_moved_down() {
    let old = lines(&["first line here", "second line here", "third line here", "fourth line here"]);
    let new = lines(&["second line here", "third line here", "fourth line here", "first line here"]);
    let result = diff(&old, &new).unwrap();

    assert_eq!(result.move_groups().len(), 1);
    assert_eq!(result.move_groups()[0].direction(), MoveDirection::Down);
    assert_eq!(result.old_text(), old);
}

#[test]
fn test_two_independent_relocations() {
    let old = lines(&[
        "apples are red and sweet",
        "bananas are long and yellow",
        "cherries grow in bunches",
        "dates come from palms",
        "elderberries make syrup",
        "figs ripen in late summer",
        "grapes become wine eventually",
        "honeydew is a melon variety",
    ]);
    let new = lines(&[
        "bananas are long and yellow",
        "apples are red and sweet",
        "cherries grow in bunches",
        "dates come from palms",
        "elderberries make syrup",
        "figs ripen in late summer",
        "honeydew is a melon variety",
        "grapes become wine eventually",
    ]);
    let result = diff(&old, &new).unwrap();

    assert_eq!(result.move_groups().len(), 2);
    assert_eq!(result.stats().move_groups, 2);
    assert_eq!(result.new_text(), new);
    assert_eq!(result.old_text(), old);
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_from_json() {
    let config = DiffConfig::from_json(r#"{ "char_diff": false, "clip": { "enabled": true } }"#).unwrap();
    assert!(!config.char_diff);
    assert!(config.clip.enabled);

    let err = DiffConfig::from_json(r#"{ "no_such_option": 1 }"#).unwrap_err();
    assert!(err.to_string().contains("no_such_option"));
}

#[test]
fn test_differ_reuse_matches_free_function() {
    let differ = TextDiffer::new(DiffConfig::default()).unwrap();
    let old = "The quick brown fox jumps over the lazy dog.";
    let new = "The quick red fox jumped over the lazy dog!";
    let reused = differ.diff(old, new);
    let direct = diff(old, new).unwrap();
    assert_eq!(reused.fragments(), direct.fragments());
    assert_eq!(reused.fingerprint(), direct.fingerprint());
}

#[test]
fn test_whitespace_insensitive() {
    let config = DiffConfig::builder().whitespace_sensitive(false).build().unwrap();
    let result = diff_with_config("a  b\tc", "a b c", &config).unwrap();
    assert!(!result.has_changes());
    assert_eq!(result.new_text(), "a b c");
}

#[test]
fn test_serialized_fragments() {
    let result = diff("hello world", "hello there world").unwrap();
    let json = serde_json::to_value(result.fragments()).unwrap();
    assert_eq!(json[1]["kind"], "insert");
    assert_eq!(json[1]["text"], "there ");
    assert_eq!(json[1]["new"]["start"], 6);
}

// =============================================================================
// Properties
// =============================================================================

fn vocabulary_text() -> impl Strategy<Value = String> {
    let pieces = prop::sample::select(vec![
        "a", "b", "the", "cat", "dog", "colour", "color", " ", "  ", "\n", "\n\n", ". ", ", ", "Über", "日本", "x-y",
    ]);
    prop::collection::vec(pieces, 0..40).prop_map(|parts| parts.concat())
}

fn any_text() -> impl Strategy<Value = String> {
    prop_oneof![vocabulary_text(), "\\PC{0,40}"]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_new_text_reconstructed(old in any_text(), new in any_text()) {
        let result = diff(&old, &new).unwrap();
        prop_assert_eq!(result.new_text(), new);
    }

    #[test]
    fn prop_old_text_reconstructed(old in vocabulary_text(), new in vocabulary_text()) {
        let result = diff(&old, &new).unwrap();
        prop_assert_eq!(result.old_text(), old);
    }

    #[test]
    fn prop_identity(text in any_text()) {
        let result = diff(&text, &text).unwrap();
        prop_assert!(!result.has_changes());
        if text.is_empty() {
            prop_assert!(result.fragments().is_empty());
        } else {
            prop_assert_eq!(result.blocks().len(), 1);
            prop_assert_eq!(result.fragments().len(), 1);
            prop_assert_eq!(result.fragments()[0].kind(), FragmentKind::Copy);
        }
    }

    #[test]
    fn prop_deterministic(old in vocabulary_text(), new in vocabulary_text()) {
        let first = diff(&old, &new).unwrap();
        let second = diff(&old, &new).unwrap();
        prop_assert_eq!(first.fragments(), second.fragments());
        prop_assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn prop_unchanged_blocks_match(old in vocabulary_text(), new in vocabulary_text()) {
        let result = diff(&old, &new).unwrap();
        for block in result.blocks().iter().filter(|b| b.kind() == BlockKind::Unchanged) {
            let (o, n) = (block.old().unwrap(), block.new().unwrap());
            prop_assert_eq!(o.slice(&old), n.slice(&new));
        }
    }

    #[test]
    fn prop_clipping_preserves_text(old in vocabulary_text(), new in vocabulary_text()) {
        let result = diff_with_config(&old, &new, &DiffConfig::clipped()).unwrap();
        prop_assert_eq!(result.new_text(), new);
        prop_assert_eq!(result.old_text(), old);
    }

    #[test]
    fn prop_blocks_in_group_keep_order(old in vocabulary_text(), new in vocabulary_text()) {
        let result = diff(&old, &new).unwrap();
        let unchanged: Vec<_> = result
            .blocks()
            .iter()
            .filter(|b| b.kind() == BlockKind::Unchanged)
            .collect();
        for pair in unchanged.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if a.group().is_none() || a.group() != b.group() {
                continue;
            }
            let (a_old, a_new) = (a.old().unwrap(), a.new().unwrap());
            let (b_old, b_new) = (b.old().unwrap(), b.new().unwrap());
            prop_assert!(a_old.end <= b_old.start, "old order broken: {:?} {:?}", a, b);
            prop_assert!(a_new.end <= b_new.start, "new order broken: {:?} {:?}", a, b);
        }
    }
}

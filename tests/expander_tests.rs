//! Black-box tests for the pattern/sequence expander (C2).

use gbscore::ast::SeqItem;
use gbscore::expander::{expand_tokens, Expander};
use pretty_assertions::assert_eq;
use std::collections::HashMap;

#[test]
fn grouping_and_repeat_expand_left_to_right() {
    let tokens = vec!["(C4 D4)*2".to_string(), "E4*3".to_string()];
    let expanded = expand_tokens(&tokens, &[]).unwrap();
    assert_eq!(
        expanded,
        vec!["C4", "D4", "C4", "D4", "E4", "E4", "E4"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
    );
}

#[test]
fn rev_modifier_reverses_the_token_stream() {
    let tokens = vec!["C4".to_string(), "D4".to_string(), "E4".to_string()];
    let expanded = expand_tokens(&tokens, &["rev".to_string()]).unwrap();
    assert_eq!(expanded, vec!["E4".to_string(), "D4".to_string(), "C4".to_string()]);
}

#[test]
fn oct_modifier_transposes_every_note() {
    let tokens = vec!["C4".to_string()];
    let expanded = expand_tokens(&tokens, &["oct(-1)".to_string()]).unwrap();
    assert_eq!(expanded, vec!["C3".to_string()]);
}

#[test]
fn sequence_resolves_nested_pattern_references() {
    let mut patterns = HashMap::new();
    patterns.insert("A".to_string(), vec!["C4".to_string(), "D4".to_string()]);
    patterns.insert("B".to_string(), vec!["E4".to_string()]);
    let mut sequences = HashMap::new();
    sequences.insert(
        "main".to_string(),
        vec![SeqItem::new("A", vec![]), SeqItem::new("B", vec!["oct(-1)".to_string()])],
    );

    let expander = Expander::new(&sequences, &patterns);
    let resolved = expander
        .resolve_items(&[SeqItem::new("main", vec![])])
        .unwrap();
    assert_eq!(resolved, vec!["C4".to_string(), "D4".to_string(), "E3".to_string()]);
}

#[test]
fn cyclic_sequence_reference_is_an_error() {
    let patterns = HashMap::new();
    let mut sequences = HashMap::new();
    sequences.insert("a".to_string(), vec![SeqItem::new("b", vec![])]);
    sequences.insert("b".to_string(), vec![SeqItem::new("a", vec![])]);

    let expander = Expander::new(&sequences, &patterns);
    assert!(expander.resolve_items(&[SeqItem::new("a", vec![])]).is_err());
}

#[test]
fn zero_repeat_count_yields_empty_sequence() {
    let tokens = vec!["C4*0".to_string()];
    let expanded = expand_tokens(&tokens, &[]).unwrap();
    assert!(expanded.is_empty());
}

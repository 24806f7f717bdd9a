//! Black-box tests for the parser (C1): score source text -> `AbstractScore`.

use gbscore::parse;
use pretty_assertions::assert_eq;

#[test]
fn parses_global_directives() {
    let (score, _) = parse("chip gameboy\nbpm 140\nvolume 0.5\n").unwrap();
    assert_eq!(score.chip, "gameboy");
    assert_eq!(score.bpm, 140);
    assert_eq!(score.volume, 0.5);
}

#[test]
fn parses_pattern_with_grouping_expanded_at_parse_time() {
    let (score, _) = parse("pat A = (C4 E4 G4)*2\n").unwrap();
    assert_eq!(
        score.patterns.get("A").unwrap(),
        &vec!["C4".to_string(), "E4".to_string(), "G4".to_string(), "C4".to_string(), "E4".to_string(), "G4".to_string()]
    );
}

#[test]
fn parses_instrument_with_type_key() {
    let (score, _) = parse("inst lead type=pulse1 duty=0.5\n").unwrap();
    let inst = score.instruments.get("lead").unwrap();
    assert_eq!(inst.kind, gbscore::InstrumentType::Pulse1);
    assert_eq!(inst.duty, Some(0.5));
}

#[test]
fn channel_references_a_previously_declared_pattern() {
    let (score, _) = parse("pat A = C4 D4\nchannel 1 => pat A\n").unwrap();
    assert_eq!(score.channels.len(), 1);
    assert_eq!(score.channels[0].id, 1);
}

#[test]
fn channel_with_inline_bpm_is_rejected() {
    let source = "channel 1 => pat A bpm 90\n";
    assert!(parse(source).is_err());
}

#[test]
fn duplicate_channel_id_is_rejected() {
    let source = "channel 1 => pat A\nchannel 1 => pat B\n";
    assert!(parse(source).is_err());
}

#[test]
fn cyclic_sequence_reference_is_rejected() {
    let source = "seq a = b\nseq b = a\nchannel 1 => seq a\n";
    assert!(parse(source).is_err());
}

#[test]
fn parses_import_directive() {
    let (score, _) = parse("import \"lib.score\"\n").unwrap();
    assert_eq!(score.imports, vec!["lib.score".to_string()]);
}

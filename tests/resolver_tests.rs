//! Black-box tests for the resolver (C3): `AbstractScore` -> `ResolvedSong`.

use gbscore::resolver::ChannelEvent;
use gbscore::{parse, resolve};
use pretty_assertions::assert_eq;

fn resolve_source(source: &str) -> gbscore::ResolvedSong {
    let (score, _) = parse(source).unwrap();
    let (song, _) = resolve(&score).unwrap();
    song
}

#[test]
fn note_tokens_resolve_to_note_events() {
    let song = resolve_source("pat A = C4 D4\nchannel 1 => pat A\n");
    assert_eq!(song.channels[0].events.len(), 2);
    assert!(matches!(song.channels[0].events[0], ChannelEvent::Note { .. }));
}

#[test]
fn rest_and_sustain_tokens_resolve() {
    let song = resolve_source("pat A = C4 . _\nchannel 1 => pat A\n");
    assert_eq!(
        song.channels[0].events,
        vec![
            ChannelEvent::Note {
                pitch: gbscore::Pitch::new(gbscore::NoteName::C, gbscore::Accidental::Natural, 4),
                instrument: None,
                pan: None,
                effects: vec![],
                legato: false,
            },
            ChannelEvent::Rest,
            ChannelEvent::Sustain,
        ]
    );
}

#[test]
fn permanent_instrument_override_sticks_for_remaining_notes() {
    let source = "inst lead type=pulse1\ninst bass type=pulse2\npat A = inst(bass) C4 D4\nchannel 1 => inst lead pat A\n";
    let song = resolve_source(source);
    for event in &song.channels[0].events {
        if let ChannelEvent::Note { instrument, .. } = event {
            assert_eq!(instrument.as_deref(), Some("bass"));
        }
    }
}

#[test]
fn temporary_instrument_override_reverts_after_n_sound_events() {
    let source = "inst lead type=pulse1\ninst bass type=pulse2\npat A = inst(bass,1) C4 D4\nchannel 1 => inst lead pat A\n";
    let song = resolve_source(source);
    let events = &song.channels[0].events;
    assert!(matches!(&events[0], ChannelEvent::Note { instrument: Some(n), .. } if n == "bass"));
    assert!(matches!(&events[1], ChannelEvent::Note { instrument: Some(n), .. } if n == "lead"));
}

#[test]
fn inline_pan_effect_takes_precedence_over_sentinel_pan() {
    let source = "pat A = pan(-1) C4<pan:0.5> D4\nchannel 1 => pat A\n";
    let song = resolve_source(source);
    if let ChannelEvent::Note { pan, .. } = &song.channels[0].events[0] {
        assert_eq!(*pan, Some(gbscore::Pan::numeric(0.5)));
    } else {
        panic!("expected a Note event");
    }
}

#[test]
fn arrangement_column_selects_the_channel_specific_slot() {
    let source = "arrange main = C4 D4 . .,\nE4 F4 . .\nchannel 1 => main\nchannel 2 => main\n";
    let song = resolve_source(source);
    assert_eq!(song.channels[0].events.len(), 2);
    assert_eq!(song.channels[1].events.len(), 2);
}

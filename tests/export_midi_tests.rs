//! Black-box tests for Standard MIDI File export (C5.2).

use gbscore::{compile, export_midi, MidiOptions};
use pretty_assertions::assert_eq;

#[test]
fn exported_file_is_format_one_smf() {
    let (song, _) = compile("pat A = C4 D4\nchannel 1 => pat A\n").unwrap();
    let (bytes, _) = export_midi(&song, &MidiOptions::default()).unwrap();
    assert_eq!(&bytes[0..4], b"MThd");
    assert_eq!(&bytes[8..10], &[0x00, 0x01]);
}

#[test]
fn one_track_per_resolved_channel() {
    let source = "inst lead type=pulse1\ninst bass type=pulse2\npat A = C4\npat B = C3\nchannel 1 => inst lead pat A\nchannel 2 => inst bass pat B\n";
    let (song, _) = compile(source).unwrap();
    let (bytes, _) = export_midi(&song, &MidiOptions::default()).unwrap();
    let track_count = bytes.windows(4).filter(|w| *w == b"MTrk").count();
    assert_eq!(track_count, 2);
}

#[test]
fn custom_ppq_is_written_into_the_header() {
    let (song, _) = compile("pat A = C4\nchannel 1 => pat A\n").unwrap();
    let options = MidiOptions { ppq: 960 };
    let (bytes, _) = export_midi(&song, &options).unwrap();
    let ppq = u16::from_be_bytes([bytes[12], bytes[13]]);
    assert_eq!(ppq, 960);
}

#[test]
fn noise_channel_is_routed_to_the_percussion_channel() {
    let source = "inst hat type=noise\npat A = hit(hat,1)\nchannel 1 => inst hat pat A\n";
    let (song, _) = compile(source).unwrap();
    let (bytes, _) = export_midi(&song, &MidiOptions::default()).unwrap();
    // Note-on status byte 0x9? with channel nibble 9 (MIDI channel 10).
    assert!(bytes.windows(1).any(|w| w[0] == 0x99));
}

//! Black-box tests for the PCM renderer (C4 consumer).

use gbscore::render::ChannelCount;
use gbscore::{compile, render_pcm, RenderOptions};
use pretty_assertions::assert_eq;

#[test]
fn silent_song_produces_an_all_zero_buffer() {
    let (song, _) = compile("pat A = . . .\nchannel 1 => pat A\n").unwrap();
    let (pcm, _) = render_pcm(&song, &RenderOptions::default());
    assert!(!pcm.is_empty());
    assert!(pcm.iter().all(|&s| s == 0.0));
}

#[test]
fn every_sample_stays_within_unit_range() {
    let (song, _) = compile(
        "inst lead type=pulse1\npat A = C4 D4 E4 F4 G4\nchannel 1 => inst lead pat A\n",
    )
    .unwrap();
    let (pcm, _) = render_pcm(&song, &RenderOptions::default());
    assert!(pcm.iter().all(|&s| (-1.0..=1.0).contains(&s)));
}

#[test]
fn stereo_render_doubles_buffer_length_relative_to_mono() {
    let (song, _) = compile("inst lead type=pulse1\npat A = C4 D4\nchannel 1 => inst lead pat A\n").unwrap();
    let mono_opts = RenderOptions::default();
    let mut stereo_opts = RenderOptions::default();
    stereo_opts.channels = ChannelCount::Stereo;

    let (mono, _) = render_pcm(&song, &mono_opts);
    let (stereo, _) = render_pcm(&song, &stereo_opts);
    assert_eq!(stereo.len(), mono.len() * 2);
}

#[test]
fn double_speed_channel_finishes_in_half_the_samples() {
    let base = "inst lead type=pulse1\npat A = C4 D4 E4 F4\nchannel 1 => inst lead pat A\n";
    let fast = "inst lead type=pulse1\npat A = C4 D4 E4 F4\nchannel 1 => inst lead pat A speed=2\n";
    let (base_song, _) = compile(base).unwrap();
    let (fast_song, _) = compile(fast).unwrap();
    let (base_pcm, _) = render_pcm(&base_song, &RenderOptions::default());
    let (fast_pcm, _) = render_pcm(&fast_song, &RenderOptions::default());
    assert!(fast_pcm.len() < base_pcm.len());
}

#[test]
fn render_channels_whitelist_silences_other_channels() {
    let source = "inst lead type=pulse1\ninst bass type=pulse2\npat A = C4 D4\npat B = C3 D3\nchannel 1 => inst lead pat A\nchannel 2 => inst bass pat B\n";
    let (song, _) = compile(source).unwrap();
    let mut opts = RenderOptions::default();
    opts.render_channels = Some(vec![1]);
    let (pcm, _) = render_pcm(&song, &opts);

    let mut all_opts = RenderOptions::default();
    let (pcm_all, _) = render_pcm(&song, &all_opts);
    all_opts.render_channels = None;
    assert_ne!(pcm, pcm_all);
}

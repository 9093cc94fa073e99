//! Playback engine behaviour against a fake remote device.

use lightshow_common::NUM_BYTES_TOTAL;
use lightshow_core::audio::{AudioEvent, ManualAudio, ManualClock};
use lightshow_core::{
    PlaybackEngine, PlaybackState, PlaybackTiming, RemoteConfig, RemoteLinkClient, SharedRelays,
    Song, SongCatalog,
};
use lightshow_fseq::SequenceWriter;
use std::io::Read;
use std::net::TcpListener;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// Sequence whose every frame switches on exactly relay byte `relay`.
fn write_sequence(path: &Path, relay: usize, frames: usize) {
    let mut frame = vec![0u8; NUM_BYTES_TOTAL];
    frame[relay] = 1;
    SequenceWriter::new(NUM_BYTES_TOTAL as u32, 50)
        .write_to_path(path, &vec![frame; frames])
        .unwrap();
}

fn song(dir: &Path, title: &str, relay: usize) -> Song {
    let sequence_path = dir.join(format!("{title}.fseq"));
    write_sequence(&sequence_path, relay, 20);
    Song {
        title: title.to_string(),
        artist: "Test".to_string(),
        album_art: String::new(),
        length_ms: 1000,
        audio_path: dir.join(format!("{title}.mp3")),
        sequence_path,
    }
}

struct Rig {
    engine: PlaybackEngine,
    clock: ManualClock,
    relays: SharedRelays,
    _dir: tempfile::TempDir,
}

fn rig(remote: RemoteConfig) -> Rig {
    let dir = tempfile::tempdir().unwrap();
    let catalog = SongCatalog::from_songs([song(dir.path(), "A", 0), song(dir.path(), "B", 1)]);
    let relays = SharedRelays::in_memory((0..16).map(|i| format!("light{i}")));
    let (audio, clock) = ManualAudio::new();
    let engine = PlaybackEngine::builder(Arc::new(catalog), relays.clone())
        .with_audio(Box::new(audio))
        .with_remote(Arc::new(RemoteLinkClient::new(remote)))
        .with_timing(PlaybackTiming::immediate())
        .build();
    Rig {
        engine,
        clock,
        relays,
        _dir: dir,
    }
}

fn wait_for(what: &str, mut condition: impl FnMut() -> bool) {
    let start = Instant::now();
    while !condition() {
        assert!(start.elapsed() < Duration::from_secs(3), "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}

fn refused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Accepts `count` connections and reports each payload.
fn fake_remote(count: usize) -> (u16, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for _ in 0..count {
            let (mut conn, _) = listener.accept().unwrap();
            let mut text = String::new();
            conn.read_to_string(&mut text).unwrap();
            tx.send(text).unwrap();
        }
    });
    (port, rx)
}

#[test]
fn second_play_replaces_first() {
    let rig = rig(RemoteConfig::disabled());

    rig.engine.play("A").unwrap();
    wait_for("A's first frame", || rig.relays.lock().get(0).unwrap());

    rig.engine.play("B").unwrap();
    assert!(rig.engine.active_loops() <= 1);
    wait_for("B's first frame", || rig.relays.lock().get(1).unwrap());

    assert_eq!(rig.engine.active_loops(), 1);
    assert_eq!(rig.engine.current_song().unwrap().title, "B");
    let states = rig.relays.lock().states().unwrap();
    assert!(!states[0], "relay from A still on");

    let stops = rig
        .clock
        .events()
        .iter()
        .filter(|e| **e == AudioEvent::Stop)
        .count();
    assert_eq!(stops, 1);
    rig.engine.stop().unwrap();
    assert_eq!(rig.engine.active_loops(), 0);
}

#[test]
fn refused_remote_still_plays() {
    let rig = rig(RemoteConfig::local(refused_port()));

    let status = rig.engine.play("A").unwrap();
    assert_eq!(status.state, PlaybackState::Playing);
    assert!(!status.remote.is_healthy());
    assert!(status.remote.last_error.is_some());
    wait_for("first frame", || rig.relays.lock().get(0).unwrap());

    rig.engine.pause();
    rig.engine.resume();
    let status = rig.engine.stop().unwrap();
    assert_eq!(status.state, PlaybackState::Idle);
    assert_eq!(status.remote.consecutive_failures, 4);
}

#[test]
fn remote_receives_literal_commands() {
    let (port, received) = fake_remote(4);
    let rig = rig(RemoteConfig::local(port));

    rig.engine.play("A").unwrap();
    rig.engine.pause();
    rig.engine.resume();
    rig.engine.stop().unwrap();

    let commands: Vec<String> = (0..4)
        .map(|_| received.recv_timeout(Duration::from_secs(3)).unwrap())
        .collect();
    assert_eq!(commands, ["PLAY", "PAUSE", "RESUME", "STOP"]);
    assert!(rig.engine.songs_status().remote.is_healthy());
}

#[test]
fn song_end_stops_once() {
    let rig = rig(RemoteConfig::disabled());
    rig.engine.play("A").unwrap();
    wait_for("first frame", || rig.relays.lock().get(0).unwrap());

    rig.clock.finish();
    assert!(rig.engine.wait_until_idle(Some(Duration::from_secs(3))));
    wait_for("loop exit", || rig.engine.active_loops() == 0);

    assert!(rig.relays.lock().states().unwrap().iter().all(|on| !on));
    let stops = rig
        .clock
        .events()
        .iter()
        .filter(|e| **e == AudioEvent::Stop)
        .count();
    assert_eq!(stops, 1);
}

#[test]
fn paused_song_does_not_auto_stop() {
    let rig = rig(RemoteConfig::disabled());
    rig.engine.play("A").unwrap();
    rig.engine.pause();
    rig.clock.finish();

    thread::sleep(Duration::from_millis(50));
    assert_eq!(rig.engine.state(), PlaybackState::Paused);
    rig.engine.stop().unwrap();
}

#[test]
fn audio_past_last_frame_holds_final_state() {
    let rig = rig(RemoteConfig::disabled());
    rig.engine.play("B").unwrap();
    wait_for("first frame", || rig.relays.lock().get(1).unwrap());
    rig.clock.set_position(Duration::from_secs(30));

    thread::sleep(Duration::from_millis(50));
    assert_eq!(rig.engine.state(), PlaybackState::Playing);
    assert!(rig.engine.fault().is_none());
    assert!(rig.relays.lock().get(1).unwrap());
    rig.engine.stop().unwrap();
}

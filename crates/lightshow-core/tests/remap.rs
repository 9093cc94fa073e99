//! Remap persistence: the mapping file changes only on a complete remap.

use lightshow_core::relay::MemoryRelayBank;
use lightshow_core::{RelayMapping, RemapSession, SharedRelays};
use std::fs;
use std::path::Path;

const ORIGINAL: &str = "{\n  \"porch\": 0,\n  \"tree\": 1,\n  \"arch\": 2\n}";

fn setup(dir: &Path) -> (RemapSession, SharedRelays) {
    let path = dir.join("relay_mapping.json");
    fs::write(&path, ORIGINAL).unwrap();
    let relays = SharedRelays::new(
        Box::new(MemoryRelayBank::new(3)),
        RelayMapping::load(&path).unwrap(),
        Some(path),
    )
    .unwrap();
    (RemapSession::new(relays.clone()), relays)
}

#[test]
fn cancelled_remap_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let (remap, relays) = setup(dir.path());
    let before = relays.mapping();

    remap.start().unwrap();
    remap.next("arch").unwrap();
    remap.next("porch").unwrap();
    let status = remap.cancel().unwrap();

    assert!(!status.in_progress());
    assert_eq!(fs::read_to_string(dir.path().join("relay_mapping.json")).unwrap(), ORIGINAL);
    assert_eq!(relays.mapping(), before);
    assert!(relays.lock().states().unwrap().iter().all(|on| !on));
}

#[test]
fn completed_remap_persists_all_assignments() {
    let dir = tempfile::tempdir().unwrap();
    let (remap, relays) = setup(dir.path());

    remap.start().unwrap();
    remap.next("arch").unwrap();
    remap.next("porch").unwrap();
    let status = remap.next("tree").unwrap();
    assert!(!status.in_progress());

    let saved = RelayMapping::load(dir.path().join("relay_mapping.json")).unwrap();
    assert_eq!(saved.names().collect::<Vec<_>>(), ["porch", "tree", "arch"]);
    assert_eq!(saved.channel_of("arch"), Some(0));
    assert_eq!(saved.channel_of("porch"), Some(1));
    assert_eq!(saved.channel_of("tree"), Some(2));
    assert_eq!(relays.mapping(), saved);
}

use filesystem_resolver::FilesystemResolver;
use jukebox_core::TrackResolver;
use std::fs;
use std::path::Path;

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"not really audio").unwrap();
}

#[test]
fn directory_resolves_playable_files_in_path_order() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    touch(&root.join("Artist/Album/02 - second.mp3"));
    touch(&root.join("Artist/Album/01 - first.flac"));
    touch(&root.join("Artist/Album/cover.jpg"));
    touch(&root.join("loose.ogg"));

    let tracks = FilesystemResolver::new()
        .resolve(root.to_str().unwrap())
        .expect("directory should resolve");

    let titles: Vec<_> = tracks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["01 - first", "02 - second", "loose"]);
    assert_eq!(tracks[0].artists, vec!["Artist".to_string()]);
    assert_eq!(tracks[0].album.as_deref(), Some("Album"));
    assert!(tracks[2].artists.is_empty());
}

#[test]
fn single_file_resolves_to_one_track() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("song.mp3");
    touch(&path);

    let tracks = FilesystemResolver::new()
        .resolve(path.to_str().unwrap())
        .expect("file should resolve");
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].title, "song");
    assert_eq!(tracks[0].duration_seconds, None);
}

#[test]
fn missing_and_unplayable_locations_yield_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let text = temp.path().join("notes.txt");
    touch(&text);

    let resolver = FilesystemResolver::new();
    assert!(resolver
        .resolve(temp.path().join("missing.mp3").to_str().unwrap())
        .unwrap()
        .is_empty());
    assert!(resolver.resolve(text.to_str().unwrap()).unwrap().is_empty());
}

#[test]
fn resolve_all_keeps_input_order_and_skips_failures() {
    let temp = tempfile::tempdir().unwrap();
    let a = temp.path().join("a.mp3");
    let b = temp.path().join("b.mp3");
    touch(&a);
    touch(&b);

    let locations = vec![
        b.to_string_lossy().to_string(),
        "smb://server/share/x.mp3".to_string(),
        a.to_string_lossy().to_string(),
    ];
    let tracks = FilesystemResolver::new().resolve_all(&locations);
    let titles: Vec<_> = tracks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["b", "a"]);
}

#[test]
fn stream_urls_pass_through() {
    let tracks = FilesystemResolver::new()
        .resolve("http://radio.example/stream")
        .unwrap();
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].id.as_ref(), "http://radio.example/stream");
}

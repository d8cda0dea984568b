//! Turning positional arguments into locations the primary can open.

use path_clean::PathClean;
use std::io::{self, BufRead};
use std::path::Path;

/// Read the locations named on the command line.
///
/// A lone leading `-` means "read a newline-separated list from stdin";
/// anything after it is ignored. Blank lines are dropped.
pub fn collect(args: &[String], stdin: impl BufRead) -> io::Result<Vec<String>> {
    if args.first().map(String::as_str) != Some("-") {
        return Ok(args.to_vec());
    }
    let mut locations = Vec::new();
    for line in stdin.lines() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if !line.trim().is_empty() {
            locations.push(line.to_string());
        }
    }
    Ok(locations)
}

/// Anchor relative paths at `cwd`; URLs pass through untouched.
pub fn absolutize(location: &str, cwd: &Path) -> String {
    if location.contains("://") {
        return location.to_string();
    }
    let path = Path::new(location);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };
    absolute.clean().to_string_lossy().into_owned()
}

pub fn absolutize_all(locations: Vec<String>, cwd: &Path) -> Vec<String> {
    locations
        .iter()
        .map(|location| absolutize(location, cwd))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn stdin_dash_matches_argv() {
        let from_stdin = collect(&args(&["-"]), Cursor::new("a.mp3\nb.mp3\n")).unwrap();
        let from_argv = collect(&args(&["a.mp3", "b.mp3"]), Cursor::new("")).unwrap();
        assert_eq!(from_stdin, from_argv);
    }

    #[test]
    fn stdin_skips_blank_lines_and_carriage_returns() {
        let locations =
            collect(&args(&["-"]), Cursor::new("a.mp3\r\n\n  \nsub dir/b.mp3")).unwrap();
        assert_eq!(locations, args(&["a.mp3", "sub dir/b.mp3"]));
    }

    #[test]
    fn dash_later_in_argv_is_a_plain_argument() {
        let locations = collect(&args(&["a.mp3", "-"]), Cursor::new("ignored\n")).unwrap();
        assert_eq!(locations, args(&["a.mp3", "-"]));
    }

    #[test]
    fn relative_paths_are_anchored() {
        let cwd = Path::new("/home/user/music");
        assert_eq!(absolutize("a.mp3", cwd), "/home/user/music/a.mp3");
        assert_eq!(absolutize("../other/b.mp3", cwd), "/home/user/other/b.mp3");
        assert_eq!(absolutize("/srv/c.flac", cwd), "/srv/c.flac");
        assert_eq!(
            absolutize("http://radio.example/stream", cwd),
            "http://radio.example/stream"
        );
        assert_eq!(absolutize("file:///srv/d.ogg", cwd), "file:///srv/d.ogg");
    }
}

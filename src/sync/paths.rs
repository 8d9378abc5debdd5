use std::path::{Component, Path, PathBuf};

/// Extension every downloaded audio file is saved with.
pub const AUDIO_EXTENSION: &str = "mp3";

/// Normalise a text field as VK serves it: strip surrounding spaces, then
/// decode HTML entities (`AC&amp;DC` → `AC&DC`).
pub fn clean_text(raw: &str) -> String {
    html_escape::decode_html_entities(raw.trim_matches(' ')).into_owned()
}

/// Replace path separators so a name stays a single path component.
pub fn sanitize_filename(name: &str) -> String {
    name.replace('/', "-")
}

/// `Artist - Title.mp3`, sanitized.
pub fn audio_filename(artist: &str, title: &str) -> String {
    sanitize_filename(&format!("{} - {}.{}", artist, title, AUDIO_EXTENSION))
}

/// Where an audio record lives locally: `root/album/filename`, or
/// `root/filename` when the album title is empty.
///
/// The album title is split on `/` and pushed component by component, with
/// empty, `.` and `..` components dropped, so the result always stays under
/// `root`.
pub fn target_path(root: &Path, album_title: &str, filename: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for component in album_title.split('/') {
        if !matches!(component, "" | "." | "..") {
            path.push(component);
        }
    }
    path.join(filename)
}

/// Album implied by a file's location: its parent directory relative to
/// `root`, components joined with `/`. Empty for files directly in `root`;
/// `None` for paths outside `root`.
pub fn local_album(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parent = relative.parent()?;
    let parts: Vec<String> = parent
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_trims_spaces_and_decodes() {
        assert_eq!(clean_text("  AC&amp;DC "), "AC&DC");
        assert_eq!(clean_text("Guns N&#39; Roses"), "Guns N' Roses");
        assert_eq!(clean_text("plain"), "plain");
    }

    #[test]
    fn test_clean_text_keeps_inner_whitespace() {
        assert_eq!(clean_text("\tTab "), "\tTab");
        assert_eq!(clean_text(" Two  Words "), "Two  Words");
    }

    #[test]
    fn test_audio_filename_replaces_slashes() {
        assert_eq!(audio_filename("A", "B"), "A - B.mp3");
        assert_eq!(audio_filename("AC/DC", "Back/In Black"), "AC-DC - Back-In Black.mp3");
    }

    #[test]
    fn test_target_path_without_album() {
        assert_eq!(
            target_path(Path::new("/m"), "", "A - B.mp3"),
            PathBuf::from("/m/A - B.mp3")
        );
    }

    #[test]
    fn test_target_path_with_album() {
        assert_eq!(
            target_path(Path::new("/m"), "Road Trip", "A - B.mp3"),
            PathBuf::from("/m/Road Trip/A - B.mp3")
        );
    }

    #[test]
    fn test_target_path_album_cannot_escape_root() {
        assert_eq!(
            target_path(Path::new("/m"), "/etc", "A - B.mp3"),
            PathBuf::from("/m/etc/A - B.mp3")
        );
        assert_eq!(
            target_path(Path::new("/m"), "Live/1999", "A - B.mp3"),
            PathBuf::from("/m/Live/1999/A - B.mp3")
        );
        assert_eq!(
            target_path(Path::new("/m/user"), "..", "A - B.mp3"),
            PathBuf::from("/m/user/A - B.mp3")
        );
        assert_eq!(
            target_path(Path::new("/m/user"), "../../etc", "A - B.mp3"),
            PathBuf::from("/m/user/etc/A - B.mp3")
        );
        assert_eq!(
            target_path(Path::new("/m"), "Best..Of/..", "A - B.mp3"),
            PathBuf::from("/m/Best..Of/A - B.mp3")
        );
    }

    #[test]
    fn test_local_album() {
        let root = Path::new("/m");
        assert_eq!(local_album(root, Path::new("/m/A - B.mp3")).as_deref(), Some(""));
        assert_eq!(local_album(root, Path::new("/m/old/A - B.mp3")).as_deref(), Some("old"));
        assert_eq!(
            local_album(root, Path::new("/m/Live/1999/A - B.mp3")).as_deref(),
            Some("Live/1999")
        );
        assert_eq!(local_album(root, Path::new("/elsewhere/A.mp3")), None);
    }

    #[test]
    fn test_local_album_round_trips_target_path() {
        let root = Path::new("/music/Ivan Petrov (id42, 42)");
        let path = target_path(root, "Live/1999", "A - B.mp3");
        assert_eq!(local_album(root, &path).as_deref(), Some("Live/1999"));
    }
}

//! M3U playlist rendering and the URLs that point back at the HTTP surface.

use crate::torrent::{InfoHash, flatten_display_path};

/// Path of the byte-range streaming endpoint.
pub const STREAM_PATH: &str = "/api/stream";
/// Path of the playlist endpoint.
pub const PLAY_PATH: &str = "/api/play";

const PLAYLIST_HEADER: &str = "#EXTM3U\n";

/// Relative URL streaming one file of a session.
pub fn stream_url(info_hash: &InfoHash, display_path: &str) -> String {
    format!(
        "{STREAM_PATH}?infohash={info_hash}&file={}",
        urlencoding::encode(display_path)
    )
}

/// Relative playlist URL carrying one `file=` parameter per display path.
///
/// With no paths the playlist covers every file of the session.
pub fn play_url<'a>(
    info_hash: &InfoHash,
    display_paths: impl IntoIterator<Item = &'a str>,
) -> String {
    let mut url = format!("{PLAY_PATH}?infohash={info_hash}");
    for path in display_paths {
        url.push_str("&file=");
        url.push_str(&urlencoding::encode(path));
    }
    url
}

/// Renders the two playlist lines for one file.
///
/// The label has path separators flattened to spaces so it stays on one line;
/// the URL carries the full display path as an escaped query value.
pub fn append_entry(scheme: &str, host: &str, info_hash: &InfoHash, display_path: &str) -> String {
    format!(
        "#EXTINF:-1,{}\n{scheme}://{host}{}\n",
        flatten_display_path(display_path),
        stream_url(info_hash, display_path)
    )
}

/// Playlist under construction for one session.
#[derive(Debug, Clone)]
pub struct Playlist {
    scheme: String,
    host: String,
    info_hash: InfoHash,
    body: String,
    entries: usize,
}

impl Playlist {
    /// Starts an empty playlist whose URLs point at `scheme://host`.
    pub fn new(scheme: &str, host: &str, info_hash: InfoHash) -> Self {
        Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            info_hash,
            body: PLAYLIST_HEADER.to_string(),
            entries: 0,
        }
    }

    pub fn push(&mut self, display_path: &str) {
        self.body.push_str(&append_entry(
            &self.scheme,
            &self.host,
            &self.info_hash,
            display_path,
        ));
        self.entries += 1;
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Suggested download name: `<infohash>.m3u`.
    pub fn file_name(&self) -> String {
        format!("{}.m3u", self.info_hash)
    }

    pub fn into_body(self) -> String {
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash() -> InfoHash {
        InfoHash::new([0x11; 20])
    }

    #[test]
    fn test_append_entry_format() {
        let entry = append_entry(
            "https",
            "media.local:1010",
            &hash(),
            "Show/Season 1/E01 & more.mkv",
        );
        let expected = format!(
            "#EXTINF:-1,Show Season 1 E01 & more.mkv\nhttps://media.local:1010/api/stream?infohash={}&file=Show%2FSeason%201%2FE01%20%26%20more.mkv\n",
            "11".repeat(20)
        );
        assert_eq!(entry, expected);
    }

    #[test]
    fn test_append_entry_is_pure() {
        let first = append_entry("http", "host", &hash(), "a/b.mp4");
        let second = append_entry("http", "host", &hash(), "a/b.mp4");
        assert_eq!(first, second);
    }

    #[test]
    fn test_playlist_accumulates_entries() {
        let mut playlist = Playlist::new("http", "localhost", hash());
        assert!(playlist.is_empty());
        playlist.push("one.mp4");
        playlist.push("dir/two.mp4");
        assert_eq!(playlist.len(), 2);
        assert_eq!(playlist.file_name(), format!("{}.m3u", "11".repeat(20)));

        let body = playlist.into_body();
        assert!(body.starts_with("#EXTM3U\n#EXTINF:-1,one.mp4\n"));
        assert!(body.contains("#EXTINF:-1,dir two.mp4\n"));
        assert_eq!(body.lines().count(), 5);
    }

    #[test]
    fn test_urls() {
        let ih = hash();
        assert_eq!(
            stream_url(&ih, "dir/a b.mkv"),
            format!("/api/stream?infohash={ih}&file=dir%2Fa%20b.mkv")
        );
        assert_eq!(play_url(&ih, []), format!("/api/play?infohash={ih}"));
        assert_eq!(
            play_url(&ih, ["a.mkv", "b c.mkv"]),
            format!("/api/play?infohash={ih}&file=a.mkv&file=b%20c.mkv")
        );
    }
}

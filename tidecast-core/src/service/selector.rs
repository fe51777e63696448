//! File selection against a session's advertised file list.

use crate::torrent::TorrentFile;

/// How a selector string is compared with display paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Byte-for-byte equality with the full display path.
    Exact,
    /// Case-insensitive substring of the display path.
    Contains,
    /// Every whitespace-separated token is a case-insensitive substring.
    AllTokens,
}

/// Returns the first file matching `selector`, in enumeration order.
///
/// Tolerant modes never match an empty (or all-whitespace) selector.
pub fn find_file<'a>(
    files: &'a [TorrentFile],
    selector: &str,
    mode: MatchMode,
) -> Option<&'a TorrentFile> {
    match mode {
        MatchMode::Exact => files.iter().find(|file| file.display_path == selector),
        MatchMode::Contains => {
            if selector.trim().is_empty() {
                return None;
            }
            let needle = selector.to_lowercase();
            files
                .iter()
                .find(|file| file.display_path.to_lowercase().contains(&needle))
        }
        MatchMode::AllTokens => {
            let needle = selector.to_lowercase();
            let tokens: Vec<&str> = needle.split_whitespace().collect();
            if tokens.is_empty() {
                return None;
            }
            files.iter().find(|file| {
                let haystack = file.display_path.to_lowercase();
                tokens.iter().all(|token| haystack.contains(token))
            })
        }
    }
}

/// Resolves each selector independently, dropping the ones that match nothing.
///
/// A file matched by several selectors is returned once, at its first match.
pub fn find_files<'a, S: AsRef<str>>(
    files: &'a [TorrentFile],
    selectors: &[S],
    mode: MatchMode,
) -> Vec<&'a TorrentFile> {
    let mut matched: Vec<&TorrentFile> = Vec::new();
    for selector in selectors {
        match find_file(files, selector.as_ref(), mode) {
            Some(file) if !matched.iter().any(|seen| seen.index == file.index) => {
                matched.push(file);
            }
            Some(_) => {}
            None => tracing::debug!("Selector {:?} matched no file", selector.as_ref()),
        }
    }
    matched
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn files(paths: &[&str]) -> Vec<TorrentFile> {
        paths
            .iter()
            .enumerate()
            .map(|(index, path)| TorrentFile {
                index,
                display_path: path.to_string(),
                length: 100,
                bytes_completed: 0,
                offset: index as u64 * 100,
            })
            .collect()
    }

    #[test]
    fn test_exact_requires_full_path() {
        let list = files(&["Season 1/Episode 01.mkv", "Episode 01.mkv"]);
        assert_eq!(
            find_file(&list, "Episode 01.mkv", MatchMode::Exact).map(|f| f.index),
            Some(1)
        );
        assert_eq!(
            find_file(&list, "Season 1/Episode 01.mkv", MatchMode::Exact).map(|f| f.index),
            Some(0)
        );
        assert!(find_file(&list, "episode 01.mkv", MatchMode::Exact).is_none());
        assert!(find_file(&list, "Season 1", MatchMode::Exact).is_none());
    }

    #[test]
    fn test_contains_is_case_insensitive_and_first_wins() {
        let list = files(&["Show/S01E01.mkv", "Show/S01E02.mkv", "Show/extras.nfo"]);
        assert_eq!(
            find_file(&list, "s01e02", MatchMode::Contains).map(|f| f.index),
            Some(1)
        );
        assert_eq!(
            find_file(&list, "SHOW", MatchMode::Contains).map(|f| f.index),
            Some(0)
        );
        assert!(find_file(&list, "s01 e02", MatchMode::Contains).is_none());
    }

    #[test]
    fn test_all_tokens_matches_out_of_order_words() {
        let list = files(&["Show/Season 1/Episode 02 - Pilot.mkv", "Show/readme.txt"]);
        assert_eq!(
            find_file(&list, "pilot  episode", MatchMode::AllTokens).map(|f| f.index),
            Some(0)
        );
        assert!(find_file(&list, "pilot readme", MatchMode::AllTokens).is_none());
    }

    #[test]
    fn test_empty_selector_never_matches_tolerant() {
        let list = files(&["a.mkv"]);
        assert!(find_file(&list, "", MatchMode::Contains).is_none());
        assert!(find_file(&list, "   ", MatchMode::Contains).is_none());
        assert!(find_file(&list, "", MatchMode::AllTokens).is_none());
        assert!(find_file(&list, " \t ", MatchMode::AllTokens).is_none());
    }

    #[test]
    fn test_find_files_skips_unmatched_and_duplicates() {
        let list = files(&["one.mkv", "two.mkv", "three.mkv"]);
        let matched = find_files(&list, &["two", "missing", "TWO", "one"], MatchMode::Contains);
        let indices: Vec<usize> = matched.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![1, 0]);
    }

    proptest! {
        #[test]
        fn prop_exact_matches_iff_some_path_equal(
            paths in proptest::collection::vec("[a-zA-Z0-9 ./]{1,12}", 1..6),
            selector in "[a-zA-Z0-9 ./]{0,12}",
        ) {
            let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
            let list = files(&refs);
            let found = find_file(&list, &selector, MatchMode::Exact);
            prop_assert_eq!(found.is_some(), paths.iter().any(|p| *p == selector));
            if let Some(file) = found {
                prop_assert_eq!(&file.display_path, &selector);
            }
        }

        #[test]
        fn prop_tolerant_ignores_selector_case(
            paths in proptest::collection::vec("[a-zA-Z0-9 ./]{1,12}", 1..6),
            selector in "[a-zA-Z0-9 ]{0,8}",
        ) {
            let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
            let list = files(&refs);
            for mode in [MatchMode::Contains, MatchMode::AllTokens] {
                let original = find_file(&list, &selector, mode).map(|f| f.index);
                let upper = find_file(&list, &selector.to_uppercase(), mode).map(|f| f.index);
                let lower = find_file(&list, &selector.to_lowercase(), mode).map(|f| f.index);
                prop_assert_eq!(original, upper);
                prop_assert_eq!(original, lower);
            }
        }
    }
}

//! Magnet link parsing and query merging.

use url::Url;

use super::{EngineError, InfoHash};

const BTIH_PREFIX: &str = "urn:btih:";

/// Parsed `magnet:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagnetLink {
    pub info_hash: InfoHash,
    pub display_name: Option<String>,
    pub trackers: Vec<String>,
}

impl MagnetLink {
    /// Parses a magnet URI carrying a hex `btih` exact topic.
    ///
    /// # Errors
    /// - `EngineError::InvalidMagnet` - Not a magnet URI, missing `xt`, or non-hex hash
    pub fn parse(magnet_uri: &str) -> Result<Self, EngineError> {
        let url = Url::parse(magnet_uri).map_err(|e| EngineError::InvalidMagnet {
            reason: e.to_string(),
        })?;
        if url.scheme() != "magnet" {
            return Err(EngineError::InvalidMagnet {
                reason: format!("unexpected scheme {:?}", url.scheme()),
            });
        }

        let mut info_hash = None;
        let mut display_name = None;
        let mut trackers = Vec::new();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "xt" => {
                    let Some(hash) = value.strip_prefix(BTIH_PREFIX) else {
                        continue;
                    };
                    info_hash = Some(InfoHash::from_hex(hash).map_err(|_| {
                        EngineError::InvalidMagnet {
                            reason: format!("unsupported btih value {hash:?}"),
                        }
                    })?);
                }
                "dn" if display_name.is_none() => display_name = Some(value.into_owned()),
                "tr" => trackers.push(value.into_owned()),
                _ => {}
            }
        }

        let info_hash = info_hash.ok_or_else(|| EngineError::InvalidMagnet {
            reason: "missing xt=urn:btih parameter".to_string(),
        })?;
        Ok(Self {
            info_hash,
            display_name,
            trackers,
        })
    }

    /// Renders the link back to a URI.
    pub fn to_uri(&self) -> String {
        let base = format!("magnet:?xt={BTIH_PREFIX}{}", self.info_hash);
        with_query_params(
            &base,
            self.display_name.iter().map(String::as_str),
            self.trackers.iter().map(String::as_str),
        )
    }
}

/// Appends escaped `dn` and `tr` parameters to a magnet URI.
pub fn with_query_params<'a>(
    magnet_uri: &str,
    display_names: impl IntoIterator<Item = &'a str>,
    trackers: impl IntoIterator<Item = &'a str>,
) -> String {
    let mut merged = magnet_uri.to_string();
    for name in display_names {
        merged.push_str("&dn=");
        merged.push_str(&urlencoding::encode(name));
    }
    for tracker in trackers {
        merged.push_str("&tr=");
        merged.push_str(&urlencoding::encode(tracker));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "cab507494d02ebb1178b38f2e9d7be299c86b862";

    #[test]
    fn test_parse_full_magnet() {
        let uri = format!(
            "magnet:?xt=urn:btih:{HASH}&dn=Big+Buck+Bunny&tr=udp%3A%2F%2Ftracker.example%3A1337&tr=http%3A%2F%2Fother%2Fannounce"
        );
        let link = MagnetLink::parse(&uri).unwrap();
        assert_eq!(link.info_hash.to_string(), HASH);
        assert_eq!(link.display_name.as_deref(), Some("Big Buck Bunny"));
        assert_eq!(
            link.trackers,
            vec!["udp://tracker.example:1337", "http://other/announce"]
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            MagnetLink::parse("not a uri"),
            Err(EngineError::InvalidMagnet { .. })
        ));
        assert!(matches!(
            MagnetLink::parse(&format!("http://example.com/?xt=urn:btih:{HASH}")),
            Err(EngineError::InvalidMagnet { .. })
        ));
        assert!(matches!(
            MagnetLink::parse("magnet:?dn=nothing"),
            Err(EngineError::InvalidMagnet { .. })
        ));
        assert!(matches!(
            MagnetLink::parse("magnet:?xt=urn:btih:MFRGGZDFMZTWQ2LKNNWG23TPOBYXE43U"),
            Err(EngineError::InvalidMagnet { .. })
        ));
    }

    #[test]
    fn test_with_query_params_escapes_values() {
        let merged = with_query_params(
            &format!("magnet:?xt=urn:btih:{HASH}"),
            ["My Show & Co"],
            ["udp://t.example:80/announce"],
        );
        assert_eq!(
            merged,
            format!(
                "magnet:?xt=urn:btih:{HASH}&dn=My%20Show%20%26%20Co&tr=udp%3A%2F%2Ft.example%3A80%2Fannounce"
            )
        );

        let link = MagnetLink::parse(&merged).unwrap();
        assert_eq!(link.display_name.as_deref(), Some("My Show & Co"));
        assert_eq!(link.trackers, vec!["udp://t.example:80/announce"]);
    }

    #[test]
    fn test_to_uri_parses_back() {
        let link = MagnetLink {
            info_hash: InfoHash::from_hex(HASH).unwrap(),
            display_name: Some("Sintel".to_string()),
            trackers: vec![],
        };
        assert_eq!(MagnetLink::parse(&link.to_uri()).unwrap(), link);
    }
}

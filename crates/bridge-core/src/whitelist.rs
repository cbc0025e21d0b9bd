//! URL whitelist built from registered API base URLs

use serde::Serialize;
use url::Url;

/// Outcome of a whitelist check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistMatch {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_base_url: Option<String>,
}

/// Check `url` against `base_urls`.
///
/// A base URL matches when its origin (scheme, host, port) equals the target's
/// and the target path starts with the base path. The first match wins;
/// unparseable entries are skipped.
pub fn validate<S: AsRef<str>>(url: &str, base_urls: &[S]) -> WhitelistMatch {
    let no_match = WhitelistMatch {
        valid: false,
        matched_base_url: None,
    };

    let Ok(target) = Url::parse(url) else {
        return no_match;
    };

    for base in base_urls {
        let base = base.as_ref();
        let Ok(parsed) = Url::parse(base) else {
            continue;
        };

        if parsed.origin() != target.origin() {
            continue;
        }

        let prefix = parsed.path().trim_end_matches('/');
        if target.path().starts_with(prefix) {
            return WhitelistMatch {
                valid: true,
                matched_base_url: Some(base.to_string()),
            };
        }
    }

    no_match
}

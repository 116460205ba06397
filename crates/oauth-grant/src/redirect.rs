//! Redirect URI policy
//!
//! Matching is coarse: only host and scheme are compared. A
//! requested `https` redirect matches a registered host under any scheme;
//! anything else needs the same scheme. Path, port, query and fragment are
//! ignored.

use url::Url;

/// Whether `redirect` is allowed by any of the `registered` URIs.
///
/// Registered entries that fail to parse or carry no host never match.
pub fn validate_redirect(redirect: &Url, registered: &[String]) -> bool {
    let Some(host) = redirect.host_str() else {
        return false;
    };
    registered
        .iter()
        .filter_map(|candidate| Url::parse(candidate).ok())
        .any(|candidate| {
            candidate.host_str() == Some(host)
                && (redirect.scheme() == "https" || redirect.scheme() == candidate.scheme())
        })
}

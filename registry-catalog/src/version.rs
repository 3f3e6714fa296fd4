//! Latest-version election comparator.

use chrono::{DateTime, Utc};

/// Whether a candidate version should take the latest flag from the current
/// holder.
///
/// Both versions are tried as semantic versions; when both parse, semver
/// precedence decides (pre-releases order below their release per SemVer
/// §11). Otherwise the candidate's proposed publish time is compared against
/// the stored one. Ties keep the existing latest.
pub fn candidate_is_newer(
    candidate_version: &str,
    candidate_published_at: DateTime<Utc>,
    current_version: &str,
    current_published_at: DateTime<Utc>,
) -> bool {
    match (
        semver::Version::parse(candidate_version),
        semver::Version::parse(current_version),
    ) {
        (Ok(candidate), Ok(current)) => candidate > current,
        _ => candidate_published_at > current_published_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn semver_precedence_decides_when_both_parse() {
        assert!(candidate_is_newer("1.0.0", at(0), "0.9.0", at(10)));
        assert!(!candidate_is_newer("0.9.0", at(10), "1.0.0", at(0)));
        assert!(candidate_is_newer("1.10.0", at(0), "1.9.0", at(0)));
    }

    #[test]
    fn prerelease_orders_below_release() {
        assert!(!candidate_is_newer("1.0.0-alpha", at(10), "1.0.0", at(0)));
        assert!(candidate_is_newer("1.0.0", at(0), "1.0.0-rc.1", at(10)));
        assert!(candidate_is_newer("1.0.0-beta", at(0), "1.0.0-alpha", at(10)));
        assert!(candidate_is_newer("1.0.0-rc.2", at(0), "1.0.0-rc.1", at(10)));
    }

    #[test]
    fn equal_precedence_keeps_existing_latest() {
        // Build metadata does not affect precedence; the incumbent stays.
        assert!(!candidate_is_newer("1.0.0+build.2", at(10), "1.0.0+build.1", at(0)));
    }

    #[test]
    fn falls_back_to_publish_time_for_opaque_versions() {
        assert!(candidate_is_newer("2024-06-01", at(10), "2024-05-01", at(0)));
        assert!(!candidate_is_newer("2024-05-01", at(0), "2024-06-01", at(10)));
        // Mixed: one side opaque forces the timestamp fallback.
        assert!(candidate_is_newer("nightly", at(10), "1.0.0", at(0)));
        // Equal timestamps keep the incumbent.
        assert!(!candidate_is_newer("nightly-b", at(0), "nightly-a", at(0)));
    }
}

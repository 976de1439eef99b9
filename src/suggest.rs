const HEADER_NAMES: &[&str] = &[
    "Accept",
    "Accept-Charset",
    "Accept-Encoding",
    "Accept-Language",
    "Authorization",
    "Cache-Control",
    "Connection",
    "Content-Length",
    "Content-Type",
    "Cookie",
    "Date",
    "Expect",
    "Forwarded",
    "From",
    "Host",
    "If-Match",
    "If-Modified-Since",
    "If-None-Match",
    "If-Range",
    "If-Unmodified-Since",
    "Origin",
    "Pragma",
    "Range",
    "Referer",
    "TE",
    "Upgrade",
    "User-Agent",
    "Via",
    "X-Forwarded-For",
    "X-Requested-With",
];

const HEADER_VALUES: &[(&str, &[&str])] = &[
    (
        "Accept",
        &[
            "*/*",
            "application/json",
            "application/xml",
            "text/html",
            "text/plain",
        ],
    ),
    (
        "Accept-Encoding",
        &["gzip", "deflate", "zstd", "gzip, deflate", "identity"],
    ),
    (
        "Cache-Control",
        &["no-cache", "no-store", "max-age=0", "must-revalidate"],
    ),
    ("Connection", &["keep-alive", "close"]),
    (
        "Content-Type",
        &[
            "application/json",
            "application/x-www-form-urlencoded",
            "application/xml",
            "multipart/form-data",
            "text/plain",
        ],
    ),
];

fn matching<'a>(candidates: &'a [&'a str], prefix: &str) -> Vec<&'a str> {
    let prefix = prefix.to_lowercase();
    candidates
        .iter()
        .copied()
        .filter(|c| c.to_lowercase().starts_with(&prefix))
        .collect()
}

/// Header names starting with `prefix`, ignoring case. An empty prefix lists
/// every known name.
pub fn header_names(prefix: &str) -> Vec<&'static str> {
    matching(HEADER_NAMES, prefix)
}

/// Common values of header `name` starting with `prefix`, ignoring case.
pub fn header_values(name: &str, prefix: &str) -> Vec<&'static str> {
    HEADER_VALUES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, values)| matching(values, prefix))
        .unwrap_or_default()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn header_names_should_match_prefix_ignoring_case() {
        assert_eq!(
            header_names("accept-"),
            vec!["Accept-Charset", "Accept-Encoding", "Accept-Language"]
        );
        assert_eq!(header_names("USER"), vec!["User-Agent"]);
        assert!(header_names("zzz").is_empty());
        assert_eq!(header_names("").len(), HEADER_NAMES.len());
    }

    #[test]
    fn header_values_should_depend_on_the_header_name() {
        assert_eq!(
            header_values("content-type", "application/x"),
            vec!["application/x-www-form-urlencoded", "application/xml"]
        );
        assert_eq!(header_values("Connection", ""), vec!["keep-alive", "close"]);
        assert!(header_values("X-Unknown", "").is_empty());
    }
}

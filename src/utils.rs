//! Small free functions shared across source variants.

/// Renders bytes as lowercase hex, the encoding used for both digests and
/// commit subjects.
pub fn hex_lower(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Deterministic URL-to-filename mapping used for repository mirror
/// directory names. A run of one or more consecutive slashes is dropped
/// entirely the first time it's encountered (so `scheme://host` keeps its
/// colon but loses the double slash), and every slash run after that is
/// collapsed to a single underscore.
pub fn uri_to_filename(uri: &str) -> String {
    let mut out = String::with_capacity(uri.len());
    let mut saw_slash = false;
    let mut saw_after_slash = false;

    for c in uri.chars() {
        if c == '/' {
            saw_slash = true;
            if saw_after_slash {
                out.push('_');
            }
            continue;
        } else if saw_slash {
            saw_after_slash = true;
        }
        out.push(c);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_double_slash_drops_with_no_underscore() {
        assert_eq!(uri_to_filename("https://github.com/foo/bar.git"), "https:github.com_foo_bar.git");
    }

    #[test]
    fn plain_path_unaffected_beyond_slash_replacement() {
        assert_eq!(uri_to_filename("foo/bar/baz"), "foo_bar_baz");
    }
}

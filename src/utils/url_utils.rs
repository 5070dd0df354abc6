//! URL normalization, glob matching, and safe filename derivation.
//!
//! These are the pure functions described as "URL utilities" in the design:
//! normalization never touches the host (that is the HTTP library's job),
//! glob matching recognises `*` and `**`, and filename derivation maps a
//! URL path to a unique, filesystem-safe `.md` name.

use url::Url;

/// Normalize a URL for use as a catalogue key.
///
/// Removes the query string and fragment, collapses duplicate path
/// separators, and strips a trailing separator unless the path is the
/// root. Does not lower-case the host or otherwise touch authority
/// components - that's left to the `url` crate / HTTP client.
#[must_use]
pub fn normalize_url(input: &str) -> Option<String> {
    let mut url = Url::parse(input).ok()?;
    url.set_query(None);
    url.set_fragment(None);

    let collapsed = collapse_path_separators(url.path());
    let trimmed = if collapsed.len() > 1 {
        collapsed.trim_end_matches('/')
    } else {
        collapsed.as_str()
    };
    let normalized_path = if trimmed.is_empty() { "/" } else { trimmed };
    url.set_path(normalized_path);

    Some(url.to_string())
}

fn collapse_path_separators(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    let mut prev_was_slash = false;
    for c in path.chars() {
        if c == '/' {
            if prev_was_slash {
                continue;
            }
            prev_was_slash = true;
        } else {
            prev_was_slash = false;
        }
        result.push(c);
    }
    result
}

/// Match a URL path against a glob pattern.
///
/// `*` matches any run of non-`/` characters; `**` matches any run
/// including `/`. The pattern `/**` matches every path, including `/`.
#[must_use]
pub fn glob_match(pattern: &str, path: &str) -> bool {
    glob_match_inner(pattern.as_bytes(), path.as_bytes())
}

fn glob_match_inner(pattern: &[u8], path: &[u8]) -> bool {
    // Split the pattern into literal/`*`/`**` tokens and match greedily
    // with backtracking - patterns are short, so this is cheap.
    fn is_double_star(pattern: &[u8], idx: usize) -> bool {
        pattern.get(idx) == Some(&b'*') && pattern.get(idx + 1) == Some(&b'*')
    }

    fn go(pattern: &[u8], pi: usize, path: &[u8], si: usize) -> bool {
        if pi == pattern.len() {
            return si == path.len();
        }
        if is_double_star(pattern, pi) {
            let rest = pi + 2;
            // `**` matches zero or more characters, including `/`.
            for cut in si..=path.len() {
                if go(pattern, rest, path, cut) {
                    return true;
                }
            }
            return go(pattern, rest, path, path.len());
        }
        if pattern[pi] == b'*' {
            let rest = pi + 1;
            for cut in si..=path.len() {
                if path[si..cut].contains(&b'/') {
                    break;
                }
                if go(pattern, rest, path, cut) {
                    return true;
                }
            }
            return false;
        }
        if si < path.len() && pattern[pi] == path[si] {
            return go(pattern, pi + 1, path, si + 1);
        }
        false
    }

    go(pattern, 0, path, 0)
}

/// Check whether any pattern in `patterns` matches `path`.
#[must_use]
pub fn matches_any(patterns: &[String], path: &str) -> bool {
    patterns.iter().any(|p| glob_match(p, path))
}

/// Sanitize every segment of a URL's path independently with
/// `sanitize_filename` (handling OS-reserved names and illegal characters
/// per segment), returning an empty vec for the root path.
fn sanitized_path_segments(url: &str) -> Vec<String> {
    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());

    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }

    trimmed
        .split('/')
        .filter(|s| !s.is_empty())
        .map(sanitize_filename::sanitize)
        .collect()
}

/// Derive a unique, case-preserving, filesystem-safe filename for a URL,
/// ending in `.md`. The empty path maps to `index.md`.
///
/// Each path segment is sanitized independently, then joined with `_`, so a
/// segment boundary never collides with a sanitized separator inside a
/// segment.
#[must_use]
pub fn safe_filename_for_url(url: &str) -> String {
    let segments = sanitized_path_segments(url);
    if segments.is_empty() {
        return "index.md".to_string();
    }

    let mut name = segments.join("_");
    if name.is_empty() {
        return "index.md".to_string();
    }

    if !name.to_lowercase().ends_with(".md") {
        name.push_str(".md");
    }
    name
}

/// Derive the on-disk path for a URL's Markdown file under `output_dir`.
///
/// When `flat` is `true`, every file lands directly in `output_dir` under
/// [`safe_filename_for_url`]'s underscore-joined name. When `false`, each
/// sanitized path segment becomes a nested directory under `output_dir`,
/// with the last segment as the `.md` filename (the empty path still maps
/// to `output_dir/index.md`); the caller is responsible for creating the
/// parent directories before writing.
#[must_use]
pub fn file_path_for_url(url: &str, output_dir: &std::path::Path, flat: bool) -> std::path::PathBuf {
    if flat {
        return output_dir.join(safe_filename_for_url(url));
    }

    let segments = sanitized_path_segments(url);
    if segments.is_empty() {
        return output_dir.join("index.md");
    }

    let mut path = output_dir.to_path_buf();
    for segment in &segments[..segments.len() - 1] {
        path.push(segment);
    }

    let mut last = segments[segments.len() - 1].clone();
    if !last.to_lowercase().ends_with(".md") {
        last.push_str(".md");
    }
    path.push(last);
    path
}

/// Check if a URL is a fetchable `http(s)` URL (not `data:`, `javascript:`, `mailto:`, etc).
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }
    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }
    matches!(Url::parse(url).map(|u| u.scheme().to_string()), Ok(s) if s == "http" || s == "https")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_query_and_fragment() {
        assert_eq!(
            normalize_url("https://example.com/a/b?x=1#frag").unwrap(),
            "https://example.com/a/b"
        );
    }

    #[test]
    fn collapses_duplicate_separators() {
        assert_eq!(
            normalize_url("https://example.com/a//b///c").unwrap(),
            "https://example.com/a/b/c"
        );
    }

    #[test]
    fn strips_trailing_separator_except_root() {
        assert_eq!(
            normalize_url("https://example.com/a/b/").unwrap(),
            "https://example.com/a/b"
        );
        assert_eq!(
            normalize_url("https://example.com/").unwrap(),
            "https://example.com/"
        );
    }

    #[test]
    fn does_not_lowercase_host() {
        assert_eq!(
            normalize_url("https://ExAmple.com/Path").unwrap(),
            "https://example.com/Path"
        );
    }

    #[test]
    fn star_matches_single_segment() {
        assert!(glob_match("/blog/*", "/blog/post-1"));
        assert!(!glob_match("/blog/*", "/blog/2024/post-1"));
    }

    #[test]
    fn double_star_matches_across_segments() {
        assert!(glob_match("/docs/**", "/docs/a/b/c"));
        assert!(glob_match("/**", "/"));
        assert!(glob_match("/**", "/any/depth/at/all"));
    }

    #[test]
    fn root_double_star_admits_every_path() {
        for p in ["/", "/a", "/a/b/c", "/a/b/c/d/e"] {
            assert!(glob_match("/**", p), "expected /** to admit {p}");
        }
    }

    #[test]
    fn safe_filename_maps_empty_path_to_index() {
        assert_eq!(safe_filename_for_url("https://example.com"), "index.md");
        assert_eq!(safe_filename_for_url("https://example.com/"), "index.md");
    }

    #[test]
    fn safe_filename_is_case_preserving_and_safe() {
        let name = safe_filename_for_url("https://example.com/Blog/Post One?.html");
        assert!(name.ends_with(".md"));
        assert!(name.contains("Blog"));
        assert!(!name.contains('?'));
        assert!(!name.contains(' '));
    }

    #[test]
    fn file_path_for_url_flat_matches_safe_filename() {
        let dir = std::path::Path::new("/out");
        let flat = file_path_for_url("https://example.com/blog/post", dir, true);
        assert_eq!(flat, dir.join(safe_filename_for_url("https://example.com/blog/post")));
    }

    #[test]
    fn file_path_for_url_nested_creates_directories_per_segment() {
        let dir = std::path::Path::new("/out");
        let nested = file_path_for_url("https://example.com/blog/post", dir, false);
        assert_eq!(nested, dir.join("blog").join("post.md"));
    }

    #[test]
    fn file_path_for_url_root_maps_to_index_in_both_modes() {
        let dir = std::path::Path::new("/out");
        assert_eq!(file_path_for_url("https://example.com/", dir, true), dir.join("index.md"));
        assert_eq!(file_path_for_url("https://example.com/", dir, false), dir.join("index.md"));
    }

    #[test]
    fn invalid_urls_are_rejected() {
        assert!(!is_valid_url("javascript:alert(1)"));
        assert!(!is_valid_url("mailto:a@b.com"));
        assert!(!is_valid_url(""));
        assert!(is_valid_url("https://example.com"));
    }
}

//! CDN delivery URL optimization.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::trace;

/// Default target width for optimized images.
pub const DEFAULT_WIDTH: u32 = 800;

/// Path segment that marks a transformation-capable CDN URL.
pub const UPLOAD_MARKER: &str = "/upload/";

/// Default capacity of the optimization memo.
pub const DEFAULT_MEMO_CAPACITY: usize = 256;

/// Everything after the width in a directive this module emits.
const DIRECTIVE_TAIL: &str = "f_auto,q_auto,c_limit";

/// Query parameters owned by the query-string rewrite.
const QUERY_KEYS: &[&str] = &["w", "q", "fm"];

/// How delivery URLs are rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnRules {
    /// Segment after which the transformation directive is inserted.
    pub upload_marker: String,
    /// Host fragments that take width/quality as query parameters.
    pub query_hosts: Vec<String>,
    /// Quality for query-string hosts.
    pub quality: u8,
    /// Output format for query-string hosts.
    pub format: String,
}

impl Default for CdnRules {
    fn default() -> Self {
        Self {
            upload_marker: UPLOAD_MARKER.to_string(),
            query_hosts: vec!["unsplash".to_string()],
            quality: 80,
            format: "webp".to_string(),
        }
    }
}

/// Rewrites `url` so the CDN delivers it at `width` pixels.
///
/// Upload-style URLs get `w_<width>,f_auto,q_auto,c_limit` inserted after the
/// marker; query-string hosts get `w`, `q` and `fm` parameters; everything
/// else is returned unchanged.
#[must_use]
pub fn optimize_url(url: &str, width: u32, rules: &CdnRules) -> String {
    if url.is_empty() {
        return String::new();
    }

    if let Some(rewritten) = rewrite_upload(url, width, &rules.upload_marker) {
        return rewritten;
    }

    if matches_query_host(url, &rules.query_hosts) {
        return rewrite_query(url, width, rules);
    }

    url.to_string()
}

fn rewrite_upload(url: &str, width: u32, marker: &str) -> Option<String> {
    if marker.is_empty() || url.matches(marker).count() != 1 {
        return None;
    }

    let (prefix, rest) = url.split_once(marker)?;

    // Only a directive of our own shape is replaced; folders such as
    // `e_cards` or `w_trip` are part of the asset path.
    let rest = match rest.split_once('/') {
        Some((segment, tail)) if is_emitted_directive(segment) => tail,
        _ => rest,
    };

    Some(format!("{prefix}{marker}w_{width},{DIRECTIVE_TAIL}/{rest}"))
}

/// True for `w_<digits>,f_auto,q_auto,c_limit`.
fn is_emitted_directive(segment: &str) -> bool {
    segment
        .strip_prefix("w_")
        .and_then(|s| s.split_once(','))
        .is_some_and(|(digits, tail)| {
            !digits.is_empty()
                && digits.bytes().all(|b| b.is_ascii_digit())
                && tail == DIRECTIVE_TAIL
        })
}

fn host_of(url: &str) -> &str {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
}

fn matches_query_host(url: &str, hosts: &[String]) -> bool {
    let host = host_of(url);
    !host.is_empty() && hosts.iter().any(|h| !h.is_empty() && host.contains(h.as_str()))
}

fn rewrite_query(url: &str, width: u32, rules: &CdnRules) -> String {
    let (url, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };
    let (base_url, existing_params) = match url.split_once('?') {
        Some((base, params)) => (base, Some(params)),
        None => (url, None),
    };

    let mut params = vec![
        format!("w={width}"),
        format!("q={}", rules.quality),
        format!("fm={}", rules.format),
    ];

    if let Some(existing) = existing_params {
        for param in existing.split('&').filter(|p| !p.is_empty()) {
            let key = param.split('=').next().unwrap_or("");
            if !QUERY_KEYS.contains(&key) {
                params.push(param.to_string());
            }
        }
    }

    let mut rewritten = format!("{}?{}", base_url, params.join("&"));
    if let Some(fragment) = fragment {
        rewritten.push('#');
        rewritten.push_str(fragment);
    }
    rewritten
}

/// Memoizing front for [`optimize_url`].
///
/// The memo is keyed by `(url, width)` and bounded by LRU eviction; it never
/// changes results.
pub struct UrlOptimizer {
    rules: CdnRules,
    memo: Mutex<LruCache<(String, u32), String>>,
}

impl UrlOptimizer {
    /// Creates an optimizer with the given rules and memo capacity.
    #[must_use]
    pub fn new(rules: CdnRules, memo_capacity: usize) -> Self {
        let cap = NonZeroUsize::new(memo_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            rules,
            memo: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Returns the rewrite rules.
    #[must_use]
    pub const fn rules(&self) -> &CdnRules {
        &self.rules
    }

    /// Returns the delivery URL of `url` at `width` pixels.
    pub fn optimize(&self, url: &str, width: u32) -> String {
        if url.is_empty() {
            return String::new();
        }

        let key = (url.to_string(), width);
        if let Some(hit) = self.memo.lock().get(&key) {
            return hit.clone();
        }

        let optimized = optimize_url(url, width, &self.rules);
        trace!(url = %url, width, optimized = %optimized, "Optimized delivery URL");
        self.memo.lock().put(key, optimized.clone());
        optimized
    }

    /// Number of memoized results.
    #[must_use]
    pub fn memo_len(&self) -> usize {
        self.memo.lock().len()
    }
}

impl Default for UrlOptimizer {
    fn default() -> Self {
        Self::new(CdnRules::default(), DEFAULT_MEMO_CAPACITY)
    }
}

impl std::fmt::Debug for UrlOptimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlOptimizer")
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const UPLOAD_URL: &str = "https://res.example.com/demo/upload/v1/photo.jpg";

    #[test]
    fn test_inserts_directive_after_upload_segment() {
        let optimized = optimize_url(UPLOAD_URL, 400, &CdnRules::default());

        assert_eq!(
            optimized,
            "https://res.example.com/demo/upload/w_400,f_auto,q_auto,c_limit/v1/photo.jpg"
        );
    }

    #[test]
    fn test_is_idempotent() {
        let rules = CdnRules::default();
        assert_eq!(
            optimize_url(UPLOAD_URL, 800, &rules),
            optimize_url(UPLOAD_URL, 800, &rules)
        );
    }

    #[test]
    fn test_reoptimizing_replaces_directive() {
        let rules = CdnRules::default();
        let small = optimize_url(UPLOAD_URL, 400, &rules);
        let large = optimize_url(&small, 1200, &rules);

        assert_eq!(large, optimize_url(UPLOAD_URL, 1200, &rules));
        assert_eq!(large.matches("w_").count(), 1);
    }

    #[test_case("my_photos/pic.jpg" ; "plain underscore folder")]
    #[test_case("e_cards/birthday.jpg" ; "effect shaped folder")]
    #[test_case("g_photos/beach.jpg" ; "gravity shaped folder")]
    #[test_case("w_trip/day1.jpg" ; "width shaped folder")]
    #[test_case("w_400,h_300/pic.jpg" ; "foreign directive")]
    #[test_case("w_400,f_auto,q_auto/pic.jpg" ; "truncated directive")]
    fn test_folder_after_marker_is_kept(path: &str) {
        let url = format!("https://res.cloudinary.com/demo/upload/{path}");
        let optimized = optimize_url(&url, 400, &CdnRules::default());

        assert_eq!(
            optimized,
            format!("https://res.cloudinary.com/demo/upload/w_400,f_auto,q_auto,c_limit/{path}")
        );
    }

    #[test_case("https://example.com/image.png" ; "unknown host")]
    #[test_case("https://example.com/a/upload/b/upload/c.png" ; "ambiguous marker")]
    #[test_case("not a url" ; "garbage")]
    fn test_pass_through(url: &str) {
        for width in [1, 400, 1200] {
            assert_eq!(optimize_url(url, width, &CdnRules::default()), url);
        }
    }

    #[test]
    fn test_empty_url() {
        assert_eq!(optimize_url("", 400, &CdnRules::default()), "");
    }

    #[test]
    fn test_query_host_appends_params() {
        let url = "https://images.unsplash.com/photo-123";
        let optimized = optimize_url(url, 800, &CdnRules::default());

        assert_eq!(optimized, "https://images.unsplash.com/photo-123?w=800&q=80&fm=webp");
    }

    #[test]
    fn test_query_host_preserves_other_params() {
        let url = "https://images.unsplash.com/photo-123?w=200&ixid=abc&fm=jpg";
        let optimized = optimize_url(url, 800, &CdnRules::default());

        assert!(optimized.starts_with("https://images.unsplash.com/photo-123?w=800&q=80&fm=webp"));
        assert!(optimized.contains("ixid=abc"));
        assert!(!optimized.contains("w=200"));
        assert!(!optimized.contains("fm=jpg"));
    }

    #[test]
    fn test_query_host_keeps_fragment_last() {
        let rules = CdnRules::default();

        assert_eq!(
            optimize_url("https://images.unsplash.com/photo-1#top", 400, &rules),
            "https://images.unsplash.com/photo-1?w=400&q=80&fm=webp#top"
        );
        assert_eq!(
            optimize_url("https://images.unsplash.com/photo-1?ixid=a&w=10#top", 400, &rules),
            "https://images.unsplash.com/photo-1?w=400&q=80&fm=webp&ixid=a#top"
        );
    }

    #[test]
    fn test_query_host_matches_host_only() {
        let url = "https://example.com/blog/unsplash-tips.png";
        assert_eq!(optimize_url(url, 800, &CdnRules::default()), url);
    }

    #[test]
    fn test_custom_rules() {
        let rules = CdnRules {
            upload_marker: "/media/".to_string(),
            query_hosts: vec!["imgix.net".to_string()],
            quality: 60,
            format: "avif".to_string(),
        };

        assert_eq!(
            optimize_url("https://cdn.test/media/a.jpg", 300, &rules),
            "https://cdn.test/media/w_300,f_auto,q_auto,c_limit/a.jpg"
        );
        assert_eq!(
            optimize_url("https://acme.imgix.net/a.jpg", 300, &rules),
            "https://acme.imgix.net/a.jpg?w=300&q=60&fm=avif"
        );
        assert_eq!(optimize_url(UPLOAD_URL, 300, &rules), UPLOAD_URL);
    }

    #[test]
    fn test_optimizer_memoizes_by_url_and_width() {
        let optimizer = UrlOptimizer::new(CdnRules::default(), 2);

        let first = optimizer.optimize(UPLOAD_URL, 400);
        let second = optimizer.optimize(UPLOAD_URL, 400);
        assert_eq!(first, second);
        assert_eq!(optimizer.memo_len(), 1);

        optimizer.optimize(UPLOAD_URL, 800);
        optimizer.optimize(UPLOAD_URL, 1200);
        assert_eq!(optimizer.memo_len(), 2);
        assert_eq!(optimizer.optimize(UPLOAD_URL, 400), first);
    }

    #[test]
    fn test_optimizer_passes_empty_url_through() {
        let optimizer = UrlOptimizer::default();
        assert_eq!(optimizer.optimize("", 800), "");
        assert_eq!(optimizer.memo_len(), 0);
    }
}

use http::Method;

/// The wildcard token used by route patterns unless overridden.
pub const DEFAULT_WILDCARD: &str = "*";

/// A method plus an ordered list of literal/wildcard segment specifiers.
///
/// Immutable once constructed. The wildcard token is part of the pattern, so
/// two patterns with different tokens can coexist in one table; a segment
/// equal to the token (case-insensitive) matches any single literal path
/// segment at that position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    path: String,
    methods: Vec<Method>,
    wildcard: String,
    segments: Vec<String>,
}

impl RoutePattern {
    /// Pattern matching a single method, with the default `*` wildcard token.
    #[must_use]
    pub fn new(path: &str, method: Method) -> Self {
        Self::with_methods(path, vec![method])
    }

    /// Pattern matching any of the given methods.
    #[must_use]
    pub fn with_methods(path: &str, methods: Vec<Method>) -> Self {
        Self {
            path: path.to_string(),
            methods,
            wildcard: DEFAULT_WILDCARD.to_string(),
            segments: split_segments(path),
        }
    }

    /// Override the wildcard token, e.g. to register a literal `*` segment.
    #[must_use]
    pub fn wildcard_token(mut self, token: &str) -> Self {
        self.wildcard = token.to_string();
        self
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    #[must_use]
    pub fn wildcard(&self) -> &str {
        &self.wildcard
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Positional match against a request's method and path segments.
    ///
    /// Matches iff the method is declared, the segment counts are equal, and
    /// every position is either an exact (ASCII case-insensitive) literal
    /// match or the wildcard token. A pattern of N segments only ever
    /// matches paths of exactly N segments.
    #[must_use]
    pub fn matches(&self, method: &Method, path_segments: &[&str]) -> bool {
        if !self.methods.contains(method) {
            return false;
        }
        if self.segments.len() != path_segments.len() {
            return false;
        }
        self.segments
            .iter()
            .zip(path_segments)
            .all(|(route_segment, path_segment)| {
                route_segment.eq_ignore_ascii_case(&self.wildcard)
                    || route_segment.eq_ignore_ascii_case(path_segment)
            })
    }

    /// Whether a route segment is this pattern's wildcard token.
    pub(crate) fn is_wildcard_segment(&self, segment: &str) -> bool {
        segment.eq_ignore_ascii_case(&self.wildcard)
    }
}

fn split_segments(path: &str) -> Vec<String> {
    path.trim_start_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_exact_literals_case_insensitively() {
        let pattern = RoutePattern::new("/users/list", Method::GET);
        assert!(pattern.matches(&Method::GET, &["users", "list"]));
        assert!(pattern.matches(&Method::GET, &["Users", "LIST"]));
        assert!(!pattern.matches(&Method::GET, &["users", "detail"]));
    }

    #[test]
    fn wildcard_matches_any_single_segment() {
        let pattern = RoutePattern::new("/users/*", Method::GET);
        assert!(pattern.matches(&Method::GET, &["users", "42"]));
        assert!(pattern.matches(&Method::GET, &["users", "anything"]));
    }

    #[test]
    fn segment_counts_must_match_exactly() {
        let pattern = RoutePattern::new("/users/*", Method::GET);
        assert!(!pattern.matches(&Method::GET, &["users"]));
        assert!(!pattern.matches(&Method::GET, &["users", "42", "posts"]));
    }

    #[test]
    fn method_must_be_declared() {
        let pattern = RoutePattern::new("/users", Method::GET);
        assert!(!pattern.matches(&Method::POST, &["users"]));

        let multi = RoutePattern::with_methods("/users", vec![Method::GET, Method::POST]);
        assert!(multi.matches(&Method::POST, &["users"]));
    }

    #[test]
    fn custom_wildcard_token_frees_the_literal_star() {
        let pattern = RoutePattern::new("/files/*", Method::GET).wildcard_token("__any__");
        // `*` is now a literal segment, not a wildcard.
        assert!(pattern.matches(&Method::GET, &["files", "*"]));
        assert!(!pattern.matches(&Method::GET, &["files", "readme"]));

        let wild = RoutePattern::new("/files/__any__", Method::GET).wildcard_token("__any__");
        assert!(wild.matches(&Method::GET, &["files", "readme"]));
    }

    #[test]
    fn root_pattern_matches_only_the_empty_path() {
        let pattern = RoutePattern::new("/", Method::GET);
        assert!(pattern.matches(&Method::GET, &[]));
        assert!(!pattern.matches(&Method::GET, &["users"]));
    }
}

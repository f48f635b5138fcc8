use crate::crawler::models::RawPage;

const VISITOR_COOKIE: &str = "JobseekerVisitorId";
const SESSION_COOKIE: &str = "JobseekerSessionId";
const DEFAULT_INCLUDE: &str = "seodata";

/// Cookies in the order the server sent them.
pub type CookieJar = Vec<(String, String)>;

/// Session continuity data echoed on the next request.
///
/// Built from a single response and never mutated: the driver swaps in a
/// fresh value after every fetch that came back with cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub user_query_id: String,
    pub visitor_id: String,
    pub session_id: String,
    pub event_session_id: String,
    pub had_premium_listings: bool,
    pub include: String,
    pub sol_id: String,
    pub page_size: Option<u32>,
    pub cookies: CookieJar,
}

impl SessionState {
    pub fn from_response(page: &RawPage, cookies: CookieJar) -> Self {
        let cookie = |name: &str| {
            cookies
                .iter()
                .rev()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };

        let search = page.search_params.as_ref();
        let pagination = page.pagination_parameters.as_ref();

        Self {
            user_query_id: page.user_query_id.clone().unwrap_or_default(),
            visitor_id: cookie(VISITOR_COOKIE),
            session_id: cookie(SESSION_COOKIE),
            event_session_id: cookie(SESSION_COOKIE),
            had_premium_listings: pagination
                .and_then(|p| p.had_premium_listings)
                .unwrap_or(true),
            include: search
                .and_then(|s| s.include.clone())
                .unwrap_or_else(|| DEFAULT_INCLUDE.to_string()),
            sol_id: search.and_then(|s| s.solid.clone()).unwrap_or_default(),
            page_size: pagination.and_then(|p| p.page_size),
            cookies,
        }
    }

    /// Next session after a successful fetch. Without new cookies the
    /// current session carries over untouched.
    pub fn advance(current: Option<Self>, page: &RawPage, new_cookies: CookieJar) -> Option<Self> {
        if new_cookies.is_empty() {
            current
        } else {
            Some(Self::from_response(page, new_cookies))
        }
    }

    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }

        Some(
            self.cookies
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// The session a response with no body metadata and no cookies would yield.
impl Default for SessionState {
    fn default() -> Self {
        Self::from_response(&RawPage::default(), Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::models::{PaginationParameters, SearchParams};

    fn jar(pairs: &[(&str, &str)]) -> CookieJar {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn page_with(query_id: &str, solid: Option<&str>, include: Option<&str>) -> RawPage {
        RawPage {
            user_query_id: Some(query_id.to_string()),
            search_params: Some(SearchParams {
                solid: solid.map(str::to_string),
                include: include.map(str::to_string),
            }),
            pagination_parameters: Some(PaginationParameters {
                had_premium_listings: Some(false),
                page_size: Some(20),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn derives_ids_from_body_and_cookies() {
        let page = page_with("uq-1", Some("sol-1"), Some("seodata,relatedsearches"));
        let state = SessionState::from_response(
            &page,
            jar(&[("JobseekerVisitorId", "visitor"), ("JobseekerSessionId", "sess")]),
        );

        assert_eq!(state.user_query_id, "uq-1");
        assert_eq!(state.visitor_id, "visitor");
        assert_eq!(state.session_id, "sess");
        assert_eq!(state.event_session_id, "sess");
        assert_eq!(state.sol_id, "sol-1");
        assert_eq!(state.include, "seodata,relatedsearches");
        assert!(!state.had_premium_listings);
        assert_eq!(state.page_size, Some(20));
    }

    #[test]
    fn absent_fields_take_defaults_not_older_values() {
        let first = SessionState::from_response(
            &page_with("uq-1", Some("sol-1"), Some("custom")),
            jar(&[("JobseekerVisitorId", "v1")]),
        );

        let bare = RawPage::default();
        let next = SessionState::advance(Some(first), &bare, jar(&[("other", "x")])).unwrap();

        assert_eq!(next.user_query_id, "");
        assert_eq!(next.visitor_id, "");
        assert_eq!(next.sol_id, "");
        assert_eq!(next.include, "seodata");
        assert!(next.had_premium_listings);
        assert_eq!(next.page_size, None);
        assert_eq!(next.cookies, jar(&[("other", "x")]));
    }

    #[test]
    fn no_new_cookies_keeps_previous_session() {
        let first = SessionState::from_response(
            &page_with("uq-1", Some("sol-1"), None),
            jar(&[("JobseekerSessionId", "s1")]),
        );

        let kept = SessionState::advance(
            Some(first.clone()),
            &page_with("uq-2", Some("sol-2"), None),
            Vec::new(),
        );
        assert_eq!(kept, Some(first));

        assert_eq!(SessionState::advance(None, &RawPage::default(), Vec::new()), None);
    }

    #[test]
    fn cookie_header_joins_pairs_in_order() {
        let state = SessionState::from_response(&RawPage::default(), jar(&[("a", "1"), ("b", "2")]));
        assert_eq!(state.cookie_header().as_deref(), Some("a=1; b=2"));

        let empty = SessionState::from_response(&RawPage::default(), Vec::new());
        assert_eq!(empty.cookie_header(), None);
    }

    #[test]
    fn default_session_uses_request_defaults() {
        let state = SessionState::default();

        assert_eq!(state, SessionState::from_response(&RawPage::default(), Vec::new()));
        assert!(state.had_premium_listings);
        assert_eq!(state.include, "seodata");
        assert_eq!(state.user_query_id, "");
        assert_eq!(state.cookie_header(), None);
    }
}

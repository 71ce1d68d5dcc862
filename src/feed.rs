use tracing::{debug, warn};

use crate::api::{ApiResult, FeedPage, FeedQuery, Post, Tab};
use crate::config::DEFAULT_PAGE_SIZE;

/// Ticket for one page fetch. The controller accepts a result only for the
/// ticket it handed out last, so anything issued before a tab switch is
/// dropped on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    generation: u64,
    query: FeedQuery,
}

impl PageRequest {
    pub fn query(&self) -> FeedQuery {
        self.query
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Idle,
    Loading,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Appended { added: usize, has_more: bool },
    /// Nothing changed; the next sentinel trigger may retry the same page.
    Failed,
    /// The result belonged to a superseded query and was ignored.
    Stale,
}

/// Tab-scoped infinite scroll over the feed API.
///
/// `cursor` is the next page index to fetch. At most one page request is
/// outstanding per tab activation; there is no queue and no retry.
#[derive(Debug)]
pub struct PaginationController {
    tab: Tab,
    page_size: u32,
    generation: u64,
    cursor: u32,
    posts: Vec<Post>,
    has_more: bool,
    in_flight: Option<PageRequest>,
    activated: bool,
}

impl Default for PaginationController {
    fn default() -> Self {
        Self::new(Tab::default(), DEFAULT_PAGE_SIZE)
    }
}

impl PaginationController {
    pub fn new(tab: Tab, page_size: u32) -> Self {
        Self {
            tab,
            page_size: if page_size == 0 {
                DEFAULT_PAGE_SIZE
            } else {
                page_size
            },
            generation: 0,
            cursor: 0,
            posts: Vec::new(),
            has_more: true,
            in_flight: None,
            activated: false,
        }
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn post_mut(&mut self, id: i64) -> Option<&mut Post> {
        self.posts.iter_mut().find(|post| post.id == id)
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn state(&self) -> FeedState {
        if self.in_flight.is_some() {
            FeedState::Loading
        } else if !self.has_more {
            FeedState::Exhausted
        } else {
            FeedState::Idle
        }
    }

    /// Makes `tab` the active stream and issues its first page. Selecting the
    /// tab that is already active does nothing.
    pub fn activate(&mut self, tab: Tab) -> Option<PageRequest> {
        if self.activated && self.tab == tab {
            return None;
        }
        self.activated = true;
        self.tab = tab;
        self.generation += 1;
        self.posts.clear();
        self.cursor = 0;
        self.has_more = true;
        if let Some(stale) = self.in_flight.take() {
            debug!(tab = %stale.query.tab, page = stale.query.page, "abandoning in-flight page");
        }
        self.request_next_page()
    }

    pub fn request_next_page(&mut self) -> Option<PageRequest> {
        if !self.activated || self.in_flight.is_some() || !self.has_more {
            return None;
        }
        let request = PageRequest {
            generation: self.generation,
            query: FeedQuery {
                tab: self.tab,
                page: self.cursor,
                size: self.page_size,
            },
        };
        self.in_flight = Some(request);
        Some(request)
    }

    pub fn complete(&mut self, request: PageRequest, result: ApiResult<FeedPage>) -> PageOutcome {
        if self.in_flight != Some(request)
            || request.generation != self.generation
            || request.query.tab != self.tab
            || request.query.page != self.cursor
        {
            debug!(
                tab = %request.query.tab,
                page = request.query.page,
                "dropping stale page"
            );
            return PageOutcome::Stale;
        }
        self.in_flight = None;

        match result {
            Ok(page) => {
                let added = page.items.len();
                self.posts.extend(page.items);
                self.has_more = !page.is_last_page;
                self.cursor += 1;
                PageOutcome::Appended {
                    added,
                    has_more: self.has_more,
                }
            }
            Err(err) => {
                warn!(
                    tab = %request.query.tab,
                    page = request.query.page,
                    "failed to load page: {err}"
                );
                PageOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;

    fn post(id: i64) -> Post {
        Post {
            id,
            title: format!("post {id}"),
            body: String::new(),
            thumbnail: None,
            author: "alice".into(),
            author_avatar: String::new(),
            external_url: format!("https://velog.io/@alice/{id}"),
            created_at: String::new(),
            likes: Some(0),
            comments: None,
        }
    }

    fn page(ids: std::ops::Range<i64>, last: bool) -> ApiResult<FeedPage> {
        Ok(FeedPage {
            items: ids.map(post).collect(),
            is_last_page: last,
        })
    }

    fn ids(ctrl: &PaginationController) -> Vec<i64> {
        ctrl.posts().iter().map(|p| p.id).collect()
    }

    #[test]
    fn nothing_happens_before_activation() {
        let mut ctrl = PaginationController::default();
        assert_eq!(ctrl.request_next_page(), None);
        assert_eq!(ctrl.state(), FeedState::Idle);
    }

    #[test]
    fn second_page_appends_in_order() {
        let mut ctrl = PaginationController::new(Tab::Trending, 20);
        let first = ctrl.activate(Tab::Trending).unwrap();
        assert_eq!(
            first.query(),
            FeedQuery {
                tab: Tab::Trending,
                page: 0,
                size: 20
            }
        );
        assert_eq!(
            ctrl.complete(first, page(0..20, false)),
            PageOutcome::Appended {
                added: 20,
                has_more: true
            }
        );

        let second = ctrl.request_next_page().unwrap();
        assert_eq!(second.query().page, 1);
        ctrl.complete(second, page(20..40, false));
        assert_eq!(ids(&ctrl), (0..40).collect::<Vec<_>>());
        assert_eq!(ctrl.cursor(), 2);
    }

    #[test]
    fn in_flight_guard_allows_one_request() {
        let mut ctrl = PaginationController::default();
        let first = ctrl.activate(Tab::Recent).unwrap();
        for _ in 0..5 {
            assert_eq!(ctrl.request_next_page(), None);
        }
        assert_eq!(ctrl.state(), FeedState::Loading);
        ctrl.complete(first, page(0..3, false));
        assert!(ctrl.request_next_page().is_some());
    }

    #[test]
    fn tab_switch_resets_before_first_fetch() {
        let mut ctrl = PaginationController::default();
        let first = ctrl.activate(Tab::Trending).unwrap();
        ctrl.complete(first, page(0..20, true));
        assert!(!ctrl.has_more());

        let curated = ctrl.activate(Tab::Curated).unwrap();
        assert!(ctrl.posts().is_empty());
        assert!(ctrl.has_more());
        assert_eq!(curated.query().page, 0);
        assert_eq!(curated.query().tab, Tab::Curated);
        assert_eq!(ctrl.cursor(), 0);
    }

    #[test]
    fn reselecting_active_tab_is_ignored() {
        let mut ctrl = PaginationController::default();
        let first = ctrl.activate(Tab::Trending).unwrap();
        ctrl.complete(first, page(0..5, false));
        assert_eq!(ctrl.activate(Tab::Trending), None);
        assert_eq!(ids(&ctrl).len(), 5);
    }

    #[test]
    fn late_response_from_old_tab_is_dropped() {
        let mut ctrl = PaginationController::default();
        let old = ctrl.activate(Tab::Trending).unwrap();
        let new = ctrl.activate(Tab::Feed).unwrap();

        assert_eq!(ctrl.complete(old, page(100..120, false)), PageOutcome::Stale);
        assert!(ctrl.posts().is_empty());
        assert!(ctrl.is_loading());

        ctrl.complete(new, page(0..2, true));
        assert_eq!(ids(&ctrl), vec![0, 1]);
    }

    #[test]
    fn switching_back_does_not_revive_old_ticket() {
        let mut ctrl = PaginationController::default();
        let old = ctrl.activate(Tab::Trending).unwrap();
        ctrl.activate(Tab::Curated);
        let fresh = ctrl.activate(Tab::Trending).unwrap();
        assert_eq!(old.query(), fresh.query());

        assert_eq!(ctrl.complete(old, page(0..20, false)), PageOutcome::Stale);
        assert!(ctrl.posts().is_empty());
        assert!(matches!(
            ctrl.complete(fresh, page(0..20, false)),
            PageOutcome::Appended { .. }
        ));
    }

    #[test]
    fn failure_keeps_cursor_and_allows_retry() {
        let mut ctrl = PaginationController::default();
        let first = ctrl.activate(Tab::Trending).unwrap();
        ctrl.complete(first, page(0..20, false));

        let second = ctrl.request_next_page().unwrap();
        assert_eq!(
            ctrl.complete(second, Err(ApiError::Status(503))),
            PageOutcome::Failed
        );
        assert_eq!(ctrl.cursor(), 1);
        assert!(ctrl.has_more());
        assert_eq!(ids(&ctrl).len(), 20);
        assert!(!ctrl.is_loading());

        let retry = ctrl.request_next_page().unwrap();
        assert_eq!(retry.query().page, 1);
    }

    #[test]
    fn last_page_exhausts_stream() {
        let mut ctrl = PaginationController::default();
        let first = ctrl.activate(Tab::Trending).unwrap();
        ctrl.complete(first, page(0..7, true));
        assert_eq!(ctrl.state(), FeedState::Exhausted);
        assert_eq!(ctrl.request_next_page(), None);
    }

    #[test]
    fn duplicate_ids_are_kept() {
        let mut ctrl = PaginationController::default();
        let first = ctrl.activate(Tab::Trending).unwrap();
        ctrl.complete(first, page(0..3, false));
        let second = ctrl.request_next_page().unwrap();
        ctrl.complete(second, page(2..4, true));
        assert_eq!(ids(&ctrl), vec![0, 1, 2, 2, 3]);
    }

    #[test]
    fn completing_twice_is_stale() {
        let mut ctrl = PaginationController::default();
        let first = ctrl.activate(Tab::Trending).unwrap();
        ctrl.complete(first, page(0..3, false));
        assert_eq!(ctrl.complete(first, page(0..3, false)), PageOutcome::Stale);
        assert_eq!(ids(&ctrl).len(), 3);
    }
}

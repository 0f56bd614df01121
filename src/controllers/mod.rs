pub mod actors;
pub mod genres;
pub mod performances;
pub mod plays;
pub mod reservations;
pub mod theatre_halls;
pub mod users;

use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::PaginationConfig;
use crate::store::{PageRequest, Paged};

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(genres::routes())
        .merge(actors::routes())
        .merge(theatre_halls::routes())
        .merge(plays::routes())
        .merge(performances::routes())
        .merge(reservations::routes())
        .nest("/user", users::routes())
}

/// Which shape of an entity a handler responds with. Listings flatten
/// related entities, detail views nest them, writes echo ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    List,
    Detail,
    Write,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    #[serde(alias = "pageSize")]
    pub page_size: Option<u32>,
}

impl PageParams {
    pub fn resolve(&self, config: &PaginationConfig) -> PageRequest {
        let page_size = self
            .page_size
            .unwrap_or(config.default_page_size)
            .clamp(1, config.max_page_size);
        PageRequest::new(self.page.unwrap_or(1), page_size)
    }
}

/// Paginated list envelope.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<u32>,
    pub previous: Option<u32>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new<U>(paged: Paged<U>, request: PageRequest, mut render: impl FnMut(U) -> T) -> Self {
        let seen = request.offset() + paged.items.len() as i64;
        Page {
            count: paged.count,
            next: (seen < paged.count).then_some(request.page + 1),
            previous: (request.page > 1).then_some(request.page - 1),
            results: paged.items.into_iter().map(&mut render).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_clamped_to_configured_maximum() {
        let config = PaginationConfig {
            default_page_size: 10,
            max_page_size: 50,
        };
        let params = PageParams {
            page: Some(0),
            page_size: Some(500),
        };
        assert_eq!(params.resolve(&config), PageRequest::new(1, 50));
        assert_eq!(PageParams::default().resolve(&config), PageRequest::new(1, 10));
    }

    #[test]
    fn envelope_links_neighbouring_pages() {
        let request = PageRequest::new(2, 2);
        let page = Page::new(
            Paged {
                count: 5,
                items: vec![3, 4],
            },
            request,
            |n| n * 10,
        );
        assert_eq!(page.results, vec![30, 40]);
        assert_eq!(page.next, Some(3));
        assert_eq!(page.previous, Some(1));
    }
}

//! Page-number pagination
//!
//! Lists come back as `{"count", "next", "previous", "results"}`. Pages are
//! 1-based and selected with `?page=N`; the links are relative and keep every
//! other query parameter.

use axum::http::Uri;
use serde::Serialize;

use super::error::{ApiError, DETAIL_INVALID_PAGE};

const PAGE_PARAM: &str = "page";

/// One page of a list response.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    /// Total records across all pages
    pub count: usize,
    /// Link to the following page
    pub next: Option<String>,
    /// Link to the preceding page
    pub previous: Option<String>,
    /// Records on this page
    pub results: Vec<T>,
}

/// A validated page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub number: usize,
    /// Records per page
    pub size: usize,
}

impl PageRequest {
    /// Parse the `page` query parameter. Absent means page 1.
    ///
    /// # Errors
    /// `NotFound("Invalid page.")` for anything but a positive integer.
    pub fn parse(raw: Option<&str>, size: usize) -> Result<Self, ApiError> {
        assert!(size > 0, "page size must be positive");

        let number = match raw {
            None => 1,
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(invalid_page)?,
        };
        Ok(Self { number, size })
    }

    /// Records to skip before this page.
    #[must_use]
    pub fn offset(&self) -> usize {
        (self.number - 1).saturating_mul(self.size)
    }

    /// Reject pages past the end. Page 1 always exists.
    ///
    /// # Errors
    /// `NotFound("Invalid page.")` when the page holds no records.
    pub fn check(&self, count: usize) -> Result<(), ApiError> {
        if self.number > 1 && self.offset() >= count {
            return Err(invalid_page());
        }
        Ok(())
    }

    /// Wrap `results` in the list envelope.
    #[must_use]
    pub fn into_page<T>(self, uri: &Uri, count: usize, results: Vec<T>) -> Page<T> {
        assert!(results.len() <= self.size, "page overflow");

        let next = (self.offset() + results.len() < count).then(|| link(uri, Some(self.number + 1)));
        let previous = (self.number > 1).then(|| {
            // Page 1 is the default, so its link drops the parameter.
            let target = self.number - 1;
            link(uri, (target > 1).then_some(target))
        });

        Page {
            count,
            next,
            previous,
            results,
        }
    }
}

fn invalid_page() -> ApiError {
    ApiError::NotFound(DETAIL_INVALID_PAGE.to_string())
}

/// Relative link to `uri` with the page parameter replaced.
fn link(uri: &Uri, page: Option<usize>) -> String {
    let mut params: Vec<String> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| pair.split('=').next() != Some(PAGE_PARAM))
        .map(str::to_string)
        .collect();
    if let Some(page) = page {
        params.push(format!("{PAGE_PARAM}={page}"));
    }

    if params.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), params.join("&"))
    }
}

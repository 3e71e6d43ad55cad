// src/models/pagination.rs

use serde::Deserialize;
use validator::Validate;

use crate::{
    error::AppError,
    models::friend_request::StatusFilter,
};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// A validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Validate)]
pub struct PageRequest {
    #[validate(range(min = 1, max = 100, message = "must be between 1 and 100"))]
    pub page: i64,
    #[validate(range(min = 1, max = 1000, message = "must be between 1 and 1000"))]
    pub page_size: i64,
}

impl PageRequest {
    /// Parses the raw `page` / `page_size` query values, applying defaults.
    ///
    /// Non-numeric input is a bad request; numbers out of range fail validation.
    pub fn parse(page: Option<&str>, page_size: Option<&str>) -> Result<Self, AppError> {
        let request = PageRequest {
            page: parse_int("page", page, DEFAULT_PAGE)?,
            page_size: parse_int("page_size", page_size, DEFAULT_PAGE_SIZE)?,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }
}

fn parse_int(name: &str, raw: Option<&str>, default: i64) -> Result<i64, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value
            .parse::<i64>()
            .map_err(|_| AppError::BadRequest(format!("{}, must be an integer", name))),
    }
}

fn trimmed(raw: Option<String>) -> String {
    raw.map(|s| s.trim().to_string()).unwrap_or_default()
}

/// `GET /users/recommended`
#[derive(Debug, Default, Deserialize)]
pub struct RecommendedParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl RecommendedParams {
    pub fn into_page(self) -> Result<PageRequest, AppError> {
        PageRequest::parse(self.page.as_deref(), self.page_size.as_deref())
    }
}

/// `GET /users/friends-with-me`
#[derive(Debug, Default, Deserialize)]
pub struct MyFriendsParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub search: Option<String>,
}

impl MyFriendsParams {
    pub fn into_query(self) -> Result<(PageRequest, String), AppError> {
        let page = PageRequest::parse(self.page.as_deref(), self.page_size.as_deref())?;
        Ok((page, trimmed(self.search)))
    }
}

/// Validated listing filter shared by the incoming and outgoing request feeds.
#[derive(Debug, Clone)]
pub struct RequestListQuery {
    pub page: PageRequest,
    pub status: StatusFilter,
    /// Name search applied to the counterpart of the request.
    pub search: String,
}

/// `GET /users/friends-request/from`
#[derive(Debug, Default, Deserialize)]
pub struct IncomingRequestParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub search_sender: Option<String>,
    pub status: Option<String>,
}

impl IncomingRequestParams {
    pub fn into_query(self) -> Result<RequestListQuery, AppError> {
        build_request_query(
            self.page.as_deref(),
            self.page_size.as_deref(),
            self.status.as_deref(),
            self.search_sender,
        )
    }
}

/// `GET /users/friends-request/send`
#[derive(Debug, Default, Deserialize)]
pub struct OutgoingRequestParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub search_recipient: Option<String>,
    pub status: Option<String>,
}

impl OutgoingRequestParams {
    pub fn into_query(self) -> Result<RequestListQuery, AppError> {
        build_request_query(
            self.page.as_deref(),
            self.page_size.as_deref(),
            self.status.as_deref(),
            self.search_recipient,
        )
    }
}

fn build_request_query(
    page: Option<&str>,
    page_size: Option<&str>,
    status: Option<&str>,
    search: Option<String>,
) -> Result<RequestListQuery, AppError> {
    let page = PageRequest::parse(page, page_size)?;
    let status = match status.map(str::trim) {
        None | Some("") => StatusFilter::All,
        Some(raw) => raw.parse::<StatusFilter>().map_err(|msg| {
            AppError::ValidationFailed([("status".to_string(), vec![msg])].into_iter().collect())
        })?,
    };

    Ok(RequestListQuery {
        page,
        status,
        search: trimmed(search),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::friend_request::FriendRequestStatus;

    #[test]
    fn defaults_apply_when_params_missing() {
        let page = PageRequest::parse(None, Some("")).unwrap();
        assert_eq!(page, PageRequest { page: 1, page_size: 10 });
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn offset_skips_previous_pages() {
        let page = PageRequest::parse(Some("3"), Some("10")).unwrap();
        assert_eq!(page.offset(), 20);
        assert_eq!(page.limit(), 10);
    }

    #[test]
    fn non_numeric_page_is_bad_request() {
        match PageRequest::parse(Some("two"), None) {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "page, must be an integer"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn out_of_range_page_size_fails_validation() {
        match PageRequest::parse(Some("1"), Some("1001")) {
            Err(AppError::ValidationFailed(fields)) => assert!(fields.contains_key("page_size")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            PageRequest::parse(Some("0"), None),
            Err(AppError::ValidationFailed(_))
        ));
    }

    #[test]
    fn page_is_capped_at_one_hundred() {
        assert_eq!(PageRequest::parse(Some("100"), Some("1000")).unwrap().offset(), 99_000);

        for page in ["101", "9223372036854775807"] {
            match PageRequest::parse(Some(page), Some("1000")) {
                Err(AppError::ValidationFailed(fields)) => {
                    assert_eq!(fields["page"], vec!["must be between 1 and 100".to_string()])
                }
                other => panic!("unexpected result for page={}: {:?}", page, other),
            }
        }
    }

    #[test]
    fn request_query_parses_status_and_trims_search() {
        let query = IncomingRequestParams {
            status: Some("Pending".into()),
            search_sender: Some("  ali ".into()),
            ..Default::default()
        }
        .into_query()
        .unwrap();

        assert_eq!(query.status, StatusFilter::Only(FriendRequestStatus::Pending));
        assert_eq!(query.search, "ali");
    }

    #[test]
    fn unknown_status_is_rejected() {
        let result = OutgoingRequestParams {
            status: Some("Rejected".into()),
            ..Default::default()
        }
        .into_query();
        assert!(matches!(result, Err(AppError::ValidationFailed(_))));
    }
}

//! Body, query and path extractors whose rejections are [`ApiError`]s, so
//! malformed input gets the same `{"code", "message"}` body as everything
//! else.

use axum::extract::{FromRequest, FromRequestParts};
use axum::response::{IntoResponse, Response};
use bazaar_core::pagination::PageRequest;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// `axum::Json` with an [`ApiError`] rejection. Also usable as a response.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl<T: Serialize> IntoResponse for ApiJson<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// `axum::extract::Query` with an [`ApiError`] rejection.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// `axum::extract::Path` with an [`ApiError`] rejection.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// `page` / `page_size` query parameters.
///
/// Endpoints with more filters repeat these two fields instead of using
/// `#[serde(flatten)]`, which breaks numeric parsing of query strings.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageParams {
    pub fn request(self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }

    pub fn request_with_default(self, default_size: u32) -> PageRequest {
        PageRequest::with_default_size(self.page, self.page_size, default_size)
    }
}

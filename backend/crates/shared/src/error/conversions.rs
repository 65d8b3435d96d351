//! Error conversions - HTTP response integration
//!
//! Converts [`AppError`] into an HTTP response. The body is the generic
//! reason phrase only; internal detail stays server-side in the logs.

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for super::app_error::AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::{StatusCode, header};

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.kind().as_str(),
        )
            .into_response()
    }
}

#[cfg(all(test, feature = "axum"))]
mod tests {
    use crate::error::app_error::AppError;
    use axum::response::IntoResponse;

    #[test]
    fn test_response_status_and_generic_body() {
        let response = AppError::internal("secret detail must not leak").into_response();
        assert_eq!(response.status(), 500);

        let response = AppError::not_found("missing").into_response();
        assert_eq!(response.status(), 404);
    }
}

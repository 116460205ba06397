//! HTTP error mapping
//!
//! Every failed request renders as `{"error": <kind>, "message": <display>}`
//! with a status derived from the error kind.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Grant(#[from] oauth_grant::Error),

    #[error("missing required parameter: {0}")]
    MissingParam(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        use oauth_grant::Error as E;
        match self {
            ApiError::MissingParam(_) => StatusCode::BAD_REQUEST,
            ApiError::Grant(err) => match err {
                E::UnsupportedGrantType(_) | E::InvalidRedirect(_) | E::InvalidGrantCode => {
                    StatusCode::BAD_REQUEST
                }
                E::InvalidAccessToken
                | E::InvalidRefreshToken
                | E::Expired
                | E::Verification(_)
                | E::ClientRejected(_) => StatusCode::UNAUTHORIZED,
                E::NotFound(_) | E::ClientNotFound(_) => StatusCode::NOT_FOUND,
                E::Storage(_) | E::Generator(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::MissingParam(_) => "invalid_request",
            ApiError::Grant(err) => err.kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oauth_grant::Error;

    #[test]
    fn status_mapping_follows_error_kind() {
        let cases = [
            (Error::UnsupportedGrantType("password".into()), StatusCode::BAD_REQUEST),
            (Error::InvalidRedirect("http://evil".into()), StatusCode::BAD_REQUEST),
            (Error::InvalidGrantCode, StatusCode::BAD_REQUEST),
            (Error::InvalidAccessToken, StatusCode::UNAUTHORIZED),
            (Error::InvalidRefreshToken, StatusCode::UNAUTHORIZED),
            (Error::Expired, StatusCode::UNAUTHORIZED),
            (Error::Verification("bad secret".into()), StatusCode::UNAUTHORIZED),
            (Error::ClientRejected("no".into()), StatusCode::UNAUTHORIZED),
            (Error::NotFound("k".into()), StatusCode::NOT_FOUND),
            (Error::ClientNotFound("9".into()), StatusCode::NOT_FOUND),
            (Error::Storage("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (Error::Generator("rng".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            let label = format!("{err:?}");
            assert_eq!(ApiError::from(err).status(), status, "{label}");
        }
        assert_eq!(
            ApiError::MissingParam("sid").status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn response_body_carries_kind_and_message() {
        let response = ApiError::MissingParam("sid").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "invalid_request");
        assert_eq!(json["message"], "missing required parameter: sid");
    }
}

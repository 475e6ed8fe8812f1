use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::json;

/// JSON body extractor for import requests
///
/// Accepts `application/json` (parameters such as charset allowed) or a
/// missing content type. Rejections use the import error envelope.
pub struct ImportJson<T>(pub T);

impl<T, S> FromRequest<S> for ImportJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ImportJsonRejection;

    async fn from_request(mut req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match req.headers().get(header::CONTENT_TYPE) {
            Some(content_type) => {
                let media_type = content_type
                    .to_str()
                    .map_err(|_| ImportJsonRejection::InvalidContentType)?
                    .split(';')
                    .next()
                    .unwrap_or("")
                    .trim()
                    .to_lowercase();

                if media_type != "application/json" {
                    return Err(ImportJsonRejection::InvalidContentType);
                }
            }
            None => {
                // Json refuses bodies without a content type
                req.headers_mut().insert(
                    header::CONTENT_TYPE,
                    header::HeaderValue::from_static("application/json"),
                );
            }
        }

        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ImportJson(value)),
            Err(rejection) => Err(ImportJsonRejection::JsonRejection(rejection)),
        }
    }
}

pub enum ImportJsonRejection {
    InvalidContentType,
    JsonRejection(JsonRejection),
}

impl ImportJsonRejection {
    pub fn message(&self) -> String {
        match self {
            ImportJsonRejection::InvalidContentType => {
                "Content-Type must be application/json".to_string()
            }
            ImportJsonRejection::JsonRejection(rejection) => {
                format!("Invalid JSON: {}", rejection.body_text())
            }
        }
    }
}

impl IntoResponse for ImportJsonRejection {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "errors": [{ "message": self.message() }]
        }));
        (StatusCode::BAD_REQUEST, body).into_response()
    }
}

// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! JSON request and response helpers

use axum::{
    body::Body,
    extract::{FromRequest, Request},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{BoxError, JsonError};

const JSON_MEDIA_TYPE: &str = "application/json";

/// Read a whole body and parse it as JSON
///
/// The body is consumed; nothing is parsed until every frame has been read.
pub async fn read_json<T, B>(body: B) -> Result<T, JsonError>
where
    T: DeserializeOwned,
    B: http_body::Body,
    B::Error: Into<BoxError>,
{
    let bytes = body
        .collect()
        .await
        .map_err(|err| JsonError::Read { source: err.into() })?
        .to_bytes();

    serde_json::from_slice(&bytes).map_err(|source| JsonError::Decode { source })
}

/// Serialize a value into a JSON response with the given status code
///
/// Serialization happens before anything else, so a value that cannot be
/// serialized yields an error and no response at all.
pub fn write_json<T>(status: StatusCode, value: &T) -> Result<Response, JsonError>
where
    T: Serialize + ?Sized,
{
    let bytes = serde_json::to_vec(value).map_err(|source| JsonError::Encode { source })?;

    let mut response = Response::new(Body::from(bytes));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(JSON_MEDIA_TYPE),
    );
    *response.status_mut() = status;
    Ok(response)
}

/// Extractor that reads the request body with [`read_json`]
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = JsonError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        read_json(req.into_body()).await.map(JsonBody)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::BTreeMap,
        io,
        pin::Pin,
        task::{Context, Poll},
    };

    use axum::{Router, body::Bytes, http::Method, routing::post};
    use http_body::Frame;
    use serde::{Deserialize, Serializer};
    use tower::ServiceExt;

    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Item {
        name: String,
        count: u32,
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("refusing to serialize"))
        }
    }

    /// Body whose first frame fails
    struct FailingBody;

    impl http_body::Body for FailingBody {
        type Data = Bytes;
        type Error = io::Error;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
            Poll::Ready(Some(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset",
            ))))
        }
    }

    #[tokio::test]
    async fn reads_json_body() {
        let item: Item = read_json(Body::from(r#"{"name": "apple", "count": 3}"#))
            .await
            .unwrap();
        assert_eq!(
            item,
            Item {
                name: "apple".to_string(),
                count: 3,
            }
        );
    }

    #[tokio::test]
    async fn read_failure_is_reported() {
        let err = read_json::<Item, _>(FailingBody).await.unwrap_err();
        assert!(matches!(err, JsonError::Read { .. }));
        assert_eq!(err.to_string(), "unable to read the data: connection reset");
    }

    #[tokio::test]
    async fn malformed_json_is_a_decode_error() {
        let err = read_json::<Item, _>(Body::from("{invalid json"))
            .await
            .unwrap_err();
        assert!(matches!(err, JsonError::Decode { .. }));

        let err = read_json::<Item, _>(Body::from(r#"{"name": "apple"}"#))
            .await
            .unwrap_err();
        assert!(matches!(err, JsonError::Decode { .. }));
    }

    #[tokio::test]
    async fn writes_json_response() {
        let response = write_json(
            StatusCode::CREATED,
            &Item {
                name: "pear".to_string(),
                count: 7,
            },
        )
        .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], JSON_MEDIA_TYPE);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"name":"pear","count":7}"#);
    }

    #[test]
    fn encode_failure_produces_no_response() {
        let err = write_json(StatusCode::OK, &Unserializable).unwrap_err();
        assert!(matches!(err, JsonError::Encode { .. }));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let mut non_string_keys = BTreeMap::new();
        non_string_keys.insert(vec![1_u8], "value");
        let err = write_json(StatusCode::OK, &non_string_keys).unwrap_err();
        assert!(matches!(err, JsonError::Encode { .. }));
    }

    #[tokio::test]
    async fn extractor_round_trips_through_a_handler() {
        let app = Router::new().route(
            "/items",
            post(|JsonBody(item): JsonBody<Item>| async move {
                write_json(StatusCode::OK, &item)
            }),
        );

        let request = Request::builder()
            .method(Method::POST)
            .uri("/items")
            .body(Body::from(r#"{"name": "plum", "count": 1}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bad = Request::builder()
            .method(Method::POST)
            .uri("/items")
            .body(Body::from("not json"))
            .unwrap();
        let response = Router::new()
            .route(
                "/items",
                post(|JsonBody(item): JsonBody<Item>| async move { item.name }),
            )
            .oneshot(bad)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

//! HTTP helpers for API Gateway Lambda functions.

use lambda_http::{Body, Response};
use serde::Serialize;

use crate::models::MessageBody;

/// Create a JSON response with the given status code and data.
pub fn json_response<T: Serialize>(status: u16, data: &T) -> Result<Response<Body>, lambda_http::Error> {
    let response = Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(data)?))?;
    Ok(response)
}

/// Create the `{"message": ...}` response both APIs answer with.
pub fn message_response(message: impl Into<String>) -> Result<Response<Body>, lambda_http::Error> {
    json_response(200, &MessageBody::new(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_response() {
        let response = message_response("hello").unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()["content-type"], "application/json");

        let body: MessageBody = serde_json::from_slice(response.body().as_ref()).unwrap();
        assert_eq!(body.message, "hello");
    }
}

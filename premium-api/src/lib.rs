//! Premium content served behind the Cognito authorizer.
//!
//! API Gateway has already checked the caller's token and scope by the time a
//! request gets here; the function only answers per HTTP method.

use lambda_http::{Body, Error, Request, Response};
use shared::http::message_response;
use shared::FALLBACK_MESSAGE;
use tracing::{error, info};

pub const READ_CONTENT: &str = "Premium Content: OAuth Scope: Read";
pub const WRITE_CONTENT: &str = "Premium Content: OAuth Scope: Write";

/// Content for an HTTP method, `None` for methods the API does not expose.
pub fn premium_content(method: &str) -> Option<&'static str> {
    match method {
        "GET" => Some(READ_CONTENT),
        "POST" => Some(WRITE_CONTENT),
        _ => None,
    }
}

pub async fn handler(event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();
    info!(http_method = method, path = event.uri().path(), "Received premium content request");

    let message = match premium_content(method) {
        Some(content) => {
            info!("{}", content);
            content
        }
        None => {
            error!("Unsupported method: {}", method);
            FALLBACK_MESSAGE
        }
    };

    message_response(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lambda_http::http::Method;
    use shared::MessageBody;

    async fn call(method: Method) -> MessageBody {
        let request = lambda_http::http::Request::builder()
            .method(method)
            .uri("https://api.example.com/prod/home/premium")
            .body(Body::Empty)
            .unwrap();
        let response = handler(request).await.unwrap();
        assert_eq!(response.status(), 200);
        serde_json::from_slice(response.body().as_ref()).unwrap()
    }

    #[test]
    fn test_content_per_method() {
        assert_eq!(premium_content("GET"), Some(READ_CONTENT));
        assert_eq!(premium_content("POST"), Some(WRITE_CONTENT));
        assert_eq!(premium_content("DELETE"), None);
    }

    #[tokio::test]
    async fn test_get_returns_read_content() {
        assert_eq!(call(Method::GET).await.message, READ_CONTENT);
    }

    #[tokio::test]
    async fn test_post_returns_write_content() {
        assert_eq!(call(Method::POST).await.message, WRITE_CONTENT);
    }

    #[tokio::test]
    async fn test_unsupported_method_falls_back() {
        assert_eq!(
            call(Method::PUT).await.message,
            "Something Obviously went wrong, Let me check"
        );
    }
}

//! Delivery of the custom resource outcome to CloudFormation.

use shared::{Error, Result};
use tracing::info;

use crate::event::CustomResourceResponse;

/// Upload the response document to the pre-signed S3 URL.
///
/// The URL is signed without a content type, so the header must be sent empty.
pub async fn send_response(
    http_client: &reqwest::Client,
    response_url: &str,
    response: &CustomResourceResponse,
) -> Result<()> {
    let body = serde_json::to_string(response)?;

    let result = http_client
        .put(response_url)
        .header("content-type", "")
        .body(body)
        .send()
        .await?;

    let status = result.status();
    if !status.is_success() {
        let error_text = result.text().await.unwrap_or_default();
        return Err(Error::Aws(format!(
            "Response upload rejected ({}): {}",
            status, error_text
        )));
    }

    info!(status = ?response.status, physical_id = %response.physical_resource_id, "Sent custom resource response");
    Ok(())
}

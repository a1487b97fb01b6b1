//! CloudFormation custom resource request and response documents.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Lifecycle event CloudFormation is asking us to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
    #[serde(other)]
    Unknown,
}

/// Request delivered to the custom resource provider function.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceRequest {
    pub request_type: RequestType,
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    pub stack_id: String,
    pub request_id: String,
    #[serde(default)]
    pub resource_type: String,
    pub logical_resource_id: String,
    #[serde(default)]
    pub physical_resource_id: Option<String>,
    #[serde(default)]
    pub resource_properties: serde_json::Value,
}

impl CustomResourceRequest {
    /// Stack name, parsed from the `StackId` ARN
    /// (`arn:aws:cloudformation:<region>:<account>:stack/<name>/<guid>`).
    pub fn stack_name(&self) -> &str {
        self.stack_id.rsplit('/').nth(1).unwrap_or(&self.stack_id)
    }

    /// `UserPoolId` property, if present.
    pub fn user_pool_id(&self) -> Option<&str> {
        self.resource_properties
            .get("UserPoolId")
            .and_then(serde_json::Value::as_str)
            .filter(|id| !id.is_empty())
    }
}

/// Properties of the `Custom::AppClientSecrets` resource.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecretProperties {
    pub user_pool_id: String,
    pub user_pool_client_id: String,
    pub user_pool_oauth2_endpoint: String,
    pub resource_server_identifier: String,
    pub read_scope: String,
    pub write_scope: String,
    /// Test hook: makes Create report failure
    #[serde(default, deserialize_with = "truthy")]
    pub fail_create: bool,
}

/// CloudFormation passes every property as a string, templates may also carry booleans.
fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// Document uploaded to the pre-signed response URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceResponse {
    pub status: ResponseStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub no_echo: bool,
    pub data: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn request_json(request_type: &str) -> serde_json::Value {
        serde_json::json!({
            "RequestType": request_type,
            "ResponseURL": "https://cloudformation-custom-resource-response.s3.amazonaws.com/presigned",
            "StackId": "arn:aws:cloudformation:us-east-1:123456789012:stack/cognito-identity-provider/5b1c2e60-0000",
            "RequestId": "req-1",
            "ResourceType": "Custom::AppClientSecrets",
            "LogicalResourceId": "AppClientSecrets",
            "ResourceProperties": {
                "ServiceToken": "arn:aws:lambda:us-east-1:123456789012:function:retriever",
                "UserPoolId": "us-east-1_Pool",
                "UserPoolClientId": "client-1",
                "UserPoolOauth2Endpoint": "https://example.auth.us-east-1.amazoncognito.com/oauth2/token",
                "ResourceServerIdentifier": "premium_api",
                "ReadScope": "read",
                "WriteScope": "write"
            }
        })
    }

    #[test]
    fn test_parse_request() {
        let request: CustomResourceRequest = serde_json::from_value(request_json("Create")).unwrap();
        assert_eq!(request.request_type, RequestType::Create);
        assert_eq!(request.stack_name(), "cognito-identity-provider");
        assert_eq!(request.user_pool_id(), Some("us-east-1_Pool"));
        assert!(request.physical_resource_id.is_none());

        let props: SecretProperties = serde_json::from_value(request.resource_properties).unwrap();
        assert_eq!(props.user_pool_oauth2_endpoint, "https://example.auth.us-east-1.amazoncognito.com/oauth2/token");
        assert!(!props.fail_create);
    }

    #[test]
    fn test_unknown_request_type() {
        let request: CustomResourceRequest = serde_json::from_value(request_json("Rollback")).unwrap();
        assert_eq!(request.request_type, RequestType::Unknown);
    }

    #[test]
    fn test_fail_create_accepts_strings() {
        let mut json = request_json("Create");
        json["ResourceProperties"]["FailCreate"] = serde_json::json!("True");
        let request: CustomResourceRequest = serde_json::from_value(json).unwrap();
        let props: SecretProperties = serde_json::from_value(request.resource_properties).unwrap();
        assert!(props.fail_create);
    }

    #[test]
    fn test_response_document_keys() {
        let response = CustomResourceResponse {
            status: ResponseStatus::Failed,
            reason: "boom".to_string(),
            physical_resource_id: "cognito_p".to_string(),
            stack_id: "s".to_string(),
            request_id: "r".to_string(),
            logical_resource_id: "l".to_string(),
            no_echo: false,
            data: BTreeMap::new(),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["Status"], "FAILED");
        assert_eq!(value["PhysicalResourceId"], "cognito_p");
        assert_eq!(value["NoEcho"], false);
        assert!(value["Data"].as_object().unwrap().is_empty());
    }
}

#[cfg(test)]
pub(crate) use tests::request_json;

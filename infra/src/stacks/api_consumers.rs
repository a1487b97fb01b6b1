//! Content consumers: a public API whose function brokers tokens for the premium API.

use serde_json::json;

use super::{
    add_api_resource, add_artifact_bucket, add_function, add_rest_api, add_stage, api_url,
    exports, proxy_integration, FunctionSpec, StackSettings,
};
use crate::template::intrinsic::{get_att, import_value, reference};
use crate::template::{Output, Resource, Template};
use crate::Result;

const API: &str = "ContentConsumersApi";

/// (resource logical id, path part, output name)
const ROUTES: [(&str, &str, &str); 3] = [
    ("UnauthorizedRead", "unauthorized-read", "UnauthorizedUrl"),
    ("AuthorizedRead", "authorized-read", "GetAuthorizedUrl"),
    ("AuthorizedWrite", "authorized-write", "PostAuthorizedUrl"),
];

pub fn template(settings: &StackSettings) -> Result<Template> {
    let mut t = Template::new("Content Consumers Stack to Access Premium Content");
    add_artifact_bucket(&mut t, settings)?;

    let function = FunctionSpec {
        id: "ContentConsumers",
        function_name: Some("content_consumers"),
        binary: "content_consumers",
        timeout_secs: 3,
        environment: json!({
            "LOG_LEVEL": "DEBUG",
            "Environment": "Production",
            "USER_POOL_SECRETS_ARN": import_value(exports::SECRETS_ARN),
            "PREMIUM_CONTENT_API_URL": import_value(exports::PREMIUM_API_URL)
        }),
        statements: vec![json!({
            "Sid": "AllowLambdaToReadSecrets",
            "Effect": "Allow",
            "Action": ["secretsmanager:GetSecretValue"],
            "Resource": import_value(exports::SECRETS_ARN)
        })],
    };
    add_function(&mut t, &function)?;
    let function_id = function.function_id();

    add_rest_api(&mut t, API, "content-consumers-api", &function_id)?;
    add_api_resource(&mut t, "ContentResource", API, get_att(API, "RootResourceId"), "content")?;

    // the write path is a GET too: the function decides the downstream verb
    let mut methods = Vec::new();
    for (id, path_part, _) in ROUTES {
        let resource_id = format!("{}Resource", id);
        let method_id = format!("{}Method", id);
        add_api_resource(&mut t, &resource_id, API, reference("ContentResource"), path_part)?;
        t.add_resource(
            &method_id,
            Resource::new(
                "AWS::ApiGateway::Method",
                json!({
                    "RestApiId": reference(API),
                    "ResourceId": reference(&resource_id),
                    "HttpMethod": "GET",
                    "AuthorizationType": "NONE",
                    "Integration": proxy_integration(&function_id)
                }),
            ),
        )?;
        methods.push(method_id);
    }

    let method_refs: Vec<&str> = methods.iter().map(String::as_str).collect();
    let stage_id = add_stage(&mut t, API, "live", &method_refs)?;

    for (_, path_part, output) in ROUTES {
        t.add_output(
            output,
            Output::new(
                api_url(API, &stage_id, &format!("/content/{}", path_part)),
                "Use a browser to access this url",
            ),
        )?;
    }

    t.validate()?;
    Ok(t)
}

//! Stack definitions and the building blocks they share.

pub mod api_consumers;
pub mod identity_provider;
pub mod premium_api;

use serde_json::{json, Value};

use crate::template::intrinsic::{get_att, reference, sub};
use crate::template::{Parameter, Resource, Template};
use crate::Result;

pub const IDENTITY_STACK: &str = "cognito-identity-provider";
pub const PREMIUM_STACK: &str = "premium-content-provider";
pub const CONSUMERS_STACK: &str = "content-consumers-stack";

/// Exports connecting the stacks.
pub mod exports {
    pub const SECRETS_ARN: &str = "cognito-identity-provider-AppPoolSecretsArn";
    pub const USER_POOL_ARN: &str = "cognito-identity-provider-UserPoolArn";
    pub const PREMIUM_API_URL: &str = "premium-content-provider-PremiumApiUrl";
}

/// OAuth resource server and scopes shared by the identity pool and the premium API.
pub const RESOURCE_SERVER_IDENTIFIER: &str = "premium_api";
pub const READ_SCOPE: &str = "read";
pub const WRITE_SCOPE: &str = "write";

pub fn full_scope(scope: &str) -> String {
    format!("{}/{}", RESOURCE_SERVER_IDENTIFIER, scope)
}

pub const ARTIFACT_BUCKET_PARAM: &str = "ArtifactBucket";

/// Settings every stack is built from.
#[derive(Debug, Clone)]
pub struct StackSettings {
    /// Prefix of the hosted Cognito auth domain
    pub domain_prefix: String,
    /// Default bucket holding the function zips
    pub artifact_bucket: String,
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            domain_prefix: "premium-content".to_string(),
            artifact_bucket: "premium-content-artifacts".to_string(),
        }
    }
}

pub(crate) fn add_artifact_bucket(template: &mut Template, settings: &StackSettings) -> Result<()> {
    template.add_parameter(
        ARTIFACT_BUCKET_PARAM,
        Parameter::string(
            "Bucket holding the Lambda zips",
            Some(settings.artifact_bucket.as_str()),
        ),
    )
}

/// One Rust Lambda function with its role and log group.
pub(crate) struct FunctionSpec<'a> {
    /// Logical id prefix, e.g. `PremiumContent`
    pub id: &'a str,
    /// Fixed function name, if any
    pub function_name: Option<&'a str>,
    /// Binary name; the artifact is `<binary>.zip`
    pub binary: &'a str,
    pub timeout_secs: u32,
    pub environment: Value,
    /// Extra IAM statements on top of basic execution
    pub statements: Vec<Value>,
}

impl FunctionSpec<'_> {
    pub fn function_id(&self) -> String {
        format!("{}Function", self.id)
    }
}

/// Adds `<id>Role`, `<id>Function` and `<id>LogGroup`.
pub(crate) fn add_function(template: &mut Template, spec: &FunctionSpec<'_>) -> Result<()> {
    let role_id = format!("{}Role", spec.id);
    let function_id = spec.function_id();

    let mut role_properties = json!({
        "AssumeRolePolicyDocument": {
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Principal": { "Service": "lambda.amazonaws.com" },
                "Action": "sts:AssumeRole"
            }]
        },
        "ManagedPolicyArns": [
            sub("arn:${AWS::Partition}:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole")
        ]
    });
    if !spec.statements.is_empty() {
        role_properties["Policies"] = json!([{
            "PolicyName": format!("{}Policy", spec.id),
            "PolicyDocument": {
                "Version": "2012-10-17",
                "Statement": spec.statements
            }
        }]);
    }
    template.add_resource(&role_id, Resource::new("AWS::IAM::Role", role_properties))?;

    let mut function_properties = json!({
        "Runtime": "provided.al2023",
        "Handler": "bootstrap",
        "Architectures": ["arm64"],
        "MemorySize": 128,
        "Timeout": spec.timeout_secs,
        "ReservedConcurrentExecutions": 1,
        "Role": get_att(&role_id, "Arn"),
        "Code": {
            "S3Bucket": reference(ARTIFACT_BUCKET_PARAM),
            "S3Key": format!("{}.zip", spec.binary)
        },
        "Environment": { "Variables": spec.environment }
    });
    if let Some(name) = spec.function_name {
        function_properties["FunctionName"] = json!(name);
    }
    template.add_resource(
        &function_id,
        Resource::new("AWS::Lambda::Function", function_properties),
    )?;

    template.add_resource(
        &format!("{}LogGroup", spec.id),
        Resource::new(
            "AWS::Logs::LogGroup",
            json!({
                "LogGroupName": sub(&format!("/aws/lambda/${{{}}}", function_id)),
                "RetentionInDays": 7
            }),
        )
        .destroy_on_removal(),
    )
}

/// Lambda proxy integration of an API Gateway method.
pub(crate) fn proxy_integration(function_id: &str) -> Value {
    json!({
        "Type": "AWS_PROXY",
        "IntegrationHttpMethod": "POST",
        "Uri": sub(&format!(
            "arn:${{AWS::Partition}}:apigateway:${{AWS::Region}}:lambda:path/2015-03-31/functions/${{{}.Arn}}/invocations",
            function_id
        ))
    })
}

/// Regional REST API with one Lambda behind it.
///
/// Also sets the account's CloudWatch role (`<api>Account`); stages with
/// execution logging cannot deploy until it exists.
pub(crate) fn add_rest_api(template: &mut Template, api_id: &str, name: &str, function_id: &str) -> Result<()> {
    template.add_resource(
        api_id,
        Resource::new(
            "AWS::ApiGateway::RestApi",
            json!({
                "Name": name,
                "EndpointConfiguration": { "Types": ["REGIONAL"] }
            }),
        ),
    )?;

    let role_id = format!("{}CloudWatchRole", api_id);
    template.add_resource(
        &role_id,
        Resource::new(
            "AWS::IAM::Role",
            json!({
                "AssumeRolePolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Principal": { "Service": "apigateway.amazonaws.com" },
                        "Action": "sts:AssumeRole"
                    }]
                },
                "ManagedPolicyArns": [
                    sub("arn:${AWS::Partition}:iam::aws:policy/service-role/AmazonAPIGatewayPushToCloudWatchLogs")
                ]
            }),
        ),
    )?;
    template.add_resource(
        &account_id(api_id),
        Resource::new(
            "AWS::ApiGateway::Account",
            json!({ "CloudWatchRoleArn": get_att(&role_id, "Arn") }),
        )
        .depends_on(api_id),
    )?;

    template.add_resource(
        &format!("{}InvokePermission", api_id),
        Resource::new(
            "AWS::Lambda::Permission",
            json!({
                "Action": "lambda:InvokeFunction",
                "FunctionName": get_att(function_id, "Arn"),
                "Principal": "apigateway.amazonaws.com",
                "SourceArn": sub(&format!(
                    "arn:${{AWS::Partition}}:execute-api:${{AWS::Region}}:${{AWS::AccountId}}:${{{}}}/*/*/*",
                    api_id
                ))
            }),
        ),
    )
}

pub(crate) fn add_api_resource(
    template: &mut Template,
    logical_id: &str,
    api_id: &str,
    parent: Value,
    path_part: &str,
) -> Result<()> {
    template.add_resource(
        logical_id,
        Resource::new(
            "AWS::ApiGateway::Resource",
            json!({
                "RestApiId": reference(api_id),
                "ParentId": parent,
                "PathPart": path_part
            }),
        ),
    )
}

fn account_id(api_id: &str) -> String {
    format!("{}Account", api_id)
}

/// Deployment of the given methods plus a throttled stage.
pub(crate) fn add_stage(
    template: &mut Template,
    api_id: &str,
    stage_name: &str,
    methods: &[&str],
) -> Result<String> {
    let deployment_id = format!("{}Deployment", api_id);
    let stage_id = format!("{}Stage", api_id);

    let mut deployment = Resource::new(
        "AWS::ApiGateway::Deployment",
        json!({ "RestApiId": reference(api_id) }),
    );
    for method in methods {
        deployment = deployment.depends_on(method);
    }
    template.add_resource(&deployment_id, deployment)?;

    template.add_resource(
        &stage_id,
        Resource::new(
            "AWS::ApiGateway::Stage",
            json!({
                "StageName": stage_name,
                "RestApiId": reference(api_id),
                "DeploymentId": reference(&deployment_id),
                "MethodSettings": [{
                    "ResourcePath": "/*",
                    "HttpMethod": "*",
                    "ThrottlingRateLimit": 10,
                    "ThrottlingBurstLimit": 100,
                    "LoggingLevel": "INFO"
                }]
            }),
        )
        .depends_on(&account_id(api_id)),
    )?;
    Ok(stage_id)
}

/// Invoke URL of a resource path on a stage.
pub(crate) fn api_url(api_id: &str, stage_id: &str, path: &str) -> Value {
    sub(&format!(
        "https://${{{}}}.execute-api.${{AWS::Region}}.${{AWS::URLSuffix}}/${{{}}}{}",
        api_id, stage_id, path
    ))
}

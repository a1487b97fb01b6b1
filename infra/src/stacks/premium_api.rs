//! Walled garden: the premium content API behind a Cognito authorizer.

use serde_json::json;

use super::{
    add_api_resource, add_artifact_bucket, add_function, add_rest_api, add_stage, api_url,
    exports, full_scope, proxy_integration, FunctionSpec, StackSettings, READ_SCOPE, WRITE_SCOPE,
};
use crate::template::intrinsic::{get_att, import_value, reference};
use crate::template::{Output, Resource, Template};
use crate::Result;

const API: &str = "WalledGardenApi";
const AUTHORIZER: &str = "WalledGardenAuthorizer";
pub const PREMIUM_PATH: &str = "/home/premium";

pub fn template(settings: &StackSettings) -> Result<Template> {
    let mut t = Template::new("The Premium Content Provider API");
    add_artifact_bucket(&mut t, settings)?;

    let function = FunctionSpec {
        id: "PremiumContent",
        function_name: Some("premium_function"),
        binary: "premium_content",
        timeout_secs: 3,
        environment: json!({ "LOG_LEVEL": "INFO", "Environment": "Production" }),
        statements: Vec::new(),
    };
    add_function(&mut t, &function)?;
    let function_id = function.function_id();

    add_rest_api(&mut t, API, "walled-garden-api", &function_id)?;

    t.add_resource(
        AUTHORIZER,
        Resource::new(
            "AWS::ApiGateway::Authorizer",
            json!({
                "Name": "walledGardenSentry",
                "RestApiId": reference(API),
                "Type": "COGNITO_USER_POOLS",
                "ProviderARNs": [import_value(exports::USER_POOL_ARN)],
                "AuthorizerResultTtlInSeconds": 15,
                "IdentitySource": "method.request.header.Authorization"
            }),
        ),
    )?;

    add_api_resource(&mut t, "HomeResource", API, get_att(API, "RootResourceId"), "home")?;
    add_api_resource(&mut t, "PremiumResource", API, reference("HomeResource"), "premium")?;

    for (method_id, verb, scope) in [
        ("PremiumGetMethod", "GET", READ_SCOPE),
        ("PremiumPostMethod", "POST", WRITE_SCOPE),
    ] {
        t.add_resource(
            method_id,
            Resource::new(
                "AWS::ApiGateway::Method",
                json!({
                    "RestApiId": reference(API),
                    "ResourceId": reference("PremiumResource"),
                    "HttpMethod": verb,
                    "AuthorizationType": "COGNITO_USER_POOLS",
                    "AuthorizerId": reference(AUTHORIZER),
                    "AuthorizationScopes": [full_scope(scope)],
                    "Integration": proxy_integration(&function_id)
                }),
            ),
        )?;
    }

    let stage_id = add_stage(&mut t, API, "prod", &["PremiumGetMethod", "PremiumPostMethod"])?;

    t.add_output(
        "PremiumApiUrl",
        Output::new(api_url(API, &stage_id, PREMIUM_PATH), "Use a browser to access this url")
            .exported_as(exports::PREMIUM_API_URL),
    )?;

    t.validate()?;
    Ok(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn rendered() -> Value {
        let template = template(&StackSettings::default()).unwrap();
        serde_json::from_str(&template.to_json().unwrap()).unwrap()
    }

    #[test]
    fn test_methods_are_scope_gated() {
        let t = rendered();
        let get = &t["Resources"]["PremiumGetMethod"]["Properties"];
        let post = &t["Resources"]["PremiumPostMethod"]["Properties"];

        assert_eq!(get["AuthorizationType"], "COGNITO_USER_POOLS");
        assert_eq!(get["AuthorizationScopes"], json!(["premium_api/read"]));
        assert_eq!(post["AuthorizationScopes"], json!(["premium_api/write"]));
        assert_eq!(post["AuthorizerId"], json!({"Ref": AUTHORIZER}));
    }

    #[test]
    fn test_authorizer_uses_imported_pool() {
        let t = rendered();
        let authorizer = &t["Resources"][AUTHORIZER]["Properties"];
        assert_eq!(authorizer["ProviderARNs"], json!([{"Fn::ImportValue": exports::USER_POOL_ARN}]));
        assert_eq!(authorizer["AuthorizerResultTtlInSeconds"], 15);
        assert_eq!(authorizer["IdentitySource"], "method.request.header.Authorization");
    }

    #[test]
    fn test_function_and_stage() {
        let t = rendered();
        let function = &t["Resources"]["PremiumContentFunction"]["Properties"];
        assert_eq!(function["FunctionName"], "premium_function");
        assert_eq!(function["Timeout"], 3);
        assert_eq!(function["ReservedConcurrentExecutions"], 1);

        let stage = &t["Resources"]["WalledGardenApiStage"];
        assert_eq!(stage["Properties"]["StageName"], "prod");
        assert_eq!(stage["Properties"]["MethodSettings"][0]["ThrottlingBurstLimit"], 100);
        assert_eq!(
            t["Resources"]["WalledGardenApiDeployment"]["DependsOn"],
            json!(["PremiumGetMethod", "PremiumPostMethod"])
        );
    }

    #[test]
    fn test_logging_stage_waits_for_account_cloudwatch_role() {
        let t = rendered();
        let account = &t["Resources"]["WalledGardenApiAccount"];
        assert_eq!(account["Type"], "AWS::ApiGateway::Account");
        assert_eq!(
            account["Properties"]["CloudWatchRoleArn"],
            json!({"Fn::GetAtt": ["WalledGardenApiCloudWatchRole", "Arn"]})
        );

        let role = &t["Resources"]["WalledGardenApiCloudWatchRole"]["Properties"];
        assert_eq!(
            role["AssumeRolePolicyDocument"]["Statement"][0]["Principal"]["Service"],
            "apigateway.amazonaws.com"
        );
        assert!(role["ManagedPolicyArns"][0]["Fn::Sub"]
            .as_str()
            .unwrap()
            .ends_with("AmazonAPIGatewayPushToCloudWatchLogs"));

        let stage = &t["Resources"]["WalledGardenApiStage"];
        assert_eq!(stage["Properties"]["MethodSettings"][0]["LoggingLevel"], "INFO");
        assert_eq!(stage["DependsOn"], json!(["WalledGardenApiAccount"]));
    }
}

//! Identity pool: user pool, hosted domain, resource server, app client and
//! the custom resource that stores the app client secret.

use serde_json::json;

use super::{
    add_artifact_bucket, add_function, exports, full_scope, FunctionSpec, StackSettings,
    READ_SCOPE, RESOURCE_SERVER_IDENTIFIER, WRITE_SCOPE,
};
use crate::template::intrinsic::{get_att, reference, sub};
use crate::template::{Output, Parameter, Resource, Template};
use crate::Result;

pub const DOMAIN_PARAM: &str = "CognitoDomainName";
pub const SECRETS_RESOURCE: &str = "AppClientSecrets";

const TOKEN_ENDPOINT: &str =
    "https://${UserPoolDomain}.auth.${AWS::Region}.amazoncognito.com/oauth2/token";

pub fn template(settings: &StackSettings) -> Result<Template> {
    let mut t = Template::new("Cognito Identity Store Stack");

    t.add_parameter(
        DOMAIN_PARAM,
        Parameter::string(
            "Enter the name the domain you want to use",
            Some(settings.domain_prefix.as_str()),
        ),
    )?;
    add_artifact_bucket(&mut t, settings)?;

    t.add_resource(
        "UserPool",
        Resource::new(
            "AWS::Cognito::UserPool",
            json!({
                "UserPoolName": "Premium-Content-User-Pool",
                "AliasAttributes": ["email"],
                "AutoVerifiedAttributes": ["email"],
                "Schema": [
                    { "Name": "email", "AttributeDataType": "String", "Required": true, "Mutable": false },
                    { "Name": "name", "AttributeDataType": "String", "Required": false, "Mutable": true }
                ]
            }),
        ),
    )?;

    t.add_resource(
        "UserPoolDomain",
        Resource::new(
            "AWS::Cognito::UserPoolDomain",
            json!({
                "Domain": reference(DOMAIN_PARAM),
                "UserPoolId": reference("UserPool")
            }),
        ),
    )?;

    t.add_resource(
        "ResourceServer",
        Resource::new(
            "AWS::Cognito::UserPoolResourceServer",
            json!({
                "Identifier": RESOURCE_SERVER_IDENTIFIER,
                "Name": "premium-api-authorizer",
                "UserPoolId": reference("UserPool"),
                "Scopes": [
                    { "ScopeName": READ_SCOPE, "ScopeDescription": "Get Premium Api Content" },
                    { "ScopeName": WRITE_SCOPE, "ScopeDescription": "Put Premium Api Content" }
                ]
            }),
        ),
    )?;

    // scopes must exist on the resource server before the client can allow them
    t.add_resource(
        "AppClient",
        Resource::new(
            "AWS::Cognito::UserPoolClient",
            json!({
                "ClientName": "premium_app_users",
                "UserPoolId": reference("UserPool"),
                "GenerateSecret": true,
                "ExplicitAuthFlows": [
                    "ALLOW_CUSTOM_AUTH",
                    "ALLOW_REFRESH_TOKEN_AUTH",
                    "ALLOW_USER_SRP_AUTH"
                ],
                "PreventUserExistenceErrors": "ENABLED",
                "SupportedIdentityProviders": ["COGNITO"],
                "AllowedOAuthFlowsUserPoolClient": true,
                "AllowedOAuthFlows": ["client_credentials"],
                "AllowedOAuthScopes": [full_scope(READ_SCOPE), full_scope(WRITE_SCOPE)]
            }),
        )
        .depends_on("ResourceServer"),
    )?;

    let retriever = FunctionSpec {
        id: "SecretRetriever",
        function_name: None,
        binary: "app_client_secret_retriever",
        timeout_secs: 10,
        environment: json!({ "LOG_LEVEL": "INFO", "APP_ENV": "Production" }),
        statements: vec![
            json!({
                "Sid": "AllowLambdaToDescribeCognitoUserPool",
                "Effect": "Allow",
                "Action": ["cognito-idp:DescribeUserPoolClient"],
                "Resource": get_att("UserPool", "Arn")
            }),
            json!({
                "Sid": "AllowLambdaToAddSecrets",
                "Effect": "Allow",
                "Action": [
                    "secretsmanager:CreateSecret",
                    "secretsmanager:TagResource",
                    "secretsmanager:UpdateSecret",
                    "secretsmanager:PutSecretValue",
                    "secretsmanager:DeleteSecret"
                ],
                "Resource": sub("arn:${AWS::Partition}:secretsmanager:${AWS::Region}:${AWS::AccountId}:secret:cognito_*")
            }),
        ],
    };
    add_function(&mut t, &retriever)?;

    // the log group must outlive the Delete event
    t.add_resource(
        SECRETS_RESOURCE,
        Resource::new(
            "Custom::AppClientSecrets",
            json!({
                "ServiceToken": get_att(&retriever.function_id(), "Arn"),
                "UserPoolId": reference("UserPool"),
                "UserPoolClientId": reference("AppClient"),
                "UserPoolOauth2Endpoint": sub(TOKEN_ENDPOINT),
                "ResourceServerIdentifier": RESOURCE_SERVER_IDENTIFIER,
                "ReadScope": READ_SCOPE,
                "WriteScope": WRITE_SCOPE
            }),
        )
        .depends_on("SecretRetrieverLogGroup"),
    )?;

    t.add_output(
        "IdentityAuthDomain",
        Output::new(sub(TOKEN_ENDPOINT), "Authenticate Against this endpoint"),
    )?;
    t.add_output(
        "AppPoolSecretsArn",
        Output::new(get_att(SECRETS_RESOURCE, "user_pool_secrets_arn"), "AppPoolSecretsArn")
            .exported_as(exports::SECRETS_ARN),
    )?;
    t.add_output(
        "UserPoolArn",
        Output::new(get_att("UserPool", "Arn"), "User pool guarding the premium API")
            .exported_as(exports::USER_POOL_ARN),
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
    fn test_app_client_allows_client_credentials_only() {
        let t = rendered();
        let client = &t["Resources"]["AppClient"];
        assert_eq!(client["Properties"]["GenerateSecret"], true);
        assert_eq!(client["Properties"]["AllowedOAuthFlows"], json!(["client_credentials"]));
        assert_eq!(
            client["Properties"]["AllowedOAuthScopes"],
            json!(["premium_api/read", "premium_api/write"])
        );
        assert_eq!(client["DependsOn"], json!(["ResourceServer"]));
    }

    #[test]
    fn test_custom_resource_properties() {
        let t = rendered();
        let props = &t["Resources"][SECRETS_RESOURCE]["Properties"];
        assert_eq!(props["ServiceToken"], json!({"Fn::GetAtt": ["SecretRetrieverFunction", "Arn"]}));
        assert_eq!(props["UserPoolId"], json!({"Ref": "UserPool"}));
        assert_eq!(props["ResourceServerIdentifier"], "premium_api");
        assert_eq!(props["UserPoolOauth2Endpoint"]["Fn::Sub"], TOKEN_ENDPOINT);
    }

    #[test]
    fn test_retriever_limits() {
        let t = rendered();
        let function = &t["Resources"]["SecretRetrieverFunction"]["Properties"];
        assert_eq!(function["Timeout"], 10);
        assert_eq!(function["ReservedConcurrentExecutions"], 1);
        assert_eq!(function["Code"]["S3Key"], "app_client_secret_retriever.zip");
        assert_eq!(t["Resources"]["SecretRetrieverLogGroup"]["Properties"]["RetentionInDays"], 7);
    }

    #[test]
    fn test_exports() {
        let template = template(&StackSettings::default()).unwrap();
        let provided = template.exports();
        assert!(provided.contains(exports::SECRETS_ARN));
        assert!(provided.contains(exports::USER_POOL_ARN));
        assert!(template.imports().is_empty());
    }
}

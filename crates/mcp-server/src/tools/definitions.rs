//! Static tool definitions advertised by `tools/list`

use serde_json::{json, Value};

use crate::protocol::{McpInputSchema, McpTool};

/// Default number of endpoints returned by `search_endpoints`
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

fn tool(name: &str, description: &str, properties: Value, required: &[&str]) -> McpTool {
    let properties = match properties {
        Value::Object(map) => map,
        _ => Default::default(),
    };

    McpTool {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: McpInputSchema {
            schema_type: "object".to_string(),
            properties,
            required: required.iter().map(|r| r.to_string()).collect(),
        },
    }
}

fn string(description: &str) -> Value {
    json!({"type": "string", "description": description})
}

fn string_map(description: &str) -> Value {
    json!({
        "type": "object",
        "description": description,
        "additionalProperties": {"type": "string"}
    })
}

fn credential_config_schema() -> Value {
    json!({
        "type": "object",
        "description": "Type-specific settings. apiKey: apiKey, apiKeyHeader. bearer: token, or loginUrl + loginBody for Smart Bearer (loginMethod, loginHeaders, tokenPath, tokenHeader, tokenPrefix, invalidStatusCodes, validityCheckUrl, validityCheckMethod, refreshUrl, refreshMethod, refreshTokenPath, refreshTokenField, refreshBody). basic: username, password. oauth2: accessToken. custom: headers. customHeaders: customHeaders [{name, value}] (1-5).",
        "properties": {
            "apiKey": {"type": "string"},
            "apiKeyHeader": {"type": "string"},
            "token": {"type": "string"},
            "username": {"type": "string"},
            "password": {"type": "string"},
            "accessToken": {"type": "string"},
            "headers": {"type": "object", "additionalProperties": {"type": "string"}},
            "customHeaders": {
                "type": "array",
                "minItems": 1,
                "maxItems": 5,
                "items": {
                    "type": "object",
                    "properties": {"name": {"type": "string"}, "value": {"type": "string"}},
                    "required": ["name", "value"]
                }
            },
            "loginUrl": {"type": "string"},
            "loginMethod": {"type": "string"},
            "loginBody": {"type": "object"},
            "loginHeaders": {"type": "object", "additionalProperties": {"type": "string"}},
            "tokenPath": {"type": "string", "description": "Dot path of the token in the login response (default: token)"},
            "tokenHeader": {"type": "string", "description": "Header carrying the token (default: Authorization)"},
            "tokenPrefix": {"type": "string", "description": "Prefix before the token (default: 'Bearer ')"},
            "invalidStatusCodes": {"type": "array", "items": {"type": "integer"}, "description": "Statuses meaning the token was rejected (default: [401, 403])"},
            "validityCheckUrl": {"type": "string"},
            "validityCheckMethod": {"type": "string"},
            "refreshUrl": {"type": "string"},
            "refreshMethod": {"type": "string"},
            "refreshTokenPath": {"type": "string"},
            "refreshTokenField": {"type": "string"},
            "refreshBody": {"type": "object"}
        }
    })
}

/// Every tool the server exposes
pub fn tool_definitions() -> Vec<McpTool> {
    vec![
        tool(
            "add_api_doc",
            "Register an OpenAPI 3.x or Swagger 2.0 document from a URL or inline JSON/YAML content. Its base URL becomes callable.",
            json!({
                "url": string("URL of the OpenAPI/Swagger document"),
                "content": string("Inline JSON or YAML document (instead of url)"),
                "name": string("Display name (defaults to the document title)"),
                "baseUrl": string("Override the API base URL declared in the document")
            }),
            &[],
        ),
        tool(
            "list_api_docs",
            "List registered API documents and their base URLs.",
            json!({}),
            &[],
        ),
        tool(
            "remove_api_doc",
            "Remove a registered API document. Its base URL is no longer callable.",
            json!({"apiDocId": string("ID of the API document")}),
            &["apiDocId"],
        ),
        tool(
            "search_endpoints",
            "Search endpoints of registered API documents by keywords (path, operationId, summary, tags).",
            json!({
                "query": string("Keywords, e.g. 'create customer'"),
                "apiDocId": string("Only search this API document"),
                "limit": {"type": "integer", "minimum": 1, "description": format!("Maximum results (default: {})", DEFAULT_SEARCH_LIMIT)}
            }),
            &["query"],
        ),
        tool(
            "get_endpoint",
            "Get parameters and request body schema of one endpoint.",
            json!({
                "apiDocId": string("ID of the API document"),
                "path": string("Endpoint path, template or concrete (e.g. /users/{id})"),
                "method": string("HTTP method")
            }),
            &["apiDocId", "path", "method"],
        ),
        tool(
            "add_credential",
            "Store a credential. Smart Bearer credentials (bearer with loginUrl) are verified with a test login unless skipValidityCheck is true.",
            json!({
                "name": string("Display name"),
                "type": {"type": "string", "enum": ["apiKey", "bearer", "basic", "oauth2", "custom", "customHeaders"]},
                "apiDocId": string("API document this credential is the default for"),
                "config": credential_config_schema(),
                "skipValidityCheck": {"type": "boolean", "description": "Store without a test login"}
            }),
            &["name", "type", "config"],
        ),
        tool(
            "update_credential",
            "Update a credential. Config keys are merged into the stored config; null clears a key.",
            json!({
                "credentialId": string("ID of the credential"),
                "name": string("New display name"),
                "apiDocId": string("New default API document"),
                "config": credential_config_schema(),
                "skipValidityCheck": {"type": "boolean"}
            }),
            &["credentialId"],
        ),
        tool(
            "list_credentials",
            "List stored credentials with secrets masked.",
            json!({}),
            &[],
        ),
        tool(
            "delete_credential",
            "Delete a credential and forget its cached token.",
            json!({"credentialId": string("ID of the credential")}),
            &["credentialId"],
        ),
        tool(
            "call_api",
            "Call an endpoint of a registered API document. Uses the doc's default credential when credentialId is omitted.",
            json!({
                "apiDocId": string("ID of the API document"),
                "path": string("Endpoint path; {placeholders} are filled from pathParams"),
                "method": string("HTTP method (default: GET)"),
                "pathParams": {"type": "object", "description": "Values for {placeholders} in path"},
                "queryParams": {"type": "object", "description": "Query string parameters; arrays repeat the key"},
                "headers": string_map("Extra request headers"),
                "body": {"description": "Request body; objects are sent as JSON, strings verbatim"},
                "credentialId": string("Credential to authenticate with")
            }),
            &["apiDocId", "path"],
        ),
        tool(
            "call_raw_api",
            "Call an absolute URL. The URL must fall under the base URL of a registered API document.",
            json!({
                "url": string("Absolute URL"),
                "method": string("HTTP method (default: GET)"),
                "queryParams": {"type": "object"},
                "headers": string_map("Extra request headers"),
                "body": {"description": "Request body; objects are sent as JSON, strings verbatim"},
                "credentialId": string("Credential to authenticate with")
            }),
            &["url"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names_unique() {
        let tools = tool_definitions();
        let mut names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), tools.len());
        assert_eq!(tools.len(), 11);
    }

    #[test]
    fn test_required_fields_are_declared() {
        for tool in tool_definitions() {
            for required in &tool.input_schema.required {
                assert!(
                    tool.input_schema.properties.contains_key(required),
                    "{} requires undeclared {}",
                    tool.name,
                    required
                );
            }
        }
    }
}

//! Main API document parser

use crate::error::{ParseError, ParseResult};
use crate::types::*;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, info};
use url::Url;

/// OpenAPI 3.x / Swagger 2.0 parser
pub struct OpenApiParser;

impl OpenApiParser {
    /// Parse a document from a string (auto-detects JSON/YAML)
    pub fn parse(content: &str) -> ParseResult<ParsedDoc> {
        Self::parse_with_source(content, None)
    }

    /// Parse a document that was loaded from `source_url`.
    ///
    /// The source URL is used to resolve relative server URLs and, for
    /// Swagger 2.0 documents without a `host`, the API origin.
    pub fn parse_with_source(content: &str, source_url: Option<&str>) -> ParseResult<ParsedDoc> {
        let document = Self::load_document(content)?;
        let source = source_url.and_then(|s| Url::parse(s).ok());
        Self::convert_document(&document, source.as_ref())
    }

    /// Fetch and parse a document from a URL
    pub async fn fetch_and_parse(url: &str) -> ParseResult<ParsedDoc> {
        info!("Fetching API document from: {}", url);

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ParseError::FetchError(e.to_string()))?;

        let response = client
            .get(url)
            .header("Accept", "application/json, application/yaml, text/yaml")
            .send()
            .await
            .map_err(|e| ParseError::FetchError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ParseError::FetchError(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let content = response
            .text()
            .await
            .map_err(|e| ParseError::FetchError(e.to_string()))?;

        Self::parse_with_source(&content, Some(url))
    }

    /// Load JSON or YAML into a JSON value
    fn load_document(content: &str) -> ParseResult<Value> {
        let content = Self::sanitize_large_numbers(content);

        let document: Value = if content.trim_start().starts_with('{') {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };

        if !document.is_object() {
            return Err(ParseError::InvalidFormat(
                "document root must be an object".to_string(),
            ));
        }

        Ok(document)
    }

    /// Clamp oversized integer constraints.
    /// Some specs use 64-bit sentinels for min/max which make the YAML to JSON
    /// conversion fail with "number out of range".
    fn sanitize_large_numbers(content: &str) -> String {
        let Ok(re_large) = Regex::new(
            r"(?m)^(\s*(?:minimum|maximum|exclusiveMinimum|exclusiveMaximum):\s*)(-?\d{16,})",
        ) else {
            return content.to_string();
        };

        re_large
            .replace_all(content, |caps: &regex::Captures| {
                if caps[2].starts_with('-') {
                    format!("{}-2147483648", &caps[1])
                } else {
                    format!("{}2147483647", &caps[1])
                }
            })
            .into_owned()
    }

    fn detect_format(document: &Value) -> ParseResult<DocFormat> {
        if let Some(version) = document.get("openapi").and_then(Value::as_str) {
            return if version.starts_with("3.") {
                Ok(DocFormat::OpenApi3)
            } else {
                Err(ParseError::UnsupportedVersion(version.to_string()))
            };
        }

        match document.get("swagger").and_then(Value::as_str) {
            Some("2.0") => Ok(DocFormat::Swagger2),
            Some(other) => Err(ParseError::UnsupportedVersion(other.to_string())),
            None => Err(ParseError::MissingField(
                "'openapi' or 'swagger' version".to_string(),
            )),
        }
    }

    fn convert_document(document: &Value, source: Option<&Url>) -> ParseResult<ParsedDoc> {
        let format = Self::detect_format(document)?;

        let info = document
            .get("info")
            .ok_or_else(|| ParseError::MissingField("info".to_string()))?;
        let title = info
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("Untitled API")
            .to_string();
        let version = match info.get("version") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };

        debug!("Parsing {:?} document: {}", format, title);

        let base_url = match format {
            DocFormat::OpenApi3 => Self::openapi_base_url(document, source),
            DocFormat::Swagger2 => Self::swagger_base_url(document, source),
        };

        let endpoints = Self::extract_endpoints(document, format);
        debug!("Extracted {} endpoints", endpoints.len());

        Ok(ParsedDoc {
            format,
            title,
            description: info
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            version,
            base_url,
            endpoints,
        })
    }

    /// `servers[0].url` with variable defaults substituted
    fn openapi_base_url(document: &Value, source: Option<&Url>) -> Option<String> {
        let server = document.get("servers")?.as_array()?.first()?;
        let mut url = server.get("url")?.as_str()?.to_string();

        if let Some(variables) = server.get("variables").and_then(Value::as_object) {
            for (name, variable) in variables {
                if let Some(default) = variable.get("default").and_then(Value::as_str) {
                    url = url.replace(&format!("{{{}}}", name), default);
                }
            }
        }

        let resolved = match Url::parse(&url) {
            Ok(absolute) => absolute,
            Err(_) => source?.join(&url).ok()?,
        };

        Some(resolved.as_str().trim_end_matches('/').to_string())
    }

    /// `scheme://host/basePath`, falling back to the source origin
    fn swagger_base_url(document: &Value, source: Option<&Url>) -> Option<String> {
        let scheme = document
            .get("schemes")
            .and_then(Value::as_array)
            .and_then(|schemes| schemes.first())
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| source.map(|s| s.scheme().to_string()))
            .unwrap_or_else(|| "https".to_string());

        let host = match document.get("host").and_then(Value::as_str) {
            Some(host) => host.to_string(),
            None => {
                let source = source?;
                let host = source.host_str()?;
                match source.port() {
                    Some(port) => format!("{}:{}", host, port),
                    None => host.to_string(),
                }
            }
        };

        let base_path = document
            .get("basePath")
            .and_then(Value::as_str)
            .unwrap_or("");

        let url = format!("{}://{}{}", scheme, host, base_path);
        Url::parse(&url)
            .ok()
            .map(|u| u.as_str().trim_end_matches('/').to_string())
    }

    fn extract_endpoints(document: &Value, format: DocFormat) -> Vec<Endpoint> {
        let Some(paths) = document.get("paths").and_then(Value::as_object) else {
            return Vec::new();
        };

        let mut endpoints = Vec::new();

        for (path, item) in paths {
            let Some(item) = item.as_object() else {
                continue;
            };
            let shared = Self::raw_parameters(document, item.get("parameters"));

            for method in HttpMethod::ALL {
                let Some(operation) = item.get(&method.key()).and_then(Value::as_object) else {
                    continue;
                };
                endpoints.push(Self::convert_operation(
                    document, format, path, method, operation, &shared,
                ));
            }
        }

        endpoints
    }

    fn convert_operation(
        document: &Value,
        format: DocFormat,
        path: &str,
        method: HttpMethod,
        operation: &Map<String, Value>,
        shared: &[Value],
    ) -> Endpoint {
        // Operation-level parameters override path-level ones with the same name + location
        let own = Self::raw_parameters(document, operation.get("parameters"));
        let mut merged: Vec<Value> = shared
            .iter()
            .filter(|p| {
                !own.iter()
                    .any(|o| o.get("name") == p.get("name") && o.get("in") == p.get("in"))
            })
            .cloned()
            .collect();
        merged.extend(own);

        let parameters: Vec<EndpointParameter> =
            merged.iter().filter_map(Self::convert_parameter).collect();

        let request_body = match format {
            DocFormat::OpenApi3 => operation
                .get("requestBody")
                .map(|body| Self::resolve_ref(document, body))
                .and_then(|body| Self::body_schema(&body)),
            DocFormat::Swagger2 => merged
                .iter()
                .find(|p| p.get("in").and_then(Value::as_str) == Some("body"))
                .and_then(|p| p.get("schema").cloned()),
        };

        let text = |key: &str| operation.get(key).and_then(Value::as_str).map(str::to_string);

        Endpoint {
            method,
            path: path.to_string(),
            operation_id: text("operationId"),
            summary: text("summary"),
            description: text("description"),
            tags: operation
                .get("tags")
                .and_then(Value::as_array)
                .map(|tags| {
                    tags.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            deprecated: operation
                .get("deprecated")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            parameters,
            request_body,
        }
    }

    fn raw_parameters(document: &Value, parameters: Option<&Value>) -> Vec<Value> {
        parameters
            .and_then(Value::as_array)
            .map(|params| {
                params
                    .iter()
                    .map(|p| Self::resolve_ref(document, p))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn convert_parameter(raw: &Value) -> Option<EndpointParameter> {
        let name = raw.get("name")?.as_str()?.to_string();
        let location = ParameterLocation::parse(raw.get("in")?.as_str()?)?;

        // Swagger 2.0 puts type information directly on non-body parameters
        let schema = raw.get("schema").cloned().or_else(|| {
            raw.get("type").map(|t| {
                let mut schema = Map::new();
                schema.insert("type".to_string(), t.clone());
                if let Some(format) = raw.get("format") {
                    schema.insert("format".to_string(), format.clone());
                }
                Value::Object(schema)
            })
        });

        Some(EndpointParameter {
            name,
            location,
            required: raw
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(location == ParameterLocation::Path),
            description: raw
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            schema,
        })
    }

    /// Prefer `application/json`, else the first declared media type
    fn body_schema(body: &Value) -> Option<Value> {
        let content = body.get("content")?.as_object()?;
        content
            .get("application/json")
            .or_else(|| content.values().next())
            .and_then(|media| media.get("schema"))
            .cloned()
    }

    /// Resolve a local `$ref` one level deep; other values pass through
    fn resolve_ref(document: &Value, value: &Value) -> Value {
        value
            .get("$ref")
            .and_then(Value::as_str)
            .and_then(|reference| reference.strip_prefix('#'))
            .and_then(|pointer| document.pointer(pointer))
            .cloned()
            .unwrap_or_else(|| value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SAMPLE_SPEC: &str = r#"
openapi: "3.0.0"
info:
  title: Test API
  version: "1.0.0"
servers:
  - url: https://api.example.com/v1/
paths:
  /users:
    get:
      operationId: listUsers
      summary: List all users
      tags: [users]
      parameters:
        - $ref: '#/components/parameters/Limit'
      responses:
        '200':
          description: A list of users
    post:
      operationId: createUser
      summary: Create a user
      requestBody:
        required: true
        content:
          application/json:
            schema:
              type: object
              properties:
                name:
                  type: string
      responses:
        '201':
          description: User created
  /users/{id}:
    parameters:
      - name: id
        in: path
        schema:
          type: string
    get:
      operationId: getUser
      summary: Get a user by ID
      responses:
        '200':
          description: A user
components:
  parameters:
    Limit:
      name: limit
      in: query
      schema:
        type: integer
"#;

    const SWAGGER_SPEC: &str = r#"{
  "swagger": "2.0",
  "info": { "title": "Pet Store", "version": "1.0" },
  "host": "petstore.example.com",
  "basePath": "/api",
  "schemes": ["http"],
  "paths": {
    "/pets": {
      "post": {
        "operationId": "addPet",
        "parameters": [
          { "name": "body", "in": "body", "required": true, "schema": { "type": "object" } }
        ]
      }
    },
    "/pets/{petId}": {
      "get": {
        "operationId": "getPet",
        "parameters": [
          { "name": "petId", "in": "path", "required": true, "type": "integer", "format": "int64" }
        ]
      }
    }
  }
}"#;

    #[test]
    fn test_parse_openapi_yaml() {
        let doc = OpenApiParser::parse(SAMPLE_SPEC).unwrap();

        assert_eq!(doc.format, DocFormat::OpenApi3);
        assert_eq!(doc.title, "Test API");
        assert_eq!(doc.version, "1.0.0");
        assert_eq!(doc.base_url.as_deref(), Some("https://api.example.com/v1"));
        assert_eq!(doc.endpoints.len(), 3);
    }

    #[test]
    fn test_parse_extracts_endpoints() {
        let doc = OpenApiParser::parse(SAMPLE_SPEC).unwrap();

        let list_users = doc
            .endpoints
            .iter()
            .find(|ep| ep.operation_id.as_deref() == Some("listUsers"))
            .unwrap();
        assert_eq!(list_users.method, HttpMethod::Get);
        assert_eq!(list_users.tags, vec!["users".to_string()]);
        // $ref resolved from components/parameters
        assert_eq!(list_users.parameters.len(), 1);
        assert_eq!(list_users.parameters[0].name, "limit");
        assert_eq!(list_users.parameters[0].location, ParameterLocation::Query);

        let create_user = doc
            .endpoints
            .iter()
            .find(|ep| ep.operation_id.as_deref() == Some("createUser"))
            .unwrap();
        assert!(create_user.request_body.is_some());

        let get_user = doc
            .endpoints
            .iter()
            .find(|ep| ep.operation_id.as_deref() == Some("getUser"))
            .unwrap();
        // path-level parameter inherited and required by default
        assert_eq!(get_user.parameters.len(), 1);
        assert!(get_user.parameters[0].required);
    }

    #[test]
    fn test_parse_swagger_json() {
        let doc = OpenApiParser::parse(SWAGGER_SPEC).unwrap();

        assert_eq!(doc.format, DocFormat::Swagger2);
        assert_eq!(doc.base_url.as_deref(), Some("http://petstore.example.com/api"));

        let add_pet = doc
            .endpoints
            .iter()
            .find(|ep| ep.operation_id.as_deref() == Some("addPet"))
            .unwrap();
        assert!(add_pet.request_body.is_some());

        let get_pet = doc
            .endpoints
            .iter()
            .find(|ep| ep.operation_id.as_deref() == Some("getPet"))
            .unwrap();
        let schema = get_pet.parameters[0].schema.as_ref().unwrap();
        assert_eq!(schema["type"], "integer");
        assert_eq!(schema["format"], "int64");
    }

    #[test]
    fn test_relative_server_resolved_against_source() {
        let spec = r#"{
            "openapi": "3.1.0",
            "info": { "title": "Relative", "version": "2" },
            "servers": [{ "url": "/api/{version}", "variables": { "version": { "default": "v2" } } }],
            "paths": {}
        }"#;

        let doc =
            OpenApiParser::parse_with_source(spec, Some("https://docs.example.com/openapi.json"))
                .unwrap();
        assert_eq!(doc.base_url.as_deref(), Some("https://docs.example.com/api/v2"));

        let doc = OpenApiParser::parse(spec).unwrap();
        assert!(doc.base_url.is_none());
    }

    #[test]
    fn test_unsupported_version() {
        let result = OpenApiParser::parse(r#"{"openapi": "4.0.0", "info": {"title": "x"}}"#);
        assert!(matches!(result, Err(ParseError::UnsupportedVersion(_))));

        let result = OpenApiParser::parse(r#"{"info": {"title": "x"}}"#);
        assert!(matches!(result, Err(ParseError::MissingField(_))));
    }

    #[test]
    fn test_sanitize_large_numbers() {
        let yaml_with_large_nums = r#"
openapi: "3.0.0"
info:
  title: Test API
  version: "1.0.0"
paths: {}
components:
  schemas:
    TestSchema:
      type: object
      properties:
        seed:
          type: integer
          minimum: -9223372036854776000
          maximum: 9223372036854776000
"#;

        let result = OpenApiParser::parse(yaml_with_large_nums);
        assert!(result.is_ok(), "Failed to parse: {:?}", result.err());
    }

    #[tokio::test]
    async fn test_fetch_and_parse() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/swagger.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(
                    SWAGGER_SPEC.replace("\"host\": \"petstore.example.com\",", ""),
                    "application/json",
                ),
            )
            .expect(1)
            .mount(&server)
            .await;

        let doc = OpenApiParser::fetch_and_parse(&format!("{}/swagger.json", server.uri()))
            .await
            .unwrap();

        // No host in the document: the origin it was served from is used
        let expected = format!("{}/api", server.uri());
        assert_eq!(doc.base_url.as_deref(), Some(expected.as_str()));
        assert_eq!(doc.endpoints.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = OpenApiParser::fetch_and_parse(&format!("{}/missing.yaml", server.uri())).await;
        assert!(matches!(result, Err(ParseError::FetchError(_))));
    }
}

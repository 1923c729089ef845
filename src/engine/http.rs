use super::template;
use crate::ast::Value;
use crate::compile::CompiledApiCall;
use crate::error::StepError;
use crate::formula::Scope;
use crate::tool::HttpMethod;
use std::time::Duration;

/// Executes one `api_call` step: templates the request from the scope, sends
/// it under the step's timeout and captures the body as a value.
pub(super) async fn execute_call(
    client: &reqwest::Client,
    step_id: &str,
    call: &CompiledApiCall,
    scope: &Scope,
) -> Result<Value, StepError> {
    let url = template::substitute(&call.url, scope).map_err(|e| super::evaluation(step_id, e))?;

    let mut request = client.request(method_of(call.method), &url);
    for (name, value) in &call.headers {
        let value = template::substitute(value, scope).map_err(|e| super::evaluation(step_id, e))?;
        request = request.header(name, value);
    }
    if let Some(body) = &call.body {
        let body = template::substitute(body, scope).map_err(|e| super::evaluation(step_id, e))?;
        request = request.body(body);
    }

    // The bound covers the whole exchange, connect through body read.
    let exchange = async {
        let response = request.send().await.map_err(|e| StepError::Http {
            step_id: step_id.to_string(),
            status: None,
            message: e.to_string(),
        })?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(StepError::Http {
                step_id: step_id.to_string(),
                status: Some(status.as_u16()),
                message: snippet(&body, status),
            });
        }
        Ok(parse_body(body))
    };

    match tokio::time::timeout(Duration::from_millis(call.timeout_ms), exchange).await {
        Ok(outcome) => outcome,
        Err(_) => Err(StepError::Timeout {
            step_id: step_id.to_string(),
            limit_ms: call.timeout_ms,
        }),
    }
}

fn method_of(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

/// A JSON body becomes a structured value, anything else stays text.
pub(super) fn parse_body(body: String) -> Value {
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => Value::from_json(json),
        Err(_) => Value::String(body),
    }
}

fn snippet(body: &str, status: reqwest::StatusCode) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

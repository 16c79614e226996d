//! API client for communicating with the prediction service

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// API client for the prediction service
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Attach the admin bearer token to every request
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;
        let response = self.send(self.client.get(url)).await?;
        parse(response).await
    }

    /// Make a GET request that also accepts 503 bodies (health probes)
    pub async fn get_probe<T: DeserializeOwned>(&self, path: &str) -> Result<(u16, T)> {
        let url = self.base_url.join(path).context("Invalid path")?;
        let response = self.send(self.client.get(url)).await?;
        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            let body = response.json().await.context("Failed to parse response")?;
            return Ok((status.as_u16(), body));
        }
        Err(api_error(response).await)
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;
        let response = self.send(self.client.post(url).json(body)).await?;
        parse(response).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        request.send().await.context("Failed to send request")
    }
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }
    response.json().await.context("Failed to parse response")
}

/// Turn an error response into a readable message, using `{error, status}` when present
async fn api_error(response: Response) -> anyhow::Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => anyhow::anyhow!("API error ({}): {}", status, err.error),
        Err(_) => anyhow::anyhow!("API error ({}): {}", status, body),
    }
}

// API request and response types

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictRequest {
    pub attendance: f64,
    pub marks: f64,
    pub internal_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_exam_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_label: u8,
    pub probability: f64,
    pub threshold_used: f64,
    pub threshold_source: String,
    pub model_version: String,
    pub suspicious_input: bool,
    #[serde(default)]
    pub suspicious_reasons: Vec<String>,
    pub explanation: Explanation,
    #[serde(default)]
    pub feedback: Vec<FeedbackSuggestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    pub contributions: Vec<FeatureContribution>,
    pub feature_importances: Vec<FeatureImportance>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature: String,
    pub value: f64,
    pub normalized_value: f64,
    pub contribution: f64,
    pub effect: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackSuggestion {
    pub feature: String,
    pub current_value: f64,
    pub suggested_value: f64,
    pub change: f64,
    pub direction: String,
    pub estimated_probability: f64,
    pub estimated_probability_gain: f64,
    pub priority: String,
    pub feasible: bool,
}

/// Batch records are forwarded as-is; the server validates them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub items: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub count: usize,
    pub results: Vec<BatchPrediction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPrediction {
    pub student_id: Option<i64>,
    pub course_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PredictionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelExplanation {
    pub model_version: String,
    pub threshold: f64,
    pub threshold_source: String,
    pub feature_importances: Vec<FeatureImportance>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub model_version: String,
    pub checksum: String,
    pub threshold: f64,
    pub threshold_source: String,
    pub loaded_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdRequest {
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdResponse {
    pub threshold: f64,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub components: BTreeMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prediction_body() -> String {
        json!({
            "predicted_label": 0,
            "probability": 0.103,
            "threshold_used": 0.6,
            "threshold_source": "metadata:user",
            "model_version": "v3",
            "suspicious_input": false,
            "suspicious_reasons": [],
            "explanation": {
                "contributions": [
                    {"feature": "internal_score", "value": 12.0, "normalized_value": -1.0,
                     "contribution": -0.9, "effect": "decrease"}
                ],
                "feature_importances": [{"feature": "marks", "importance": 1.2}]
            },
            "feedback": [
                {"feature": "marks", "current_value": 55.0, "suggested_value": 87.15, "change": 32.15,
                 "direction": "increase", "estimated_probability": 0.6,
                 "estimated_probability_gain": 0.497, "priority": "high", "feasible": true}
            ]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_predict_posts_features() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/predict")
            .match_body(mockito::Matcher::PartialJson(json!({
                "attendance": 65.0, "marks": 55.0, "internal_score": 12.0
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(prediction_body())
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let request = PredictRequest {
            attendance: 65.0,
            marks: 55.0,
            internal_score: 12.0,
            ..Default::default()
        };
        let result: PredictionResult = client.post("api/predict", &request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.predicted_label, 0);
        assert_eq!(result.feedback[0].feature, "marks");
        assert_eq!(result.threshold_source, "metadata:user");
    }

    #[tokio::test]
    async fn test_admin_token_sent_as_bearer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/settings/threshold")
            .match_header("authorization", "Bearer s3cret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"threshold": 0.65, "source": "metadata:user"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url())
            .unwrap()
            .with_token(Some("s3cret".to_string()));
        let response: ThresholdResponse = client.get("api/settings/threshold").await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.threshold, 0.65);
    }

    #[tokio::test]
    async fn test_error_body_surfaces_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/settings/threshold")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "Validation error: Threshold must be between 0 and 1.", "status": 400}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .post::<ThresholdResponse, _>("api/settings/threshold", &ThresholdRequest { threshold: 2.0 })
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("400"));
        assert!(message.contains("Threshold must be between 0 and 1."));
    }

    #[tokio::test]
    async fn test_probe_accepts_service_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/readyz")
            .with_status(503)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ready": false, "reason": "Model not loaded"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let (status, readiness): (u16, ReadinessResponse) = client.get_probe("readyz").await.unwrap();
        assert_eq!(status, 503);
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Model not loaded"));
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let client = ApiClient::new("http://localhost:8080")
            .unwrap()
            .with_token(Some(String::new()));
        assert!(client.token.is_none());
    }
}

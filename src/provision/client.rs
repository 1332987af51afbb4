//! HTTP client for the agent/room provisioning API.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::session::{CallIdentity, JoinAddress};

/// Handle to a provisioned agent, required by every subsequent call-room
/// operation. Persisted so a resumed call can reuse the same agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentHandle {
    pub agent_code: String,
    pub schema_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartDemoRequest {
    pub company_name: String,
    pub agent_name: String,
    pub company_website: String,
    pub agent_personality: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRoomRequest {
    pub agent_code: String,
    pub schema_name: String,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndCallRequest {
    pub call_session_id: String,
    pub call_id: String,
    pub schema_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriggerCallRequest {
    pub phone_number: String,
    /// Agent to place the call as; the backend falls back to its default
    /// outbound agent when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StartDemoResponse {
    response: AgentHandle,
}

/// Join-credential payload. The backend returns either a single join URL or
/// a server URL plus access token depending on the provider.
#[derive(Debug, Deserialize)]
struct RoomPayload {
    #[serde(rename = "joinUrl")]
    join_url: Option<String>,
    token: Option<String>,
    url: Option<String>,
    #[serde(rename = "callId")]
    call_id: String,
    call_session_id: String,
}

#[derive(Debug, Deserialize)]
struct RoomResponse {
    response: RoomPayload,
}

impl RoomPayload {
    fn into_identity(self) -> Result<CallIdentity> {
        let join = match (self.join_url, self.token, self.url) {
            (Some(join_url), _, _) => JoinAddress::Url(join_url),
            (None, Some(token), Some(url)) => JoinAddress::Token { url, token },
            _ => return Err(anyhow!("Room response missing join credentials")),
        };
        Ok(CallIdentity {
            call_id: self.call_id,
            call_session_id: self.call_session_id,
            join,
        })
    }
}

#[derive(Debug, Serialize)]
struct ResumeRequest<'a> {
    agent_code: &'a str,
    schema_name: &'a str,
    prior_call_id: &'a str,
}

/// Operations the core needs from the provisioning backend.
#[async_trait]
pub trait ProvisioningClient: Send + Sync {
    /// Provision an agent for a target website.
    async fn start_demo(&self, req: &StartDemoRequest) -> Result<AgentHandle>;

    /// Create a call room and return join credentials.
    async fn create_room(&self, req: &CreateRoomRequest) -> Result<CallIdentity>;

    /// Re-join a previously issued call, returning fresh join credentials.
    async fn resume_call(&self, agent: &AgentHandle, prior_call_id: &str) -> Result<CallIdentity>;

    /// Notify the backend that a call session ended. Best-effort.
    async fn end_call_session(&self, req: &EndCallRequest) -> Result<()>;

    /// Request an outbound phone call to the visitor.
    async fn trigger_call(&self, req: &TriggerCallRequest) -> Result<()>;
}

/// Client for the real provisioning API.
pub struct HttpProvisioningClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProvisioningClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post_json<B: Serialize, R: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}/api/{}/", self.base_url, endpoint);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to reach {endpoint}"))?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(anyhow!("{} failed ({}): {}", endpoint, status, text));
        }

        serde_json::from_str(&text).with_context(|| format!("Failed to parse {endpoint} response"))
    }

    async fn post_ack<B: Serialize>(&self, endpoint: &str, body: &B) -> Result<()> {
        let url = format!("{}/api/{}/", self.base_url, endpoint);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to reach {endpoint}"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("{} failed ({}): {}", endpoint, status, text));
        }
        Ok(())
    }
}

#[async_trait]
impl ProvisioningClient for HttpProvisioningClient {
    async fn start_demo(&self, req: &StartDemoRequest) -> Result<AgentHandle> {
        let response: StartDemoResponse = self.post_json("start-demo", req).await?;
        Ok(response.response)
    }

    async fn create_room(&self, req: &CreateRoomRequest) -> Result<CallIdentity> {
        let response: RoomResponse = self.post_json("create-room", req).await?;
        response.response.into_identity()
    }

    async fn resume_call(&self, agent: &AgentHandle, prior_call_id: &str) -> Result<CallIdentity> {
        let req = ResumeRequest {
            agent_code: &agent.agent_code,
            schema_name: &agent.schema_name,
            prior_call_id,
        };
        let response: RoomResponse = self.post_json("start-thunder", &req).await?;
        response.response.into_identity()
    }

    async fn end_call_session(&self, req: &EndCallRequest) -> Result<()> {
        self.post_ack("end-call-session", req).await
    }

    async fn trigger_call(&self, req: &TriggerCallRequest) -> Result<()> {
        self.post_ack("trigger-call", req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_payload_prefers_join_url() {
        let payload: RoomResponse = serde_json::from_str(
            r#"{"response":{"joinUrl":"wss://x","callId":"c1","call_session_id":"s1"}}"#,
        )
        .unwrap();
        let identity = payload.response.into_identity().unwrap();
        assert_eq!(identity.call_id, "c1");
        assert_eq!(identity.call_session_id, "s1");
        assert_eq!(identity.join, JoinAddress::Url("wss://x".to_string()));
    }

    #[test]
    fn test_room_payload_token_and_url() {
        let payload: RoomResponse = serde_json::from_str(
            r#"{"response":{"token":"t","url":"wss://lk","callId":"c1","call_session_id":"s1"}}"#,
        )
        .unwrap();
        let identity = payload.response.into_identity().unwrap();
        assert_eq!(
            identity.join,
            JoinAddress::Token {
                url: "wss://lk".to_string(),
                token: "t".to_string()
            }
        );
    }

    #[test]
    fn test_room_payload_missing_credentials_is_an_error() {
        let payload: RoomResponse = serde_json::from_str(
            r#"{"response":{"callId":"c1","call_session_id":"s1"}}"#,
        )
        .unwrap();
        assert!(payload.response.into_identity().is_err());
    }

    #[test]
    fn test_create_room_request_skips_empty_contact() {
        let req = CreateRoomRequest {
            agent_code: "a".to_string(),
            schema_name: "s".to_string(),
            provider: "thunderemotionlite".to_string(),
            name: None,
            email: None,
            phone: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("name").is_none());
        assert!(json.get("phone").is_none());
    }
}

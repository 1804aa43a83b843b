// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::config::LedgerSettings;
use crate::errors::DappError;
use crate::network::retry::{send_with_retry, RetryPolicy};
use crate::network::wire::*;
use crate::telemetry::{LEDGER_CALLS, LEDGER_CALL_DURATION};

use dapp_kernel::types::{ChainBlock, ContractHash, Did, SignatureRequestId};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Typed REST client for ledger nodes.
///
/// The node URL is passed per call since one relay talks to every node in
/// the directory. Only `fetch_chain_data` retries.
#[derive(Debug, Clone)]
pub struct LedgerClient {
    client: Client,
    fetch_retry: RetryPolicy,
    quorum_type: u32,
    deploy_rbt_amount: f64,
    signature_password: String,
}

impl LedgerClient {
    pub fn new(settings: &LedgerSettings, signature_password: impl Into<String>) -> Result<Self, DappError> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| DappError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            fetch_retry: RetryPolicy {
                max_retries: settings.fetch_retries,
                initial_delay: Duration::from_millis(settings.retry_initial_delay_ms),
                max_delay: Duration::from_millis(settings.retry_max_delay_ms),
                ..RetryPolicy::default()
            },
            quorum_type: settings.quorum_type,
            deploy_rbt_amount: settings.deploy_rbt_amount,
            signature_password: signature_password.into(),
        })
    }

    /// Upload the artifacts and let the node derive the contract hash.
    pub async fn generate_contract(
        &self,
        node_url: &str,
        identity: &Did,
        module_path: &Path,
        source_path: &Path,
        schema_path: &Path,
    ) -> Result<ContractHash, DappError> {
        let form = Form::new()
            .text(FIELD_DID, identity.to_string())
            .part(FIELD_BINARY, file_part(module_path).await?)
            .part(FIELD_RAW, file_part(source_path).await?)
            .part(FIELD_SCHEMA, file_part(schema_path).await?);

        let url = endpoint_url(node_url, GENERATE_PATH);
        let started = Instant::now();
        let sent = self.client.post(&url).multipart(form).send().await;
        let reply: Envelope<String> = self.decode(GENERATE_PATH, sent, started).await?;
        let raw = expect_result(GENERATE_PATH, reply)?;

        let hash = ContractHash::parse(raw)
            .map_err(|e| DappError::remote(GENERATE_PATH, format!("unusable contract hash: {e}")))?;
        info!(%hash, node = node_url, "Contract generated");
        Ok(hash)
    }

    pub async fn deploy_contract(
        &self,
        node_url: &str,
        contract_hash: &ContractHash,
        identity: &Did,
    ) -> Result<SignatureRequestId, DappError> {
        let body = DeployBody {
            comment: DEPLOY_COMMENT,
            deployer_addr: identity.as_str(),
            quorum_type: self.quorum_type,
            rbt_amount: self.deploy_rbt_amount,
            smart_contract_token: contract_hash.as_str(),
        };
        let reply: Envelope<PendingSignature> = self.post_json(node_url, DEPLOY_PATH, &body).await?;
        let pending = expect_result(DEPLOY_PATH, reply)?;
        Ok(SignatureRequestId::new(pending.id))
    }

    pub async fn execute_contract(
        &self,
        node_url: &str,
        contract_hash: &ContractHash,
        identity: &Did,
        payload: &str,
    ) -> Result<SignatureRequestId, DappError> {
        let body = ExecuteBody {
            comment: EXECUTE_COMMENT,
            executor_addr: identity.as_str(),
            quorum_type: self.quorum_type,
            smart_contract_data: payload,
            smart_contract_token: contract_hash.as_str(),
        };
        let reply: Envelope<PendingSignature> = self.post_json(node_url, EXECUTE_PATH, &body).await?;
        let pending = expect_result(EXECUTE_PATH, reply)?;
        Ok(SignatureRequestId::new(pending.id))
    }

    /// Consumes the request id; a pending transaction is confirmed at most once.
    pub async fn confirm_signature(
        &self,
        node_url: &str,
        request_id: SignatureRequestId,
    ) -> Result<(), DappError> {
        let body = SignatureBody {
            id: request_id.as_str(),
            mode: 0,
            password: &self.signature_password,
        };
        let reply: Envelope<serde_json::Value> = self.post_json(node_url, SIGNATURE_PATH, &body).await?;
        check_status(SIGNATURE_PATH, reply.status, &reply.message)?;
        debug!(id = %request_id, "Signature confirmed");
        Ok(())
    }

    /// Chain history in the order the node returns it. Retries on transient failures.
    pub async fn fetch_chain_data(
        &self,
        node_url: &str,
        contract_hash: &ContractHash,
        latest_only: bool,
    ) -> Result<Vec<ChainBlock>, DappError> {
        let body = FetchBody {
            token: contract_hash.as_str(),
            latest: latest_only,
        };
        let url = endpoint_url(node_url, FETCH_PATH);
        let started = Instant::now();
        let sent = send_with_retry(&self.fetch_retry, FETCH_PATH, || {
            self.client.post(&url).json(&body)
        })
        .await;
        let reply: ChainDataReply = self.decode(FETCH_PATH, sent, started).await?;
        check_status(FETCH_PATH, reply.status, &reply.message)?;

        let blocks = reply.blocks.unwrap_or_default();
        debug!(contract = %contract_hash, blocks = blocks.len(), latest_only, "Fetched chain data");
        Ok(blocks)
    }

    pub async fn register_callback(
        &self,
        node_url: &str,
        contract_hash: &ContractHash,
        callback_url: &str,
    ) -> Result<(), DappError> {
        let body = RegisterCallbackBody {
            callback_url,
            smart_contract_token: contract_hash.as_str(),
        };
        let reply: Envelope<serde_json::Value> =
            self.post_json(node_url, REGISTER_CALLBACK_PATH, &body).await?;
        check_status(REGISTER_CALLBACK_PATH, reply.status, &reply.message)?;
        info!(contract = %contract_hash, callback_url, "Callback registered");
        Ok(())
    }

    async fn post_json<B, T>(&self, node_url: &str, endpoint: &'static str, body: &B) -> Result<T, DappError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = endpoint_url(node_url, endpoint);
        let started = Instant::now();
        let sent = self.client.post(&url).json(body).send().await;
        self.decode(endpoint, sent, started).await
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        sent: Result<Response, reqwest::Error>,
        started: Instant,
    ) -> Result<T, DappError> {
        let result = decode_response(endpoint, sent).await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::increment_counter!(LEDGER_CALLS, "endpoint" => endpoint, "outcome" => outcome);
        metrics::histogram!(LEDGER_CALL_DURATION, started.elapsed().as_secs_f64(), "endpoint" => endpoint);
        result
    }
}

async fn decode_response<T: DeserializeOwned>(
    endpoint: &'static str,
    sent: Result<Response, reqwest::Error>,
) -> Result<T, DappError> {
    let resp = sent.map_err(|e| DappError::remote(endpoint, format!("transport error: {e}")))?;
    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| DappError::remote(endpoint, format!("failed to read body: {e}")))?;

    if !status.is_success() {
        return Err(DappError::remote(
            endpoint,
            format!("HTTP {status}: {}", truncate(&text, 256)),
        ));
    }
    debug!(endpoint, body = %truncate(&text, 512), "Ledger reply");

    serde_json::from_str(&text)
        .map_err(|e| DappError::remote(endpoint, format!("undecodable reply: {e}")))
}

fn check_status(endpoint: &'static str, status: bool, message: &str) -> Result<(), DappError> {
    if status {
        Ok(())
    } else {
        Err(DappError::remote(endpoint, message.to_string()))
    }
}

fn expect_result<T>(endpoint: &'static str, reply: Envelope<T>) -> Result<T, DappError> {
    check_status(endpoint, reply.status, &reply.message)?;
    reply
        .result
        .ok_or_else(|| DappError::remote(endpoint, "reply has no result"))
}

fn endpoint_url(node_url: &str, path: &str) -> String {
    format!("{}{}", node_url.trim_end_matches('/'), path)
}

async fn file_part(path: &Path) -> Result<Part, DappError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| DappError::InvalidInput(format!("cannot read {}: {e}", path.display())))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    Ok(Part::bytes(bytes).file_name(name))
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_trims_trailing_slash() {
        assert_eq!(
            endpoint_url("http://localhost:20002/", DEPLOY_PATH),
            "http://localhost:20002/api/deploy-smart-contract"
        );
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[test]
    fn test_expect_result_failure_carries_message() {
        let reply: Envelope<String> = Envelope {
            status: false,
            message: "contract not found".into(),
            result: None,
        };
        match expect_result(GENERATE_PATH, reply) {
            Err(DappError::RemoteCall { endpoint, message }) => {
                assert_eq!(endpoint, GENERATE_PATH);
                assert_eq!(message, "contract not found");
            }
            other => panic!("expected RemoteCall, got {other:?}"),
        }
    }
}

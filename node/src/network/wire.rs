// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Request and response bodies of the ledger node's REST API.

use dapp_kernel::types::ChainBlock;
use serde::{Deserialize, Serialize};

pub const GENERATE_PATH: &str = "/api/generate-smart-contract";
pub const DEPLOY_PATH: &str = "/api/deploy-smart-contract";
pub const EXECUTE_PATH: &str = "/api/execute-smart-contract";
pub const SIGNATURE_PATH: &str = "/api/signature-response";
pub const FETCH_PATH: &str = "/api/get-smart-contract-token-chain-data";
pub const REGISTER_CALLBACK_PATH: &str = "/api/register-callback-url";

pub const DEPLOY_COMMENT: &str = "Contract deployment";
pub const EXECUTE_COMMENT: &str = "Contract execution";

/// Multipart field names of the generate call.
pub const FIELD_DID: &str = "did";
pub const FIELD_BINARY: &str = "binaryCodePath";
pub const FIELD_RAW: &str = "rawCodePath";
pub const FIELD_SCHEMA: &str = "schemaFilePath";

/// Common `{status, message, result}` envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<T> {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    pub result: Option<T>,
}

/// `result` of deploy/execute: the pending signature request.
#[derive(Debug, Clone, Deserialize)]
pub struct PendingSignature {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployBody<'a> {
    pub comment: &'a str,
    pub deployer_addr: &'a str,
    pub quorum_type: u32,
    pub rbt_amount: f64,
    pub smart_contract_token: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteBody<'a> {
    pub comment: &'a str,
    pub executor_addr: &'a str,
    pub quorum_type: u32,
    pub smart_contract_data: &'a str,
    pub smart_contract_token: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignatureBody<'a> {
    pub id: &'a str,
    pub mode: u8,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchBody<'a> {
    pub token: &'a str,
    pub latest: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterCallbackBody<'a> {
    #[serde(rename = "CallBackURL")]
    pub callback_url: &'a str,
    #[serde(rename = "SmartContractToken")]
    pub smart_contract_token: &'a str,
}

/// Fetch replies carry the blocks next to the status instead of under `result`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainDataReply {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "SCTDataReply", alias = "SCDataReply", default)]
    pub blocks: Option<Vec<ChainBlock>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_field_names() {
        let deploy = DeployBody {
            comment: DEPLOY_COMMENT,
            deployer_addr: "bafyA",
            quorum_type: 2,
            rbt_amount: 0.001,
            smart_contract_token: "QmHash",
        };
        assert_eq!(
            serde_json::to_value(&deploy).unwrap(),
            json!({
                "comment": "Contract deployment",
                "deployerAddr": "bafyA",
                "quorumType": 2,
                "rbtAmount": 0.001,
                "smartContractToken": "QmHash"
            })
        );

        let register = RegisterCallbackBody {
            callback_url: "http://relay/api/call-back-trigger",
            smart_contract_token: "QmHash",
        };
        assert_eq!(
            serde_json::to_value(&register).unwrap(),
            json!({"CallBackURL": "http://relay/api/call-back-trigger", "SmartContractToken": "QmHash"})
        );
    }

    #[test]
    fn test_chain_reply_accepts_both_block_keys() {
        let sct: ChainDataReply = serde_json::from_value(json!({
            "status": true,
            "message": "ok",
            "SCTDataReply": [{"BlockNo": 1, "BlockId": "1-a"}]
        }))
        .unwrap();
        assert_eq!(sct.blocks.unwrap().len(), 1);

        let sc: ChainDataReply = serde_json::from_value(json!({
            "status": true,
            "SCDataReply": [{"BlockNo": 0, "BlockId": "0-g"}, {"BlockNo": 2, "BlockId": "2-b"}]
        }))
        .unwrap();
        assert_eq!(sc.blocks.unwrap()[1].block_id, "2-b");

        let null: ChainDataReply =
            serde_json::from_value(json!({"status": true, "SCTDataReply": null})).unwrap();
        assert!(null.blocks.is_none());
    }

    #[test]
    fn test_envelope_without_result() {
        let env: Envelope<PendingSignature> =
            serde_json::from_value(json!({"status": false, "message": "insufficient balance"})).unwrap();
        assert!(!env.status);
        assert!(env.result.is_none());
    }
}

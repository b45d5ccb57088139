//! Newline-delimited JSON-RPC transport used when the server runs under an agent
//! runtime: one request per input line, one response per output line.

use serde_json::Value;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use crate::{
    mcp::{
        handler::handle_mcp_request,
        protocol::{error_codes, Request, Response},
    },
    AppState,
};

/// Answers a single input line. Blank lines and notifications produce nothing.
pub async fn respond_to_line(line: &str, state: &AppState) -> Option<Response> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    debug!("Received: {}", line);

    match serde_json::from_str::<Request>(line) {
        Ok(request) => handle_mcp_request(request, state.clone()).await,
        Err(parse_error) => {
            error!("JSON parse error: {}", parse_error);
            Some(Response::error(
                Value::Null,
                error_codes::PARSE_ERROR,
                format!("Parse error: {}", parse_error),
            ))
        }
    }
}

/// Serves requests from `reader` until EOF, writing each response to `writer`.
/// A malformed line gets a parse error response; only I/O failures end the loop.
pub async fn serve<R, W>(mut reader: R, mut writer: W, state: AppState) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let response = match std::str::from_utf8(&buf) {
            Ok(line) => respond_to_line(line, &state).await,
            Err(e) => {
                warn!("Dropping non UTF-8 input line: {}", e);
                Some(Response::error(
                    Value::Null,
                    error_codes::PARSE_ERROR,
                    format!("Parse error: input is not valid UTF-8 ({})", e),
                ))
            }
        };
        let Some(response) = response else {
            continue;
        };

        let mut encoded = serde_json::to_vec(&response)?;
        encoded.push(b'\n');
        debug!("Sending: {}", String::from_utf8_lossy(&encoded).trim_end());

        writer.write_all(&encoded).await?;
        writer.flush().await?;
    }

    info!("EOF received, shutting down MCP server");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use ethers_core::abi::{Function, Token};
    use ethers_core::types::{Address, TransactionReceipt, TransactionRequest, TxHash, U256};

    use crate::{blockchain::ContractExecutor, config::Config};

    struct FixedCounter;

    #[async_trait]
    impl ContractExecutor for FixedCounter {
        async fn send_transaction(&self, _tx: TransactionRequest) -> Result<TxHash> {
            Err(anyhow!("read-only"))
        }

        async fn wait_for_receipt(&self, _tx_hash: TxHash) -> Result<TransactionReceipt> {
            Err(anyhow!("read-only"))
        }

        async fn read_contract(
            &self,
            _contract: Address,
            _function: &Function,
            _args: Vec<Token>,
        ) -> Result<Vec<Token>> {
            Ok(vec![Token::Uint(U256::from(9u64))])
        }
    }

    fn state() -> AppState {
        AppState::new(Config::default(), Arc::new(FixedCounter)).unwrap()
    }

    #[tokio::test]
    async fn one_response_per_request_line() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"get_contract_counter"}}"#,
            "\n",
            "not json\n",
        );
        let mut output = Vec::new();

        serve(input.as_bytes(), &mut output, state()).await.unwrap();

        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[1]["result"]["content"][0]["text"], "9");
        assert_eq!(responses[2]["error"]["code"], error_codes::PARSE_ERROR);
    }

    #[tokio::test]
    async fn invalid_utf8_line_does_not_stop_the_server() {
        let mut input = b"\xff\xfe\n".to_vec();
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#);
        input.push(b'\n');
        let mut output = Vec::new();

        serve(&input[..], &mut output, state()).await.unwrap();

        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["error"]["code"], error_codes::PARSE_ERROR);
        assert_eq!(responses[1]["id"], 7);
        assert_eq!(responses[1]["result"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn last_line_without_newline_is_served() {
        let input = r#"{"jsonrpc":"2.0","id":8,"method":"ping"}"#;
        let mut output = Vec::new();

        serve(input.as_bytes(), &mut output, state()).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("\"id\":8"));
    }

    #[tokio::test]
    async fn tool_name_as_method_is_a_call() {
        let response = respond_to_line(
            r#"{"jsonrpc":"2.0","id":"a","method":"deposit_eth","params":{"input":"0.1"}}"#,
            &state(),
        )
        .await
        .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["text"], "Error calling deposit: read-only");
    }
}

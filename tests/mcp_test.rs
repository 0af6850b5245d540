// tests/mcp_test.rs — Integration test: MCP stdio transport over an in-memory pipe

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use velle::audit::{self, LocalJsonlSink, LocalOnly};
use velle::core::clock::SystemClock;
use velle::core::Governor;
use velle::infra::config::Config;
use velle::injector::dry_run::DryRunInjector;
use velle::mcp::McpServer;

fn governor(dir: &TempDir) -> Governor {
    let sink = LocalJsonlSink::new(dir.path().join("audit.jsonl"));
    Governor::new(
        Config::default(),
        Arc::new(DryRunInjector::default()),
        Arc::new(LocalOnly::new(Arc::new(sink))),
        Arc::new(SystemClock),
    )
}

/// Send every line, close stdin, and collect the responses by id.
async fn exchange(governor: Governor, requests: &[Value]) -> HashMap<String, Value> {
    let (mut client_in, server_in) = tokio::io::duplex(64 * 1024);
    let (server_out, client_out) = tokio::io::duplex(64 * 1024);

    let server = tokio::spawn(McpServer::new(governor).serve(server_in, server_out));

    for req in requests {
        client_in
            .write_all(format!("{req}\n").as_bytes())
            .await
            .unwrap();
    }
    client_in.write_all(b"{not json\n\n").await.unwrap();
    drop(client_in);

    let mut responses = HashMap::new();
    let mut lines = BufReader::new(client_out).lines();
    while let Some(line) = lines.next_line().await.unwrap() {
        let value: Value = serde_json::from_str(&line).unwrap();
        responses.insert(value["id"].to_string(), value);
    }
    server.await.unwrap().unwrap();
    responses
}

fn call(id: u64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments },
    })
}

fn tool_body(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn test_session_over_stdio() {
    let dir = TempDir::new().unwrap();
    let responses = exchange(
        governor(&dir),
        &[
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
            call(3, "velle_status", Value::Null),
            call(4, "velle_query", json!({"command": "/exit"})),
            json!({"jsonrpc": "2.0", "id": 5, "method": "resources/list"}),
            call(6, "velle_teleport", json!({})),
            json!({"jsonrpc": "2.0", "id": 7, "method": "tools/call", "params": {}}),
        ],
    )
    .await;

    // Seven requests plus the parse error; the notification gets no reply.
    assert_eq!(responses.len(), 8);

    let init = &responses["1"]["result"];
    assert_eq!(init["protocolVersion"], "2024-11-05");
    assert_eq!(init["serverInfo"]["name"], "velle");

    let tools = responses["2"]["result"]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().filter_map(|t| t["name"].as_str()).collect();
    assert!(names.contains(&"velle_prompt"));
    assert!(names.contains(&"velle_report_cost"));
    let query = tools.iter().find(|t| t["name"] == "velle_query").unwrap();
    let described = query["description"].as_str().unwrap();
    assert!(described.contains("- /context: Visualize context window usage"));
    assert!(!described.contains("/exit"));

    let status = tool_body(&responses["3"]);
    assert_eq!(status["turn_count"], 0);
    assert_eq!(responses["3"]["result"]["isError"], false);

    // Policy denials are answers, not tool faults.
    let blocked = tool_body(&responses["4"]);
    assert_eq!(blocked["error_code"], "COMMAND_BLOCKED");
    assert_eq!(blocked["block_reason"], "session_terminating");
    assert_eq!(responses["4"]["result"]["isError"], false);

    assert_eq!(responses["5"]["error"]["code"], -32601);

    assert_eq!(tool_body(&responses["6"])["error_code"], "UNKNOWN_TOOL");
    assert_eq!(responses["6"]["result"]["isError"], true);

    assert_eq!(responses["7"]["error"]["code"], -32602);
    assert_eq!(responses["null"]["error"]["code"], -32700);

    let records = audit::read_recent(&dir.path().join("audit.jsonl"), 10);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].tool, "velle_query");
    assert_eq!(records[0].outcome, "blocked");
}

#[tokio::test]
async fn test_prompt_acknowledged_before_delivery() {
    let dir = TempDir::new().unwrap();
    let responses = exchange(
        governor(&dir),
        &[call(
            1,
            "velle_prompt",
            json!({"text": "continue with step 2", "delay_ms": 50, "reason": "plan"}),
        )],
    )
    .await;

    let ack = tool_body(&responses["1"]);
    assert_eq!(ack["status"], "injected");
    assert_eq!(ack["turn_count"], 1);
    assert_eq!(ack["delay_ms"], 50);
    assert_eq!(ack["has_follow_up"], false);
}

#[tokio::test]
async fn test_invalid_arguments_flagged() {
    let dir = TempDir::new().unwrap();
    let responses = exchange(
        governor(&dir),
        &[call(1, "velle_report_cost", json!({"spent_usd": "a lot"}))],
    )
    .await;

    let body = tool_body(&responses["1"]);
    assert_eq!(body["error_code"], "INVALID_ARGUMENTS");
    assert_eq!(responses["1"]["result"]["isError"], true);
}

//! 日志管道集成测试
//!
//! 覆盖配置加载、队列消费、降级写入与紧急日志的端到端行为。

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use thinklog::diagnostics::Diagnostics;
use thinklog::env_config::EnvConfig;
use thinklog::sinks::traits::{SinkError, SinkResult};
use thinklog::{
    load_config_from_str, ApiError, ChangeKind, ChannelQueue, EmergencyWriter, FileRecordWriter,
    HttpContext, JsonResponseEmitter, LogMode, LogRecord, ModelChange, RecordWriter,
    RequestSnapshot, StandardSink, SystemSnapshot, ThinkLogConfig, ThinkLogger,
};

/// 始终写入失败的主目标
#[derive(Debug)]
struct BrokenWriter;

#[async_trait]
impl RecordWriter for BrokenWriter {
    async fn write(&self, _record: &LogRecord) -> SinkResult<()> {
        Err(SinkError::Generic("database connection refused".to_string()))
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

fn system() -> Arc<SystemSnapshot> {
    Arc::new(SystemSnapshot {
        runtime_version: "rustc 1.80.0".to_string(),
        framework: "integration/1.0".to_string(),
        memory_usage: "2.00MB".to_string(),
        hostname: Some("test-host".to_string()),
        pid: Some(1),
    })
}

fn read_lines(path: &Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn toml_config(dir: &Path, mode: &str) -> ThinkLogConfig {
    let text = format!(
        r#"
mode = "{mode}"
runtime_dir = '{runtime}'

[sink]
type = "file"
directory = '{logs}'
filename = "model.jsonl"

[model]
except_fields = ["update_time"]
"#,
        mode = mode,
        runtime = dir.join("runtime").display(),
        logs = dir.join("logs").display(),
    );
    load_config_from_str(&text).unwrap()
}

#[tokio::test]
async fn test_model_change_written_from_toml_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = toml_config(dir.path(), "sync");
    assert_eq!(config.mode, LogMode::Sync);

    let logger = ThinkLogger::builder()
        .config(config)
        .system_info(system())
        .diagnostics(Arc::new(Diagnostics::new()))
        .build()
        .unwrap();

    let change = ModelChange::new("Order", "orders", "id", json!(42), ChangeKind::Updated)
        .with_change("status", "paid")
        .with_change("token", "t-secret")
        .with_change("update_time", "2024-05-01 12:00:00");
    logger
        .on_model_event(change, &RequestSnapshot::new("PUT", "/orders/42", "192.168.1.5"))
        .await;

    let records = read_lines(&dir.path().join("logs").join("model.jsonl"));
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record["category"], json!("model_change"));
    assert_eq!(record["model"], json!("Order"));
    assert_eq!(record["table"], json!("orders"));
    assert_eq!(record["pk"], json!("id"));
    assert_eq!(record["id"], json!(42));
    assert_eq!(record["event"], json!("updated"));
    assert_eq!(record["changes"], json!({"status": "paid", "token": "******"}));
    assert_eq!(record["ip"], json!("192.168.1.5"));
    assert_eq!(record["system"]["framework"], json!("integration/1.0"));
}

#[tokio::test]
async fn test_queued_records_drained_by_host_worker() {
    let dir = tempfile::tempdir().unwrap();
    let (queue, mut receiver) = ChannelQueue::bounded("default", 16);
    let logger = ThinkLogger::builder()
        .config(toml_config(dir.path(), "async"))
        .queue(Arc::new(queue))
        .system_info(system())
        .diagnostics(Arc::new(Diagnostics::new()))
        .build()
        .unwrap();

    for id in 1..=3 {
        let change = ModelChange::new("Order", "orders", "id", json!(id), ChangeKind::Created)
            .with_change("status", "new");
        logger.on_model_event(change, &RequestSnapshot::default()).await;
    }
    assert_eq!(logger.policy().diagnostics().snapshot().delivered_async, 3);

    // 所有发送端释放后 drain 才会结束
    drop(logger);

    let worker = FileRecordWriter::new(dir.path().join("worker"), "drained.jsonl").unwrap();
    let written = receiver.drain_into(&worker).await;
    assert_eq!(written, 3);

    let records = read_lines(worker.path());
    let ids: Vec<Value> = records.iter().map(|r| r["id"].clone()).collect();
    assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);
}

#[tokio::test]
async fn test_full_queue_falls_back_to_sync_write() {
    let dir = tempfile::tempdir().unwrap();
    let (queue, _receiver) = ChannelQueue::bounded("default", 1);
    let diagnostics = Arc::new(Diagnostics::new());
    let logger = ThinkLogger::builder()
        .config(toml_config(dir.path(), "async"))
        .queue(Arc::new(queue))
        .system_info(system())
        .diagnostics(diagnostics.clone())
        .build()
        .unwrap();

    for id in 1..=2 {
        let change = ModelChange::new("Order", "orders", "id", json!(id), ChangeKind::Deleted);
        logger.on_model_event(change, &RequestSnapshot::default()).await;
    }

    // 第一条进入队列，第二条因队列已满降级为同步写入
    let records = read_lines(&dir.path().join("logs").join("model.jsonl"));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], json!(2));

    let snapshot = diagnostics.snapshot();
    assert_eq!(snapshot.delivered_async, 1);
    assert_eq!(snapshot.async_fallbacks, 1);
    assert_eq!(snapshot.delivered_sync, 1);
}

#[tokio::test]
async fn test_broken_writer_lands_in_emergency_log() {
    let dir = tempfile::tempdir().unwrap();
    let runtime_log = dir.path().join("runtime").join("log");
    let config = ThinkLogConfig {
        mode: LogMode::Sync,
        runtime_dir: dir.path().join("runtime"),
        ..Default::default()
    };

    let sink = StandardSink::new(
        Arc::new(BrokenWriter),
        EmergencyWriter::from_config(&config),
    );
    let diagnostics = Arc::new(Diagnostics::new());
    let logger = ThinkLogger::builder()
        .config(config)
        .sink(Arc::new(sink))
        .system_info(system())
        .diagnostics(diagnostics.clone())
        .build()
        .unwrap();

    // 客户端响应不受日志失败影响
    let error = ApiError::new(0, "token expired").with_category("auth");
    let request = RequestSnapshot::new("GET", "/profile", "10.1.1.1")
        .with_header("Cookie", "session=abc")
        .with_param("token", "t-123");
    let response = logger
        .handle_api_error(&error, &request, &JsonResponseEmitter::default())
        .await;
    assert_eq!(response.status, 401);
    let body: Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["message"], json!("未授权访问"));

    let text = std::fs::read_to_string(runtime_log.join("api_emergency.log")).unwrap();
    let block: Value = serde_json::from_str(text.trim_end()).unwrap();
    assert_eq!(block["error"], json!("Generic error: database connection refused"));
    assert_eq!(block["context"]["request_id"], body["request_id"]);
    assert_eq!(block["context"]["request"]["headers"]["Cookie"], json!("******"));
    assert_eq!(block["context"]["request"]["params"]["token"], json!("******"));

    // 模型事件写入另一个紧急日志文件
    let change = ModelChange::new("Order", "orders", "id", json!(7), ChangeKind::Restored);
    logger.on_model_event(change, &RequestSnapshot::default()).await;
    let text = std::fs::read_to_string(runtime_log.join("model_emergency.log")).unwrap();
    assert!(text.contains("Model log failed: Generic error: database connection refused"));
    assert!(text.contains("Event: restored"));

    let snapshot = diagnostics.snapshot();
    assert_eq!(snapshot.sync_failures, 2);
    assert_eq!(snapshot.emergency_writes, 2);
}

#[tokio::test]
async fn test_log_api_error_with_existing_response() {
    let dir = tempfile::tempdir().unwrap();
    let logger = ThinkLogger::builder()
        .config(toml_config(dir.path(), "sync"))
        .system_info(system())
        .build()
        .unwrap();

    let http = HttpContext::new(500)
        .with_header("Set-Cookie", "sid=1")
        .with_body("<html>Internal Server Error</html>");
    logger
        .log_api_error(
            ApiError::new(0, "division by zero"),
            http,
            &RequestSnapshot::new("GET", "/report", "127.0.0.1"),
        )
        .await;

    let records = read_lines(&dir.path().join("logs").join("model.jsonl"));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["response"]["status"], json!(500));
    assert_eq!(
        records[0]["response"]["data"],
        json!("<html>Internal Server Error</html>")
    );
    assert_eq!(records[0]["error"]["message"], json!("division by zero"));
}

#[test]
fn test_env_overrides_on_loaded_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = toml_config(dir.path(), "async");

    EnvConfig::apply_overrides_with(&mut config, |key| match key {
        "THINKLOG_MODE" => Some("sync".to_string()),
        "THINKLOG_DEBUG" => Some("on".to_string()),
        _ => None,
    })
    .unwrap();

    assert_eq!(config.mode, LogMode::Sync);
    assert!(config.debug);
    assert_eq!(config.queue_name, "default");
}

//! thinklog 入口
//!
//! [`ThinkLogger`] 是宿主调用的唯一入口：API 异常处理、API 异常记录与模型事件记录。
//! 三个入口都不会返回错误，日志投递失败只会体现在紧急日志与诊断计数中。

use crate::config::{validate_config, ThinkLogConfig};
use crate::core::context::{
    generate_request_id, EventContextBuilder, RequestSnapshotProvider, SystemSnapshotProvider,
};
use crate::core::dispatch::{DispatchOutcome, DispatchPolicy};
use crate::core::event::{ApiError, HttpContext, LogEvent, ModelChange};
use crate::core::response::{render_client_body, ClientBody, ResponseEmitter, StatusMap};
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::sinks::standard::StandardSink;
use crate::sinks::traits::{LogQueue, LogSink};
use crate::utils::system_info::ProcessSystemInfo;
use std::sync::Arc;

#[derive(Clone)]
pub struct ThinkLogger {
    config: ThinkLogConfig,
    context: EventContextBuilder,
    policy: DispatchPolicy,
    status_map: StatusMap,
    sink: Arc<dyn LogSink>,
    system: Arc<dyn SystemSnapshotProvider>,
}

/// ThinkLogger 构建器
#[derive(Default)]
pub struct ThinkLoggerBuilder {
    config: ThinkLogConfig,
    sink: Option<Arc<dyn LogSink>>,
    queue: Option<Arc<dyn LogQueue>>,
    system: Option<Arc<dyn SystemSnapshotProvider>>,
    diagnostics: Option<Arc<Diagnostics>>,
}

impl std::fmt::Debug for ThinkLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThinkLogger")
            .field("config", &self.config)
            .field("policy", &self.policy)
            .field("sink", &self.sink)
            .finish()
    }
}

impl ThinkLogger {
    pub fn builder() -> ThinkLoggerBuilder {
        ThinkLoggerBuilder::default()
    }

    /// 使用配置构建，主目标与紧急日志均由配置决定
    pub fn with_config(config: ThinkLogConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    pub fn config(&self) -> &ThinkLogConfig {
        &self.config
    }

    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.sink
    }

    pub fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    pub fn status_map(&self) -> &StatusMap {
        &self.status_map
    }

    /// 处理 API 异常：生成客户端响应，并以同一个关联 ID 记录日志
    ///
    /// 返回的响应与日志是否投递成功无关。
    pub async fn handle_api_error<E: ResponseEmitter>(
        &self,
        error: &ApiError,
        request: &dyn RequestSnapshotProvider,
        emitter: &E,
    ) -> E::Response {
        let request_id = generate_request_id();
        let status = self.status_map.classify(error);
        let body = render_client_body(error, status, &request_id, self.config.debug);

        let http = response_context(&body, status);
        self.dispatch_event(
            LogEvent::api_error(error.clone(), http),
            request,
            Some(request_id),
        )
        .await;

        emitter.emit(&body, status)
    }

    /// 记录一个已经产生响应的 API 异常
    pub async fn log_api_error(
        &self,
        error: ApiError,
        http: HttpContext,
        request: &dyn RequestSnapshotProvider,
    ) {
        self.dispatch_event(LogEvent::api_error(error, http), request, None)
            .await;
    }

    /// 记录一次模型写入事件
    pub async fn on_model_event(&self, change: ModelChange, request: &dyn RequestSnapshotProvider) {
        self.dispatch_event(LogEvent::model_change(change), request, None)
            .await;
    }

    /// 构建并投递一条记录，返回投递结果
    ///
    /// `request_id` 为空时生成新的关联 ID。
    pub async fn dispatch_event(
        &self,
        event: LogEvent,
        request: &dyn RequestSnapshotProvider,
        request_id: Option<String>,
    ) -> DispatchOutcome {
        let request = request.request_snapshot();
        let system = self.system.system_snapshot();
        let request_id = request_id.unwrap_or_else(generate_request_id);

        let record = self
            .context
            .build_with_id(&event, &request, &system, request_id);
        self.policy.diagnostics().increment_records_built();

        let outcome = self.policy.dispatch(&record, self.sink.as_ref()).await;
        tracing::debug!(
            request_id = %record.request_id,
            category = %record.category,
            outcome = %outcome,
            "log record dispatched"
        );
        outcome
    }
}

/// 把客户端错误体还原为日志中的响应信息
fn response_context(body: &ClientBody, status: u16) -> HttpContext {
    let context = HttpContext::new(status).with_header("Content-Type", "application/json");
    match serde_json::to_string(body) {
        Ok(text) => context.with_body(text),
        Err(e) => {
            tracing::debug!(error = %e, "client body could not be serialized for the log record");
            context
        }
    }
}

impl ThinkLoggerBuilder {
    pub fn config(mut self, config: ThinkLogConfig) -> Self {
        self.config = config;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// 使用自定义 sink，此时配置中的主目标与队列设置不生效
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// 注册宿主队列；只在构建时读取一次可用性
    pub fn queue(mut self, queue: Arc<dyn LogQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn system_info(mut self, system: Arc<dyn SystemSnapshotProvider>) -> Self {
        self.system = Some(system);
        self
    }

    /// 使用独立的诊断实例，默认使用全局实例
    pub fn diagnostics(mut self, diagnostics: Arc<Diagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    pub fn build(self) -> Result<ThinkLogger> {
        validate_config(&self.config)?;

        let sink: Arc<dyn LogSink> = match self.sink {
            Some(sink) => sink,
            None => Arc::new(StandardSink::from_config(&self.config, self.queue)?),
        };

        let mut policy = DispatchPolicy::from_config(&self.config);
        if let Some(diagnostics) = self.diagnostics {
            policy = policy.with_diagnostics(diagnostics);
        }

        let system = self
            .system
            .unwrap_or_else(|| Arc::new(ProcessSystemInfo::default()));

        tracing::debug!(
            mode = ?self.config.mode,
            sink = sink.name(),
            has_queue = sink.has_queue(),
            "thinklog initialized"
        );

        Ok(ThinkLogger {
            context: EventContextBuilder::from_config(&self.config),
            status_map: StatusMap::from_config(&self.config.api_error),
            policy,
            sink,
            system,
            config: self.config,
        })
    }
}

//! 基于 tokio mpsc 的队列实现
//!
//! 宿主可以直接使用 [`ChannelQueue`] 作为 [`LogQueue`]，在自己的任务里
//! 通过 [`QueueReceiver`] 消费记录。本库不会自行派生消费任务。

use crate::sinks::traits::{DispatchError, DispatchResult, LogQueue, QueuedRecord, RecordWriter};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};

/// 有界通道队列的发送端
#[derive(Debug, Clone)]
pub struct ChannelQueue {
    name: String,
    sender: mpsc::Sender<QueuedRecord>,
}

/// 有界通道队列的接收端
#[derive(Debug)]
pub struct QueueReceiver {
    name: String,
    receiver: mpsc::Receiver<QueuedRecord>,
}

impl ChannelQueue {
    /// 创建容量为 `capacity` 的队列，返回发送端与接收端
    pub fn bounded(name: impl Into<String>, capacity: usize) -> (ChannelQueue, QueueReceiver) {
        let name = name.into();
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            ChannelQueue {
                name: name.clone(),
                sender,
            },
            QueueReceiver { name, receiver },
        )
    }
}

#[async_trait]
impl LogQueue for ChannelQueue {
    async fn push(&self, job: QueuedRecord) -> DispatchResult<()> {
        // 队列满时不等待，由调用方回退到同步写入
        self.sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => DispatchError::Full(self.name.clone()),
            TrySendError::Closed(_) => DispatchError::Closed(self.name.clone()),
        })
    }

    fn is_available(&self) -> bool {
        !self.sender.is_closed()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl QueueReceiver {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 等待下一条任务，所有发送端关闭后返回 `None`
    pub async fn recv(&mut self) -> Option<QueuedRecord> {
        self.receiver.recv().await
    }

    /// 持续消费直到所有发送端关闭，返回成功写入的条数
    ///
    /// 单条写入失败只记录日志并跳过。
    pub async fn drain_into(&mut self, writer: &dyn RecordWriter) -> usize {
        let mut written = 0;
        while let Some(job) = self.receiver.recv().await {
            if self.write_job(writer, &job).await {
                written += 1;
            }
        }
        if let Err(e) = writer.flush().await {
            tracing::warn!(queue = %self.name, error = %e, "failed to flush writer after drain");
        }
        written
    }

    /// 只处理当前已排队的任务，不等待新任务
    pub async fn process_pending(&mut self, writer: &dyn RecordWriter) -> usize {
        let mut written = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(job) => {
                    if self.write_job(writer, &job).await {
                        written += 1;
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        written
    }

    async fn write_job(&self, writer: &dyn RecordWriter, job: &QueuedRecord) -> bool {
        match writer.write(&job.record).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    queue = %self.name,
                    job = %job.job,
                    request_id = %job.record.request_id,
                    error = %e,
                    "queued log record could not be written"
                );
                false
            }
        }
    }
}

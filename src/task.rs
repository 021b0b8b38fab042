// 该文件是 Liefeng （裂缝检测） 项目的一部分。
// src/task.rs - 推理线程池与分类流水线
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{
  sync::{Arc, Mutex, mpsc},
  thread::{self, JoinHandle},
  time::Instant,
};

use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  Config,
  decision::{ClassificationResult, DecisionMapper},
  error::ClassifyError,
  model::{Model, RawOutput},
  preprocess::{PreprocessPolicy, Preprocessor},
  tensor::NhwcTensor,
};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
pub type InferenceResult = Result<RawOutput, BoxError>;

type Job = (NhwcTensor, mpsc::Sender<InferenceResult>);

#[derive(Error, Debug)]
pub enum PoolError {
  #[error("线程池至少需要一个工作线程")]
  NoWorkers,
  #[error("无法创建工作线程: {0}")]
  Spawn(#[from] std::io::Error),
  #[error("推理线程池已关闭")]
  Closed,
  #[error("工作线程未返回推理结果")]
  WorkerGone,
}

/// 固定大小的推理线程池，模型推理不占用请求处理线程
pub struct InferencePool {
  sender: Option<mpsc::Sender<Job>>,
  workers: Vec<JoinHandle<()>>,
}

impl InferencePool {
  pub fn new<M>(model: M, workers: usize) -> Result<Self, PoolError>
  where
    M: Model + Send + Sync + 'static,
    M::Error: std::error::Error + Send + Sync + 'static,
  {
    if workers == 0 {
      return Err(PoolError::NoWorkers);
    }

    let model = Arc::new(model);
    let (sender, receiver) = mpsc::channel::<Job>();
    let receiver = Arc::new(Mutex::new(receiver));

    let handles = (0..workers)
      .map(|index| {
        let model = Arc::clone(&model);
        let receiver = Arc::clone(&receiver);
        thread::Builder::new()
          .name(format!("liefeng-infer-{}", index))
          .spawn(move || worker_loop(index, model, receiver))
      })
      .collect::<Result<Vec<_>, _>>()?;

    info!("推理线程池已启动, 工作线程数: {}", workers);
    Ok(Self {
      sender: Some(sender),
      workers: handles,
    })
  }

  /// 仍在运行的工作线程数，模型 panic 会带走所在线程
  pub fn workers(&self) -> usize {
    self.workers.iter().filter(|w| !w.is_finished()).count()
  }

  /// 启动时的工作线程数
  pub fn capacity(&self) -> usize {
    self.workers.len()
  }

  /// 提交推理任务，丢弃返回的接收端即放弃该次推理
  pub fn submit(&self, tensor: NhwcTensor) -> Result<mpsc::Receiver<InferenceResult>, PoolError> {
    let sender = self.sender.as_ref().ok_or(PoolError::Closed)?;
    let (reply, receiver) = mpsc::channel();
    sender
      .send((tensor, reply))
      .map_err(|_| PoolError::Closed)?;
    Ok(receiver)
  }

  /// 提交并等待结果
  pub fn infer(&self, tensor: NhwcTensor) -> Result<InferenceResult, PoolError> {
    self
      .submit(tensor)?
      .recv()
      .map_err(|_| PoolError::WorkerGone)
  }
}

impl Drop for InferencePool {
  fn drop(&mut self) {
    drop(self.sender.take());
    for worker in self.workers.drain(..) {
      if worker.join().is_err() {
        warn!("推理工作线程异常退出");
      }
    }
    debug!("推理线程池已关闭");
  }
}

fn worker_loop<M>(index: usize, model: Arc<M>, receiver: Arc<Mutex<mpsc::Receiver<Job>>>)
where
  M: Model,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  loop {
    let job = match receiver.lock() {
      Ok(rx) => rx.recv(),
      Err(_) => {
        warn!("工作线程 {}: 任务队列锁已损坏, 退出", index);
        break;
      }
    };
    let Ok((tensor, reply)) = job else {
      debug!("工作线程 {}: 任务队列已关闭, 退出", index);
      break;
    };

    let now = Instant::now();
    let result = model.infer(&tensor).map_err(|e| Box::new(e) as BoxError);
    debug!("工作线程 {}: 推理完成，耗时: {:.2?}", index, now.elapsed());

    if reply.send(result).is_err() {
      warn!("工作线程 {}: 调用方已放弃请求, 丢弃推理结果", index);
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Health {
  pub status: &'static str,
  pub policy: PreprocessPolicy,
  pub target_size: (u32, u32),
  pub class_names: [String; 2],
  pub threshold: f32,
  /// 存活的推理线程数，没有线程池时为 `None`
  pub workers: Option<usize>,
}

impl Health {
  /// 仅反映配置，不含线程池状态
  pub fn from_config(config: &Config) -> Self {
    Self {
      status: "ok",
      policy: config.policy(),
      target_size: config.target_size(),
      class_names: config.class_names().clone(),
      threshold: config.threshold(),
      workers: None,
    }
  }

  fn with_pool(mut self, pool: &InferencePool) -> Self {
    let alive = pool.workers();
    self.status = match alive {
      0 => "unavailable",
      n if n < pool.capacity() => "degraded",
      _ => "ok",
    };
    self.workers = Some(alive);
    self
  }

  pub fn to_json(&self) -> Value {
    json!({
      "status": self.status,
      "policy": self.policy.as_str(),
      "target_size": [self.target_size.0, self.target_size.1],
      "class_names": self.class_names,
      "threshold": self.threshold,
      "workers": self.workers,
    })
  }
}

/// 预处理 -> 推理 -> 决策 的完整分类流水线
pub struct Classifier {
  config: Config,
  preprocessor: Preprocessor,
  mapper: DecisionMapper,
  pool: InferencePool,
}

impl Classifier {
  pub fn new<M>(config: &Config, model: M, workers: usize) -> Result<Self, PoolError>
  where
    M: Model + Send + Sync + 'static,
    M::Error: std::error::Error + Send + Sync + 'static,
  {
    let preprocessor = Preprocessor::from_config(config);
    info!(
      "分类器使用预处理策略: {}, 输入尺寸 {}x{}",
      preprocessor.policy(),
      preprocessor.target_size().0,
      preprocessor.target_size().1
    );
    Ok(Self {
      config: config.clone(),
      preprocessor,
      mapper: DecisionMapper::from_config(config),
      pool: InferencePool::new(model, workers)?,
    })
  }

  pub fn preprocessor(&self) -> &Preprocessor {
    &self.preprocessor
  }

  pub fn mapper(&self) -> &DecisionMapper {
    &self.mapper
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn health(&self) -> Health {
    Health::from_config(&self.config).with_pool(&self.pool)
  }

  /// `content_type` 仅作提示：非 image/* 直接拒绝，其余情况仍以解码结果为准
  pub fn classify(
    &self,
    bytes: &[u8],
    content_type: Option<&str>,
  ) -> Result<ClassificationResult, ClassifyError> {
    if let Some(content_type) = content_type
      && !is_image_content_type(content_type)
    {
      warn!("拒绝非图像内容类型: {}", content_type);
      return Err(ClassifyError::UnsupportedMediaType(content_type.to_string()));
    }

    let now = Instant::now();
    let tensor = self.preprocessor.preprocess(bytes)?;
    let preprocessed = now.elapsed();

    let output = self.pool.infer(tensor)?.map_err(ClassifyError::Inference)?;
    let inferred = now.elapsed();

    let result = self.mapper.decide(&output)?;
    info!(
      "分类完成: {} ({:.4}), 耗时: {:.2?} / {:.2?} / {:.2?}",
      result.label,
      result.prob,
      preprocessed,
      inferred,
      now.elapsed()
    );
    Ok(result)
  }
}

fn is_image_content_type(content_type: &str) -> bool {
  content_type
    .trim()
    .to_ascii_lowercase()
    .starts_with("image/")
}

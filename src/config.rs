// 该文件是 Liefeng （裂缝检测） 项目的一部分。
// src/config.rs - 进程级不可变配置
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

use thiserror::Error;
use tracing::{debug, info};

use crate::preprocess::PreprocessPolicy;

pub const ENV_CLASS_NAMES: &str = "CLASS_NAMES";
pub const ENV_THRESHOLD: &str = "THRESHOLD";
pub const ENV_PREPROCESS_POLICY: &str = "PREPROCESS_POLICY";
pub const ENV_TARGET_SIZE: &str = "TARGET_SIZE";

pub const DEFAULT_CLASS_NAMES: [&str; 2] = ["no_crack", "crack"];
pub const DEFAULT_THRESHOLD: f32 = 0.5;
pub const DEFAULT_TARGET_SIZE: (u32, u32) = (224, 224);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
  #[error("类别名称必须恰好为两个非空名称, 实际为: {0:?}")]
  ClassNames(Vec<String>),
  #[error("阈值无法解析: {0}")]
  ThresholdParse(String),
  #[error("阈值必须位于 [0, 1] 区间, 实际为 {0}")]
  ThresholdRange(f32),
  #[error("目标尺寸无效: {0}, 期望格式为 WxH")]
  TargetSize(String),
  #[error("未知的预处理策略: {0}")]
  UnknownPolicy(String),
}

/// 分类流水线配置，启动时构造一次，之后只读
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
  class_names: [String; 2],
  threshold: f32,
  target_size: (u32, u32),
  policy: PreprocessPolicy,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      class_names: DEFAULT_CLASS_NAMES.map(String::from),
      threshold: DEFAULT_THRESHOLD,
      target_size: DEFAULT_TARGET_SIZE,
      policy: PreprocessPolicy::default(),
    }
  }
}

impl Config {
  pub fn new(
    class_names: [String; 2],
    threshold: f32,
    target_size: (u32, u32),
    policy: PreprocessPolicy,
  ) -> Result<Self, ConfigError> {
    Self::default()
      .with_class_names(class_names)?
      .with_threshold(threshold)?
      .with_target_size(target_size)
      .map(|config| config.with_policy(policy))
  }

  /// 从进程环境变量读取配置，未设置的项使用默认值
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let mut config = Self::default();

    if let Some(names) = lookup(ENV_CLASS_NAMES) {
      debug!("{} = {}", ENV_CLASS_NAMES, names);
      config = config.with_class_names(parse_class_names(&names)?)?;
    }
    if let Some(threshold) = lookup(ENV_THRESHOLD) {
      debug!("{} = {}", ENV_THRESHOLD, threshold);
      let value = threshold
        .trim()
        .parse::<f32>()
        .map_err(|_| ConfigError::ThresholdParse(threshold.clone()))?;
      config = config.with_threshold(value)?;
    }
    if let Some(size) = lookup(ENV_TARGET_SIZE) {
      debug!("{} = {}", ENV_TARGET_SIZE, size);
      config = config.with_target_size(parse_target_size(&size)?)?;
    }
    if let Some(policy) = lookup(ENV_PREPROCESS_POLICY) {
      debug!("{} = {}", ENV_PREPROCESS_POLICY, policy);
      config = config.with_policy(policy.parse()?);
    }

    info!(
      "配置加载完成: 类别 {:?}, 阈值 {}, 目标尺寸 {}x{}, 预处理策略 {}",
      config.class_names, config.threshold, config.target_size.0, config.target_size.1, config.policy
    );
    Ok(config)
  }

  pub fn with_class_names(mut self, class_names: [String; 2]) -> Result<Self, ConfigError> {
    if class_names.iter().any(|name| name.trim().is_empty()) {
      return Err(ConfigError::ClassNames(class_names.to_vec()));
    }
    self.class_names = class_names;
    Ok(self)
  }

  pub fn with_threshold(mut self, threshold: f32) -> Result<Self, ConfigError> {
    if !(0.0..=1.0).contains(&threshold) {
      return Err(ConfigError::ThresholdRange(threshold));
    }
    self.threshold = threshold;
    Ok(self)
  }

  pub fn with_target_size(mut self, target_size: (u32, u32)) -> Result<Self, ConfigError> {
    if target_size.0 == 0 || target_size.1 == 0 {
      return Err(ConfigError::TargetSize(format!(
        "{}x{}",
        target_size.0, target_size.1
      )));
    }
    self.target_size = target_size;
    Ok(self)
  }

  pub fn with_policy(mut self, policy: PreprocessPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn class_names(&self) -> &[String; 2] {
    &self.class_names
  }

  pub fn negative_class(&self) -> &str {
    &self.class_names[0]
  }

  pub fn positive_class(&self) -> &str {
    &self.class_names[1]
  }

  pub fn threshold(&self) -> f32 {
    self.threshold
  }

  /// (宽, 高)
  pub fn target_size(&self) -> (u32, u32) {
    self.target_size
  }

  pub fn policy(&self) -> PreprocessPolicy {
    self.policy
  }
}

fn parse_class_names(raw: &str) -> Result<[String; 2], ConfigError> {
  let names: Vec<String> = raw.split(',').map(|s| s.trim().to_string()).collect();
  match <[String; 2]>::try_from(names) {
    Ok(pair) => Ok(pair),
    Err(names) => Err(ConfigError::ClassNames(names)),
  }
}

/// 解析 "WxH" 或单个 "N"（表示 NxN）
pub fn parse_target_size(raw: &str) -> Result<(u32, u32), ConfigError> {
  let invalid = || ConfigError::TargetSize(raw.to_string());
  let lowered = raw.trim().to_ascii_lowercase();
  let (w, h) = match lowered.split_once('x') {
    Some((w, h)) => (w.trim(), h.trim()),
    None => (lowered.as_str(), lowered.as_str()),
  };
  let width = w.parse::<u32>().map_err(|_| invalid())?;
  let height = h.parse::<u32>().map_err(|_| invalid())?;
  if width == 0 || height == 0 {
    return Err(invalid());
  }
  Ok((width, height))
}

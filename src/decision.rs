// 该文件是 Liefeng （裂缝检测） 项目的一部分。
// src/decision.rs - 模型输出到分类结果的映射
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

use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, error};

use crate::{Config, model::RawOutput};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecisionError {
  #[error("模型输出形状异常: {0:?}, 期望 (1, K)")]
  Shape(Vec<usize>),
  #[error("不支持的类别数量: {0}")]
  UnsupportedClassCount(usize),
  #[error("模型得分 {0} 无效")]
  InvalidScore(f32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
  pub label: String,
  /// 返回标签自身的置信度
  pub prob: f32,
}

impl ClassificationResult {
  pub fn to_json(&self) -> Value {
    json!({
      "label": self.label,
      "prob": self.prob,
    })
  }
}

#[derive(Debug, Clone)]
pub struct DecisionMapper {
  class_names: [String; 2],
  threshold: f32,
}

impl DecisionMapper {
  pub fn new(class_names: [String; 2], threshold: f32) -> Self {
    Self {
      class_names,
      threshold,
    }
  }

  pub fn from_config(config: &Config) -> Self {
    Self::new(config.class_names().clone(), config.threshold())
  }

  pub fn decide(&self, output: &RawOutput) -> Result<ClassificationResult, DecisionError> {
    let shape = output.shape();
    if shape.len() != 2 || shape[0] != 1 {
      error!("模型输出形状异常: {:?}", shape);
      return Err(DecisionError::Shape(shape.to_vec()));
    }

    let scores = output.data();
    let (index, prob) = match shape[1] {
      1 => self.sigmoid_decision(checked_score(scores[0], true)?),
      2 => {
        // 两列可以是 softmax 概率，也可以是未归一化的 logit
        for &score in scores {
          checked_score(score, false)?;
        }
        argmax(scores)
      }
      k => {
        error!("不支持的类别数量: {}", k);
        return Err(DecisionError::UnsupportedClassCount(k));
      }
    };

    debug!("模型输出 {:?} -> 类别 {} ({})", scores, index, prob);
    Ok(ClassificationResult {
      label: self.class_names[index].clone(),
      prob,
    })
  }

  /// 单个 sigmoid 值是正类概率，等于阈值时判为正类
  fn sigmoid_decision(&self, positive: f32) -> (usize, f32) {
    if positive >= self.threshold {
      (1, positive)
    } else {
      (0, 1.0 - positive)
    }
  }
}

/// 得分必须是有限值；sigmoid 概率还必须位于 [0, 1]
fn checked_score(score: f32, probability: bool) -> Result<f32, DecisionError> {
  if !score.is_finite() || (probability && !(0.0..=1.0).contains(&score)) {
    error!("模型得分异常: {}", score);
    return Err(DecisionError::InvalidScore(score));
  }
  Ok(score)
}

/// 并列时取下标较小者
fn argmax(scores: &[f32]) -> (usize, f32) {
  let mut best = (0, scores[0]);
  for (i, &score) in scores.iter().enumerate().skip(1) {
    if score > best.1 {
      best = (i, score);
    }
  }
  best
}

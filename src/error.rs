// 该文件是 Liefeng （裂缝检测） 项目的一部分。
// src/error.rs - 流水线错误汇总
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

use crate::{decision::DecisionError, preprocess::PreprocessError, task::PoolError};

/// 错误归属：调用方输入问题，或服务端/模型契约问题
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
  Client,
  Server,
}

#[derive(Error, Debug)]
pub enum ClassifyError {
  #[error("不支持的内容类型: {0}")]
  UnsupportedMediaType(String),
  #[error("预处理错误: {0}")]
  Preprocess(#[from] PreprocessError),
  #[error("模型推理错误: {0}")]
  Inference(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
  #[error("推理线程池错误: {0}")]
  Pool(#[from] PoolError),
  #[error("决策错误: {0}")]
  Decision(#[from] DecisionError),
}

impl ClassifyError {
  pub fn fault_kind(&self) -> FaultKind {
    match self {
      ClassifyError::UnsupportedMediaType(_) | ClassifyError::Preprocess(_) => FaultKind::Client,
      ClassifyError::Inference(_) | ClassifyError::Pool(_) | ClassifyError::Decision(_) => {
        FaultKind::Server
      }
    }
  }

  /// 服务层可直接使用的 HTTP 状态码
  pub fn status_code(&self) -> u16 {
    match self.fault_kind() {
      FaultKind::Client => 400,
      FaultKind::Server => 500,
    }
  }

  /// 稳定的错误代码，便于服务层返回给调用方
  pub fn code(&self) -> &'static str {
    match self {
      ClassifyError::UnsupportedMediaType(_) => "unsupported_media_type",
      ClassifyError::Preprocess(PreprocessError::InvalidImage(_))
      | ClassifyError::Preprocess(PreprocessError::EmptyImage { .. }) => "invalid_image",
      ClassifyError::Preprocess(PreprocessError::ImageTooSmall { .. }) => "image_too_small",
      ClassifyError::Inference(_) => "inference_failed",
      ClassifyError::Pool(_) => "inference_unavailable",
      ClassifyError::Decision(DecisionError::Shape(_)) => "unexpected_output_shape",
      ClassifyError::Decision(DecisionError::UnsupportedClassCount(_)) => {
        "unsupported_class_count"
      }
      ClassifyError::Decision(DecisionError::InvalidScore(_)) => "invalid_score",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn input_faults_are_client_errors() {
    let err = ClassifyError::from(PreprocessError::ImageTooSmall {
      width: 10,
      height: 10,
      crop_width: 224,
      crop_height: 224,
    });
    assert_eq!(err.fault_kind(), FaultKind::Client);
    assert_eq!(err.status_code(), 400);
    assert_eq!(err.code(), "image_too_small");

    let err = ClassifyError::UnsupportedMediaType("text/plain".into());
    assert_eq!(err.fault_kind(), FaultKind::Client);
  }

  #[test]
  fn model_contract_faults_are_server_errors() {
    for (err, code) in [
      (DecisionError::Shape(vec![2, 1]), "unexpected_output_shape"),
      (DecisionError::UnsupportedClassCount(3), "unsupported_class_count"),
    ] {
      let err = ClassifyError::from(err);
      assert_eq!(err.fault_kind(), FaultKind::Server);
      assert_eq!(err.status_code(), 500);
      assert_eq!(err.code(), code);
    }
  }
}

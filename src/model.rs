// 该文件是 Liefeng （裂缝检测） 项目的一部分。
// src/model.rs - 模型接口
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

use crate::tensor::NhwcTensor;

/// 外部分类模型，本库只把它当作不透明的同步函数
pub trait Model {
  type Error;

  fn infer(&self, input: &NhwcTensor) -> Result<RawOutput, Self::Error>;
}

impl<M: Model + ?Sized> Model for std::sync::Arc<M> {
  type Error = M::Error;

  fn infer(&self, input: &NhwcTensor) -> Result<RawOutput, Self::Error> {
    (**self).infer(input)
  }
}

/// 模型原始输出，保留任意形状以便检查契约
#[derive(Debug, Clone, PartialEq)]
pub struct RawOutput {
  shape: Box<[usize]>,
  data: Box<[f32]>,
}

impl RawOutput {
  /// 形状与数据长度不一致时返回 None
  pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Option<Self> {
    if shape.iter().product::<usize>() != data.len() {
      return None;
    }
    Some(Self {
      shape: shape.into_boxed_slice(),
      data: data.into_boxed_slice(),
    })
  }

  /// 由行构造二维输出，各行长度必须一致
  pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Option<Self> {
    let cols = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
    if rows.iter().any(|r| r.as_ref().len() != cols) {
      return None;
    }
    let data: Vec<f32> = rows.iter().flat_map(|r| r.as_ref().iter().copied()).collect();
    Self::new(vec![rows.len(), cols], data)
  }

  /// 单样本 (1, K) 输出
  pub fn single(scores: &[f32]) -> Self {
    Self {
      shape: vec![1, scores.len()].into_boxed_slice(),
      data: scores.to_vec().into_boxed_slice(),
    }
  }

  pub fn shape(&self) -> &[usize] {
    &self.shape
  }

  pub fn data(&self) -> &[f32] {
    &self.data
  }

  pub fn rank(&self) -> usize {
    self.shape.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_inconsistent_shape() {
    assert!(RawOutput::new(vec![1, 2], vec![0.5]).is_none());
    assert!(RawOutput::from_rows(&[vec![0.1f32, 0.2], vec![0.3]]).is_none());
  }

  #[test]
  fn from_rows_is_row_major() {
    let output = RawOutput::from_rows(&[[0.1f32, 0.2], [0.3, 0.4]]).unwrap();
    assert_eq!(output.shape(), &[2, 2]);
    assert_eq!(output.data(), &[0.1, 0.2, 0.3, 0.4]);
  }

  #[test]
  fn single_is_unit_batch() {
    let output = RawOutput::single(&[0.7]);
    assert_eq!(output.shape(), &[1, 1]);
    assert_eq!(output.rank(), 2);
  }
}

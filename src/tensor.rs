// 该文件是 Liefeng （裂缝检测） 项目的一部分。
// src/tensor.rs - NHWC 浮点张量定义
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

pub const RGB_CHANNELS: usize = 3;
pub const BATCH_SIZE: usize = 1;

/// 形状为 (1, H, W, 3) 的 f32 张量，批次维度恒为 1
#[derive(Debug, Clone, PartialEq)]
pub struct NhwcTensor {
  height: usize,
  width: usize,
  data: Box<[f32]>,
}

impl NhwcTensor {
  pub fn with_shape(height: usize, width: usize) -> Self {
    let size = RGB_CHANNELS * height * width;
    Self {
      height,
      width,
      data: vec![0f32; size].into_boxed_slice(),
    }
  }

  pub fn shape(&self) -> [usize; 4] {
    [BATCH_SIZE, self.height, self.width, RGB_CHANNELS]
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  fn index(&self, y: usize, x: usize, c: usize) -> usize {
    (y * self.width + x) * RGB_CHANNELS + c
  }

  /// 读取 (0, y, x, c) 处的值，越界返回 None
  pub fn get(&self, y: usize, x: usize, c: usize) -> Option<f32> {
    if y >= self.height || x >= self.width || c >= RGB_CHANNELS {
      return None;
    }
    Some(self.data[self.index(y, x, c)])
  }

  pub(crate) fn set(&mut self, y: usize, x: usize, c: usize, value: f32) {
    let index = self.index(y, x, c);
    self.data[index] = value;
  }

  pub fn as_nhwc(&self) -> &[f32] {
    &self.data
  }

  /// 返回 (最小值, 最大值, 均值)
  pub fn summary(&self) -> (f32, f32, f32) {
    if self.data.is_empty() {
      return (0.0, 0.0, 0.0);
    }
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    let mut sum = 0f64;
    for &v in self.data.iter() {
      min = min.min(v);
      max = max.max(v);
      sum += v as f64;
    }
    (min, max, (sum / self.data.len() as f64) as f32)
  }
}

impl AsRef<[f32]> for NhwcTensor {
  fn as_ref(&self) -> &[f32] {
    &self.data
  }
}

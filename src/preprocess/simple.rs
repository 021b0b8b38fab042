// 该文件是 Liefeng （裂缝检测） 项目的一部分。
// src/preprocess/simple.rs - 直接缩放预处理
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

use image::RgbImage;

use super::resample::resize_bilinear;
use crate::tensor::NhwcTensor;

pub(super) fn preprocess(image: &RgbImage, target_size: (u32, u32)) -> NhwcTensor {
  let (width, height) = target_size;
  let resized = resize_bilinear(image, width, height);

  let mut tensor = NhwcTensor::with_shape(height as usize, width as usize);
  for (x, y, pixel) in resized.enumerate_pixels() {
    for c in 0..tensor.channels() {
      tensor.set(y as usize, x as usize, c, pixel[c] as f32 / 255.0);
    }
  }
  tensor
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{ImageBuffer, Rgb};

  #[test]
  fn aspect_ratio_is_ignored() {
    let image = ImageBuffer::from_pixel(1000, 10, Rgb([255u8, 0, 51]));
    let tensor = preprocess(&image, (224, 224));
    assert_eq!(tensor.shape(), [1, 224, 224, 3]);
    assert_eq!(tensor.get(223, 0, 0), Some(1.0));
    assert_eq!(tensor.get(223, 0, 1), Some(0.0));
    assert_eq!(tensor.get(0, 223, 2), Some(0.2));
  }
}

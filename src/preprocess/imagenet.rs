// 该文件是 Liefeng （裂缝检测） 项目的一部分。
// src/preprocess/imagenet.rs - ImageNet 风格预处理
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
use tracing::{debug, warn};

use super::{PreprocessError, resample::resize_region};
use crate::tensor::NhwcTensor;

pub const RESIZE_SHORT_SIDE: u32 = 256;
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// 短边缩放到 `short_side`，长边按比例四舍五入
pub(super) fn shorter_side_size(width: u32, height: u32, short_side: u32) -> (u32, u32) {
  let scaled = |long: u32, short: u32| -> u32 {
    ((long as f64 * short_side as f64 / short as f64).round() as u32).max(1)
  };
  if width < height {
    (short_side, scaled(height, width))
  } else {
    (scaled(width, height), short_side)
  }
}

/// 中心裁剪的左上角坐标
///
/// 偏移 `(size - crop) / 2` 可能带 0.5，按“四舍六入五成双”取整；
/// 右下边界为 `left + crop`，保证输出尺寸恰好等于裁剪尺寸。
pub(super) fn center_crop_origin(
  size: (u32, u32),
  crop: (u32, u32),
) -> Result<(u32, u32), PreprocessError> {
  let (width, height) = size;
  let (crop_width, crop_height) = crop;
  if width < crop_width || height < crop_height {
    return Err(PreprocessError::ImageTooSmall {
      width,
      height,
      crop_width,
      crop_height,
    });
  }
  let offset = |len: u32, crop: u32| ((len - crop) as f64 / 2.0).round_ties_even() as u32;
  Ok((offset(width, crop_width), offset(height, crop_height)))
}

/// ITU-R 601-2 亮度，16 位定点
pub(super) fn luma(r: u8, g: u8, b: u8) -> u8 {
  ((19595 * r as u32 + 38470 * g as u32 + 7471 * b as u32 + 0x8000) >> 16) as u8
}

pub(super) fn preprocess(
  image: &RgbImage,
  crop: (u32, u32),
) -> Result<NhwcTensor, PreprocessError> {
  let (width, height) = image.dimensions();
  let (resized_width, resized_height) = shorter_side_size(width, height, RESIZE_SHORT_SIDE);

  let (left, top) = center_crop_origin((resized_width, resized_height), crop).inspect_err(|e| {
    warn!("原始尺寸 {}x{}: {}", width, height, e);
  })?;
  debug!(
    "缩放 {}x{} -> {}x{}, 裁剪原点 ({}, {})",
    width, height, resized_width, resized_height, left, top
  );
  // 只重采样裁剪窗口，细长图像的长边缩放后可能极大
  let cropped = resize_region(image, (resized_width, resized_height), (left, top), crop);

  let mut tensor = NhwcTensor::with_shape(crop.1 as usize, crop.0 as usize);
  for (x, y, pixel) in cropped.enumerate_pixels() {
    let value = luma(pixel[0], pixel[1], pixel[2]) as f32 / 255.0;
    for c in 0..tensor.channels() {
      tensor.set(
        y as usize,
        x as usize,
        c,
        (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c],
      );
    }
  }
  Ok(tensor)
}

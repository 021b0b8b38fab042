// 该文件是 Liefeng （裂缝检测） 项目的一部分。
// src/preprocess.rs - 图像预处理
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

use std::{fmt, str::FromStr};

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{Config, config::ConfigError, tensor::NhwcTensor};

mod imagenet;
mod resample;
mod simple;

pub use self::imagenet::{IMAGENET_MEAN, IMAGENET_STD, RESIZE_SHORT_SIDE};
pub use self::resample::resize_bilinear;

#[derive(Error, Debug)]
pub enum PreprocessError {
  #[error("图像解码失败: {0}")]
  InvalidImage(#[from] image::ImageError),
  #[error("图像尺寸为零: {width}x{height}")]
  EmptyImage { width: u32, height: u32 },
  #[error("缩放后图像 {width}x{height} 小于裁剪尺寸 {crop_width}x{crop_height}")]
  ImageTooSmall {
    width: u32,
    height: u32,
    crop_width: u32,
    crop_height: u32,
  },
}

/// 预处理策略，部署时固定，必须与模型训练时的策略一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreprocessPolicy {
  /// 短边缩放到 256，中心裁剪，灰度复制为三通道，按 ImageNet 均值方差归一化
  #[default]
  ImageNet,
  /// 直接缩放到目标尺寸，仅除以 255
  Simple,
}

impl PreprocessPolicy {
  pub fn as_str(&self) -> &'static str {
    match self {
      PreprocessPolicy::ImageNet => "imagenet",
      PreprocessPolicy::Simple => "simple",
    }
  }

  /// 每个通道输出值的理论区间
  pub fn channel_bounds(&self) -> [(f32, f32); 3] {
    match self {
      PreprocessPolicy::ImageNet => {
        std::array::from_fn(|c| {
          (
            (0.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c],
            (1.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c],
          )
        })
      }
      PreprocessPolicy::Simple => [(0.0, 1.0); 3],
    }
  }
}

impl fmt::Display for PreprocessPolicy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PreprocessPolicy {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "imagenet" => Ok(PreprocessPolicy::ImageNet),
      "simple" => Ok(PreprocessPolicy::Simple),
      _ => Err(ConfigError::UnknownPolicy(s.to_string())),
    }
  }
}

/// 将原始图像字节转换为 (1, H, W, 3) 张量
#[derive(Debug, Clone)]
pub struct Preprocessor {
  policy: PreprocessPolicy,
  target_size: (u32, u32),
}

impl Preprocessor {
  pub fn new(policy: PreprocessPolicy, target_size: (u32, u32)) -> Self {
    Self {
      policy,
      target_size,
    }
  }

  pub fn from_config(config: &Config) -> Self {
    Self::new(config.policy(), config.target_size())
  }

  pub fn policy(&self) -> PreprocessPolicy {
    self.policy
  }

  /// (宽, 高)
  pub fn target_size(&self) -> (u32, u32) {
    self.target_size
  }

  pub fn preprocess(&self, bytes: &[u8]) -> Result<NhwcTensor, PreprocessError> {
    let image = decode_rgb(bytes)?;
    self.preprocess_image(&image)
  }

  pub fn preprocess_image(&self, image: &RgbImage) -> Result<NhwcTensor, PreprocessError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
      return Err(PreprocessError::EmptyImage { width, height });
    }
    debug!(
      "预处理图像 {}x{}, 策略 {}, 目标尺寸 {}x{}",
      width, height, self.policy, self.target_size.0, self.target_size.1
    );
    match self.policy {
      PreprocessPolicy::ImageNet => imagenet::preprocess(image, self.target_size),
      PreprocessPolicy::Simple => Ok(simple::preprocess(image, self.target_size)),
    }
  }
}

/// 解码为 8 位 RGB 图像，不信任任何外部类型提示
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, PreprocessError> {
  let image = image::load_from_memory(bytes).map_err(|e| {
    warn!("图像解码失败 ({} 字节): {}", bytes.len(), e);
    PreprocessError::InvalidImage(e)
  })?;
  let rgb = image.to_rgb8();
  let (width, height) = rgb.dimensions();
  if width == 0 || height == 0 {
    return Err(PreprocessError::EmptyImage { width, height });
  }
  Ok(rgb)
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{ImageBuffer, ImageFormat, Rgb};
  use std::io::Cursor;

  fn gradient_image(width: u32, height: u32) -> RgbImage {
    ImageBuffer::from_fn(width, height, |x, y| {
      Rgb([
        (x * 255 / width.max(1)) as u8,
        (y * 255 / height.max(1)) as u8,
        ((x + y) % 256) as u8,
      ])
    })
  }

  fn encode_png(image: &RgbImage) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    image
      .write_to(&mut bytes, ImageFormat::Png)
      .expect("encode png");
    bytes.into_inner()
  }

  fn assert_within_bounds(tensor: &NhwcTensor, policy: PreprocessPolicy, slack: f32) {
    let bounds = policy.channel_bounds();
    for (i, v) in tensor.as_nhwc().iter().enumerate() {
      let (lo, hi) = bounds[i % 3];
      assert!(
        *v >= lo - slack && *v <= hi + slack,
        "value {} at {} outside [{}, {}]",
        v,
        i,
        lo,
        hi
      );
    }
  }

  #[test]
  fn imagenet_policy_yields_fixed_shape_in_range() {
    let preprocessor = Preprocessor::new(PreprocessPolicy::ImageNet, (224, 224));
    for (w, h) in [(640, 480), (300, 1000), (224, 224), (50, 40)] {
      let bytes = encode_png(&gradient_image(w, h));
      let tensor = preprocessor.preprocess(&bytes).unwrap();
      assert_eq!(tensor.shape(), [1, 224, 224, 3]);
      assert_within_bounds(&tensor, PreprocessPolicy::ImageNet, 0.01);
    }
  }

  #[test]
  fn imagenet_channels_share_one_luminance() {
    let preprocessor = Preprocessor::new(PreprocessPolicy::ImageNet, (224, 224));
    let bytes = encode_png(&gradient_image(320, 256));
    let tensor = preprocessor.preprocess(&bytes).unwrap();

    for y in (0..224).step_by(17) {
      for x in (0..224).step_by(13) {
        let scaled: Vec<f32> = (0..3)
          .map(|c| tensor.get(y, x, c).unwrap() * IMAGENET_STD[c] + IMAGENET_MEAN[c])
          .collect();
        assert!((scaled[0] - scaled[1]).abs() < 1e-5);
        assert!((scaled[1] - scaled[2]).abs() < 1e-5);
      }
    }
  }

  #[test]
  fn simple_policy_yields_target_shape_in_unit_range() {
    let preprocessor = Preprocessor::new(PreprocessPolicy::Simple, (160, 96));
    let bytes = encode_png(&gradient_image(333, 517));
    let tensor = preprocessor.preprocess(&bytes).unwrap();
    assert_eq!(tensor.shape(), [1, 96, 160, 3]);
    assert_within_bounds(&tensor, PreprocessPolicy::Simple, 0.0);
  }

  #[test]
  fn simple_policy_keeps_color() {
    let image = ImageBuffer::from_pixel(40, 30, Rgb([10u8, 20, 30]));
    let preprocessor = Preprocessor::new(PreprocessPolicy::Simple, (224, 224));
    let tensor = preprocessor.preprocess_image(&image).unwrap();
    for px in tensor.as_nhwc().chunks(3) {
      assert_eq!(px, &[10.0f32 / 255.0, 20.0f32 / 255.0, 30.0f32 / 255.0]);
    }
  }

  #[test]
  fn repeated_runs_are_bit_identical() {
    let bytes = encode_png(&gradient_image(401, 299));
    for policy in [PreprocessPolicy::ImageNet, PreprocessPolicy::Simple] {
      let preprocessor = Preprocessor::new(policy, (224, 224));
      let first = preprocessor.preprocess(&bytes).unwrap();
      let second = preprocessor.preprocess(&bytes).unwrap();
      assert_eq!(first, second);
    }
  }

  #[test]
  fn policies_disagree_on_same_input() {
    let bytes = encode_png(&gradient_image(256, 256));
    let imagenet = Preprocessor::new(PreprocessPolicy::ImageNet, (224, 224))
      .preprocess(&bytes)
      .unwrap();
    let simple = Preprocessor::new(PreprocessPolicy::Simple, (224, 224))
      .preprocess(&bytes)
      .unwrap();
    assert_eq!(imagenet.shape(), simple.shape());
    assert_ne!(imagenet, simple);
  }

  #[test]
  fn garbage_bytes_are_invalid_image() {
    let preprocessor = Preprocessor::new(PreprocessPolicy::ImageNet, (224, 224));
    let garbage: Vec<u8> = (0..512u32).map(|i| (i.wrapping_mul(2654435761) >> 7) as u8).collect();
    for bytes in [&garbage[..], &[][..], b"\x89PNG\r\n\x1a\nbroken"] {
      let err = preprocessor.preprocess(bytes).unwrap_err();
      assert!(matches!(err, PreprocessError::InvalidImage(_)), "{err:?}");
    }
  }

  #[test]
  fn oversized_crop_is_image_too_small() {
    let preprocessor = Preprocessor::new(PreprocessPolicy::ImageNet, (300, 300));
    let bytes = encode_png(&gradient_image(640, 480));
    let err = preprocessor.preprocess(&bytes).unwrap_err();
    assert!(matches!(
      err,
      PreprocessError::ImageTooSmall {
        width: 341,
        height: 256,
        crop_width: 300,
        crop_height: 300
      }
    ));
  }

  #[test]
  fn thin_png_is_cropped_without_full_resize() {
    let preprocessor = Preprocessor::new(PreprocessPolicy::ImageNet, (224, 224));
    let thin = ImageBuffer::from_fn(1, 200_000, |_, y| Rgb([(y % 256) as u8, 0, 255]));
    let tensor = preprocessor.preprocess(&encode_png(&thin)).unwrap();
    assert_eq!(tensor.shape(), [1, 224, 224, 3]);
    assert_within_bounds(&tensor, PreprocessPolicy::ImageNet, 0.01);
  }

  #[test]
  fn policy_parses_case_insensitively() {
    assert_eq!(
      "ImageNet".parse::<PreprocessPolicy>(),
      Ok(PreprocessPolicy::ImageNet)
    );
    assert_eq!(
      " simple ".parse::<PreprocessPolicy>(),
      Ok(PreprocessPolicy::Simple)
    );
    assert!("stretch".parse::<PreprocessPolicy>().is_err());
    assert_eq!(PreprocessPolicy::Simple.to_string(), "simple");
  }
}

// 该文件是 Liefeng （裂缝检测） 项目的一部分。
// src/preprocess/resample.rs - 双线性重采样
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

//! 可分离的双线性（三角核）重采样。
//!
//! 缩小时核的支撑半径按缩放比例放大，每个输出像素的权重归一化，
//! 先水平后垂直，每一遍结果四舍五入（0.5 向上）并截断到 u8。

use std::ops::Range;

use image::{ImageBuffer, Rgb, RgbImage, imageops};

const BILINEAR_SUPPORT: f64 = 1.0;
const CHANNELS: usize = 3;

fn bilinear_filter(x: f64) -> f64 {
  let x = x.abs();
  if x < 1.0 { 1.0 - x } else { 0.0 }
}

/// 单个输出位置对应的输入窗口和权重
#[derive(Debug, Clone)]
struct Window {
  start: usize,
  weights: Vec<f64>,
}

impl Window {
  fn end(&self) -> usize {
    self.start + self.weights.len()
  }
}

/// 仅计算输出区间 `range` 内各位置的窗口
fn precompute_windows(in_size: u32, out_size: u32, range: Range<u32>) -> Vec<Window> {
  let scale = in_size as f64 / out_size as f64;
  let filter_scale = scale.max(1.0);
  let support = BILINEAR_SUPPORT * filter_scale;
  let inv_filter_scale = 1.0 / filter_scale;

  range
    .map(|out| {
      let center = (out as f64 + 0.5) * scale;
      let start = (center - support + 0.5).floor().max(0.0) as usize;
      let end = ((center + support + 0.5).floor() as usize).min(in_size as usize);

      let mut weights: Vec<f64> = (start..end)
        .map(|x| bilinear_filter((x as f64 - center + 0.5) * inv_filter_scale))
        .collect();
      let total: f64 = weights.iter().sum();
      if total > 0.0 {
        weights.iter_mut().for_each(|w| *w /= total);
      }
      Window { start, weights }
    })
    .collect()
}

fn round_to_u8(value: f64) -> u8 {
  (value + 0.5).floor().clamp(0.0, 255.0) as u8
}

/// 对 `rows` 行做水平重采样，输出每个窗口对应的一列
fn resample_horizontal(image: &RgbImage, windows: &[Window], rows: Range<u32>) -> RgbImage {
  let src = image.as_raw();
  let stride = image.width() as usize * CHANNELS;

  ImageBuffer::from_fn(windows.len() as u32, rows.len() as u32, |x, y| {
    let window = &windows[x as usize];
    let y = (rows.start + y) as usize;
    let row = &src[y * stride..(y + 1) * stride];
    let mut acc = [0f64; CHANNELS];
    for (i, w) in window.weights.iter().enumerate() {
      let offset = (window.start + i) * CHANNELS;
      for (c, a) in acc.iter_mut().enumerate() {
        *a += row[offset + c] as f64 * w;
      }
    }
    Rgb(acc.map(round_to_u8))
  })
}

/// `image` 的第 0 行对应输入第 `first_row` 行
fn resample_vertical(image: &RgbImage, windows: &[Window], first_row: usize) -> RgbImage {
  let src = image.as_raw();
  let stride = image.width() as usize * CHANNELS;

  ImageBuffer::from_fn(image.width(), windows.len() as u32, |x, y| {
    let window = &windows[y as usize];
    let column = x as usize * CHANNELS;
    let mut acc = [0f64; CHANNELS];
    for (i, w) in window.weights.iter().enumerate() {
      let offset = (window.start - first_row + i) * stride + column;
      for (c, a) in acc.iter_mut().enumerate() {
        *a += src[offset + c] as f64 * w;
      }
    }
    Rgb(acc.map(round_to_u8))
  })
}

/// 将 RGB 图像缩放到 (width, height)，尺寸不变的方向跳过
pub fn resize_bilinear(image: &RgbImage, width: u32, height: u32) -> RgbImage {
  resize_region(image, (width, height), (0, 0), (width, height))
}

/// 只计算缩放到 `size` 后位于 `origin` 起、大小为 `region` 的区域
///
/// 结果与先整体缩放再裁剪逐像素一致，但不分配整幅缩放图像，
/// 垂直方向也只对区域实际依赖的输入行做水平重采样。
/// 区域必须位于 `size` 之内。
pub fn resize_region(
  image: &RgbImage,
  size: (u32, u32),
  origin: (u32, u32),
  region: (u32, u32),
) -> RgbImage {
  let (in_width, in_height) = image.dimensions();
  let columns = origin.0..origin.0 + region.0;
  let rows = origin.1..origin.1 + region.1;

  let vertical = (in_height != size.1).then(|| precompute_windows(in_height, size.1, rows.clone()));
  let band = match &vertical {
    Some(windows) => {
      let first = windows.first().map_or(0, |w| w.start);
      let last = windows.iter().map(Window::end).max().unwrap_or(first);
      first as u32..last as u32
    }
    None => rows,
  };

  let horizontal = if in_width != size.0 {
    let windows = precompute_windows(in_width, size.0, columns);
    resample_horizontal(image, &windows, band.clone())
  } else {
    imageops::crop_imm(image, columns.start, band.start, region.0, band.len() as u32).to_image()
  };

  match vertical {
    Some(windows) => resample_vertical(&horizontal, &windows, band.start as usize),
    None => horizontal,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn same_size_is_identity() {
    let image = ImageBuffer::from_fn(5, 3, |x, y| Rgb([x as u8 * 40, y as u8 * 60, 7]));
    assert_eq!(resize_bilinear(&image, 5, 3), image);
  }

  #[test]
  fn uniform_image_stays_uniform() {
    let image = ImageBuffer::from_pixel(37, 23, Rgb([12u8, 200, 99]));
    for (w, h) in [(224, 224), (5, 9), (37, 100)] {
      let resized = resize_bilinear(&image, w, h);
      assert_eq!(resized.dimensions(), (w, h));
      assert!(resized.pixels().all(|p| *p == Rgb([12, 200, 99])));
    }
  }

  #[test]
  fn halving_averages_neighbours() {
    let image = ImageBuffer::from_fn(2, 1, |x, _| Rgb([if x == 0 { 0 } else { 200 }; 3]));
    let resized = resize_bilinear(&image, 1, 1);
    assert_eq!(resized.get_pixel(0, 0), &Rgb([100, 100, 100]));
  }

  #[test]
  fn upscale_is_monotonic_between_samples() {
    let image = ImageBuffer::from_fn(2, 1, |x, _| Rgb([if x == 0 { 0 } else { 255 }; 3]));
    let resized = resize_bilinear(&image, 8, 1);
    let row: Vec<u8> = resized.pixels().map(|p| p[0]).collect();
    assert_eq!(row[0], 0);
    assert_eq!(row[7], 255);
    assert!(row.windows(2).all(|w| w[0] <= w[1]), "{row:?}");
  }

  #[test]
  fn windows_weights_are_normalized() {
    for (input, output) in [(640, 224), (224, 640), (7, 3), (1, 5)] {
      for window in precompute_windows(input, output, 0..output) {
        let total: f64 = window.weights.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(window.start + window.weights.len() <= input as usize);
      }
    }
  }

  #[test]
  fn region_matches_crop_of_full_resize() {
    let image = ImageBuffer::from_fn(37, 23, |x, y| {
      Rgb([(x * 7) as u8, (y * 11) as u8, ((x * y) % 251) as u8])
    });
    for (size, origin, region) in [
      ((80, 50), (10, 7), (40, 30)),
      ((20, 11), (3, 0), (17, 11)),
      ((37, 60), (0, 13), (37, 20)),
      ((90, 23), (33, 5), (12, 9)),
      ((37, 23), (4, 4), (10, 10)),
    ] {
      let full = resize_bilinear(&image, size.0, size.1);
      let expected = imageops::crop_imm(&full, origin.0, origin.1, region.0, region.1).to_image();
      assert_eq!(resize_region(&image, size, origin, region), expected, "{size:?} {origin:?}");
    }
  }

  #[test]
  fn thin_image_region_does_not_materialize_long_side() {
    let image = ImageBuffer::from_fn(1, 200_000, |_, y| Rgb([(y % 256) as u8; 3]));
    // 整体缩放将是 256 x 51_200_000
    let region = resize_region(&image, (256, 51_200_000), (16, 25_599_888), (224, 224));
    assert_eq!(region.dimensions(), (224, 224));
  }
}

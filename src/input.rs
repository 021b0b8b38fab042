// 该文件是 Liefeng （裂缝检测） 项目的一部分。
// src/input.rs - 图像输入
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

#[cfg(feature = "read_image_file")]
mod read_image_file;

#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

/// 按扩展名猜测内容类型，仅作为提示
pub fn guess_content_type(path: &str) -> Option<&'static str> {
  let extension = path.rsplit_once('.')?.1.to_ascii_lowercase();
  match extension.as_str() {
    "jpg" | "jpeg" => Some("image/jpeg"),
    "png" => Some("image/png"),
    "bmp" => Some("image/bmp"),
    "webp" => Some("image/webp"),
    "gif" => Some("image/gif"),
    "txt" => Some("text/plain"),
    "json" => Some("application/json"),
    _ => None,
  }
}

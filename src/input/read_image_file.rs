// 该文件是 Liefeng （裂缝检测） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, input::guess_content_type};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{found}'")]
  SchemeMismatch {
    expected: &'static str,
    found: String,
  },
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 读取磁盘上的图像文件，保留原始字节，解码交给预处理
#[derive(Debug, Clone)]
pub struct ImageFileInput {
  path: String,
  bytes: Vec<u8>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemeMismatch {
        expected: Self::SCHEME,
        found: url.scheme().to_string(),
      });
    }

    let path = url.path().to_string();
    let bytes = std::fs::read(&path)?;
    debug!("读取图像文件 {}: {} 字节", path, bytes.len());

    Ok(ImageFileInput { path, bytes })
  }
}

impl ImageFileInput {
  pub fn path(&self) -> &str {
    &self.path
  }

  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }

  /// 由扩展名推断的内容类型提示
  pub fn content_type(&self) -> Option<&'static str> {
    guess_content_type(&self.path)
  }

  pub fn into_bytes(self) -> Vec<u8> {
    self.bytes
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_other_schemes() {
    let url = Url::parse("file:///tmp/wall.png").unwrap();
    let err = ImageFileInput::from_url(&url).unwrap_err();
    assert!(matches!(
      err,
      ImageFileInputError::SchemeMismatch { found, .. } if found == "file"
    ));
  }

  #[test]
  fn reads_bytes_and_hint() {
    let path = std::env::temp_dir().join(format!("liefeng-input-{}.png", std::process::id()));
    std::fs::write(&path, b"not really a png").unwrap();

    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    let input = ImageFileInput::from_url(&url).unwrap();
    assert_eq!(input.bytes(), b"not really a png");
    assert_eq!(input.content_type(), Some("image/png"));

    std::fs::remove_file(&path).unwrap();
  }

  #[test]
  fn missing_file_is_io_error() {
    let url = Url::parse("image:///definitely/not/here.png").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url).unwrap_err(),
      ImageFileInputError::IoError(_)
    ));
  }
}

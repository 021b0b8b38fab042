// 该文件是 Liefeng （裂缝检测） 项目的一部分。
// src/args.rs - 命令行参数
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

use clap::{Args as ClapArgs, Parser, Subcommand};
use url::Url;

use liefeng::{Config, ConfigError, PreprocessPolicy, config::parse_target_size};

/// Liefeng 裂缝分类流水线工具
///
/// 未在命令行指定的配置项从环境变量 CLASS_NAMES / THRESHOLD /
/// PREPROCESS_POLICY / TARGET_SIZE 读取。
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(flatten)]
  pub overrides: ConfigOverrides,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(ClapArgs, Debug)]
pub struct ConfigOverrides {
  /// 两个类别名称，逗号分隔，顺序为 负类,正类
  #[arg(long, global = true, value_delimiter = ',', value_name = "NEG,POS")]
  pub class_names: Option<Vec<String>>,

  /// sigmoid 输出的判定阈值 (0.0 - 1.0)
  #[arg(long, global = true, value_name = "THRESHOLD")]
  pub threshold: Option<f32>,

  /// 预处理策略: imagenet 或 simple
  #[arg(long, global = true, value_name = "POLICY")]
  pub policy: Option<PreprocessPolicy>,

  /// 模型输入尺寸 WxH
  #[arg(long, global = true, value_parser = parse_target_size, value_name = "WxH")]
  pub target_size: Option<(u32, u32)>,
}

impl ConfigOverrides {
  pub fn apply(&self, mut config: Config) -> Result<Config, ConfigError> {
    if let Some(names) = &self.class_names {
      let pair = <[String; 2]>::try_from(names.clone()).map_err(ConfigError::ClassNames)?;
      config = config.with_class_names(pair)?;
    }
    if let Some(threshold) = self.threshold {
      config = config.with_threshold(threshold)?;
    }
    if let Some(target_size) = self.target_size {
      config = config.with_target_size(target_size)?;
    }
    if let Some(policy) = self.policy {
      config = config.with_policy(policy);
    }
    Ok(config)
  }
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// 预处理一张图像并输出张量统计
  Preprocess {
    /// 输入图像，例如 image:///data/wall.jpg
    #[arg(long, value_name = "SOURCE")]
    input: Url,
  },
  /// 将模型原始输出映射为分类结果
  Decide {
    /// 模型输出得分，逗号分隔
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, value_name = "SCORES")]
    scores: Vec<f32>,

    /// 输出形状，默认为 1,K
    #[arg(long, value_delimiter = ',', value_name = "SHAPE")]
    shape: Option<Vec<usize>>,
  },
  /// 输出当前生效的配置
  Health,
}

// 该文件是 Liefeng （裂缝检测） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use args::{Args, Command};
use liefeng::{
  Config, DecisionMapper, FromUrl, Health, Preprocessor, RawOutput, input::ImageFileInput,
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  let config = args
    .overrides
    .apply(Config::from_env().context("无法从环境变量读取配置")?)
    .context("命令行配置无效")?;

  match args.command {
    Command::Preprocess { input } => run_preprocess(&config, &input),
    Command::Decide { scores, shape } => run_decide(&config, scores, shape),
    Command::Health => {
      let health = Health::from_config(&config);
      println!("{}", serde_json::to_string_pretty(&health.to_json())?);
      Ok(())
    }
  }
}

fn run_preprocess(config: &Config, input: &Url) -> Result<()> {
  info!("输入来源: {}", input);
  let image = ImageFileInput::from_url(input)?;
  match image.content_type() {
    Some(hint) if !hint.starts_with("image/") => {
      warn!("文件扩展名提示非图像内容: {}, 仍尝试解码", hint)
    }
    _ => {}
  }

  let preprocessor = Preprocessor::from_config(config);
  let now = std::time::Instant::now();
  let tensor = preprocessor.preprocess(image.bytes())?;
  info!("预处理完成，耗时: {:.2?}", now.elapsed());

  let (min, max, mean) = tensor.summary();
  let report = json!({
    "path": image.path(),
    "policy": preprocessor.policy().as_str(),
    "shape": tensor.shape(),
    "min": min,
    "max": max,
    "mean": mean,
  });
  println!("{}", serde_json::to_string_pretty(&report)?);
  Ok(())
}

fn run_decide(config: &Config, scores: Vec<f32>, shape: Option<Vec<usize>>) -> Result<()> {
  let shape = shape.unwrap_or_else(|| vec![1, scores.len()]);
  let output = RawOutput::new(shape.clone(), scores)
    .with_context(|| format!("得分数量与形状 {:?} 不一致", shape))?;

  let result = DecisionMapper::from_config(config).decide(&output)?;
  println!("{}", serde_json::to_string_pretty(&result.to_json())?);
  Ok(())
}

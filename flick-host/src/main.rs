//! flick - 无界面播放器
//!
//! ## 用法
//!
//! ```bash
//! # 依次点击两个位置，每帧导出 PNG
//! flick play --project demo.flicksy.json --font font.json --click 40,60 --click 80,20 --dump-frames
//!
//! # 静态检查项目
//! flick check demo.flicksy.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use flick_host::{AppConfig, ClickPoint, HeadlessSession, load_font, load_project};
use flick_runtime::{DiagnosticLevel, ProjectData, analyze_project};
use tracing::{Level, info};

#[derive(Parser)]
#[command(name = "flick")]
#[command(about = "flicksy 项目的无界面播放器")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 配置文件路径
    #[arg(short, long, default_value = "flick.json", global = true)]
    config: PathBuf,

    /// 日志级别，覆盖配置文件
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 播放项目：依次点击给定坐标，推进到每次交互结束
    Play {
        /// 项目文件，覆盖配置文件
        #[arg(short, long)]
        project: Option<PathBuf>,

        /// 字体描述文件，覆盖配置文件
        #[arg(short, long)]
        font: Option<PathBuf>,

        /// 点击坐标 `x,y`，可重复
        #[arg(long = "click")]
        clicks: Vec<ClickPoint>,

        /// 每帧导出 PNG
        #[arg(long)]
        dump_frames: bool,

        /// 不自动翻页
        #[arg(long)]
        no_auto_skip: bool,

        /// 帧导出目录，覆盖配置文件
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// 静态检查项目
    Check {
        /// 项目文件
        project: PathBuf,

        /// 最低显示级别（info / warn / error）
        #[arg(long, default_value = "info")]
        min_level: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(&cli.config);
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    init_tracing(&config.log_level)?;

    match cli.command {
        Commands::Play {
            project,
            font,
            clicks,
            dump_frames,
            no_auto_skip,
            output_dir,
        } => {
            if let Some(project) = project {
                config.project_path = project;
            }
            if let Some(font) = font {
                config.font_path = font;
            }
            if let Some(output_dir) = output_dir {
                config.output_dir = output_dir;
            }
            config.validate()?;
            play(&config, &clicks, dump_frames, !no_auto_skip)
        }
        Commands::Check { project, min_level } => check(&project, &min_level),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    let level: Level = level
        .parse()
        .with_context(|| format!("无法识别的日志级别: {level}"))?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn play(config: &AppConfig, clicks: &[ClickPoint], dump_frames: bool, auto_skip: bool) -> Result<()> {
    let loaded = load_project(&config.project_path)?;
    let font = load_font(&config.font_path)?;
    let mut session = HeadlessSession::new(loaded, font, config)?;
    session.set_auto_skip(auto_skip);
    if dump_frames {
        session.dump_frames_to(&config.output_dir);
    }

    info!(scene = %session.player().current_scene_id(), "开始播放");
    for point in clicks {
        let (outcome, settled) = session.click(*point)?;
        info!(
            point = %point,
            outcome = ?outcome,
            frames = settled.frames,
            finished = settled.finished,
            "交互结束"
        );
    }

    let final_frame = config.output_dir.join("final.png");
    session.save_frame(&final_frame)?;

    for line in session.event_log() {
        println!("{line}");
    }
    println!("场景: {}", session.player().current_scene_id());
    println!("画面: {}", final_frame.display());
    Ok(())
}

fn check(path: &Path, min_level: &str) -> Result<()> {
    let min_level = match min_level {
        "info" => DiagnosticLevel::Info,
        "warn" => DiagnosticLevel::Warn,
        "error" => DiagnosticLevel::Error,
        other => bail!("无法识别的诊断级别: {other}"),
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("读取项目失败: {}", path.display()))?;
    let project = ProjectData::from_json(&text)
        .with_context(|| format!("解析项目失败: {}", path.display()))?;

    let result = analyze_project(&project);
    for diagnostic in result.filter_by_level(min_level) {
        println!("{diagnostic}");
    }
    println!(
        "{} 个错误，{} 个警告",
        result.error_count(),
        result.warn_count()
    );

    if result.has_errors() {
        bail!("项目检查未通过");
    }
    Ok(())
}

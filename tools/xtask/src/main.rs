//! # xtask - 开发辅助工具
//!
//! ## 命令
//!
//! - `check-all`: 依次运行 fmt、clippy、test，任一步失败即停止
//! - `project-check`: 检查项目文件（场景、脚本、绘图引用）

use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use flick_runtime::{DiagnosticResult, ProjectData, analyze_project};
use walkdir::WalkDir;

/// 项目文件后缀
const PROJECT_SUFFIX: &str = ".flicksy.json";

/// `check-all` 的步骤：cargo 参数
const GATES: &[&[&str]] = &[
    &["fmt", "--all", "--", "--check"],
    &["clippy", "--workspace", "--all-targets"],
    &["test", "--workspace"],
];

fn cargo(args: &[&str]) -> anyhow::Result<()> {
    let step = format!("cargo {}", args.join(" "));
    eprintln!("\n==> {step}");
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("{step} failed with {status}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let sub = args.next().unwrap_or_else(|| "help".to_string());

    let result = match sub.as_str() {
        "check-all" => GATES.iter().try_for_each(|gate| cargo(gate)),
        "project-check" => project_check(args.next().as_deref()),
        "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        other => Err(anyhow::anyhow!("unknown xtask subcommand: {other}")),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("xtask error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    eprintln!(
        r#"xtask - 开发辅助工具

USAGE:
  cargo xtask <command>

COMMANDS:
  check-all       运行 fmt、clippy、test 门禁检查
  project-check   检查项目文件

PROJECT-CHECK:
  cargo xtask project-check [path]

  不带参数：检查 projects/ 下所有 *.flicksy.json 文件
  带路径参数：检查指定文件或目录

  检查内容：
    - 起始场景是否存在
    - 行为脚本语法错误
    - 脚本与目的地引用的场景 / 对象 / 绘图是否存在
"#
    );
}

//=============================================================================
// project-check 命令实现
//=============================================================================

/// 默认项目目录（相对于 workspace root）
const DEFAULT_PROJECTS_DIR: &str = "projects";

/// 项目检查结果
#[derive(Default)]
struct ProjectCheckResult {
    /// 检查的项目数量
    projects_checked: usize,
    /// 读取 / 解析失败数量
    load_errors: usize,
    /// 诊断结果
    diagnostics: DiagnosticResult,
}

/// 执行项目检查
fn project_check(path: Option<&str>) -> anyhow::Result<()> {
    let files = match path {
        Some(p) => {
            let path = PathBuf::from(p);
            if path.is_file() {
                vec![path]
            } else if path.is_dir() {
                collect_project_files(&path)
            } else {
                anyhow::bail!("路径不存在: {p}");
            }
        }
        None => {
            let dir = Path::new(DEFAULT_PROJECTS_DIR);
            if !dir.exists() {
                anyhow::bail!(
                    "默认项目目录不存在: {}\n请在 workspace 根目录运行，或指定项目路径",
                    dir.display()
                );
            }
            collect_project_files(dir)
        }
    };

    if files.is_empty() {
        eprintln!("未找到项目文件（{PROJECT_SUFFIX}）");
        return Ok(());
    }

    eprintln!("==> 检查 {} 个项目文件...\n", files.len());

    let mut result = ProjectCheckResult::default();
    for file in &files {
        check_project_file(file, &mut result);
    }

    print_check_result(&result);

    if result.load_errors > 0 || result.diagnostics.has_errors() {
        anyhow::bail!("项目检查发现错误");
    }

    Ok(())
}

/// 收集目录下的所有项目文件
fn collect_project_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(PROJECT_SUFFIX))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// 检查单个项目文件
fn check_project_file(file: &Path, result: &mut ProjectCheckResult) {
    let project_id = file.display().to_string();
    result.projects_checked += 1;

    let content = match std::fs::read_to_string(file) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[ERROR] {project_id}: 无法读取文件 - {e}");
            result.load_errors += 1;
            return;
        }
    };

    let project = match ProjectData::from_json(&content) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("[ERROR] {project_id}: {e}");
            result.load_errors += 1;
            return;
        }
    };

    result.diagnostics.merge(analyze_project(&project));
}

/// 输出检查结果
fn print_check_result(result: &ProjectCheckResult) {
    eprintln!("─────────────────────────────────────────────────────");
    eprintln!("检查完成: {} 个项目", result.projects_checked);
    eprintln!();

    for diag in &result.diagnostics.diagnostics {
        eprintln!("{diag}");
    }

    let error_count = result.load_errors + result.diagnostics.error_count();
    let warn_count = result.diagnostics.warn_count();

    eprintln!();
    if error_count > 0 {
        eprintln!("❌ {error_count} 个错误, {warn_count} 个警告");
    } else if warn_count > 0 {
        eprintln!("⚠️  0 个错误, {warn_count} 个警告");
    } else {
        eprintln!("✅ 检查通过，无错误");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_only_project_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("chapter");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(dir.path().join("b.flicksy.json"), "{}").unwrap();
        std::fs::write(nested.join("a.flicksy.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.json"), "{}").unwrap();

        let files = collect_project_files(dir.path());
        assert_eq!(
            files,
            vec![dir.path().join("b.flicksy.json"), nested.join("a.flicksy.json")]
        );
    }

    #[test]
    fn test_check_counts_load_errors_and_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.flicksy.json");
        let bad_start = dir.path().join("start.flicksy.json");
        std::fs::write(&broken, "{ not json").unwrap();
        std::fs::write(
            &bad_start,
            r#"{ "details": { "start": "nowhere" }, "scenes": [ { "id": "hall" } ] }"#,
        )
        .unwrap();

        let mut result = ProjectCheckResult::default();
        check_project_file(&broken, &mut result);
        check_project_file(&bad_start, &mut result);

        assert_eq!(result.projects_checked, 2);
        assert_eq!(result.load_errors, 1);
        assert!(result.diagnostics.has_errors());
    }
}

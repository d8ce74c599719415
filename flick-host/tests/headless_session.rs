//! 无界面会话的端到端测试：从磁盘上的项目 / 字体文件开始，模拟点击并检查事件与导出帧。

use std::fs;
use std::path::Path;

use flick_host::{AppConfig, ClickPoint, HeadlessSession, encode_data_url, load_font, load_project};
use flick_runtime::ClickOutcome;
use image::{Rgba, RgbaImage};
use serde_json::json;

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// 写出项目与字体文件，返回对应的配置
fn write_fixture(dir: &Path, script: &str, dialogue: &str, destination: &str) -> AppConfig {
    let solid = encode_data_url(&RgbaImage::from_pixel(8, 8, RED)).unwrap();
    let project = json!({
        "details": { "id": "demo", "name": "Demo", "start": "hall" },
        "drawings": [
            { "id": "solid", "name": "Solid", "data": solid },
            { "id": "broken", "name": "Broken", "data": "not a data url" }
        ],
        "scenes": [
            {
                "id": "hall",
                "name": "Hall",
                "objects": [
                    {
                        "id": "door",
                        "name": "Door",
                        "position": { "x": 0, "y": 0, "z": 0 },
                        "drawing": "solid",
                        "behaviour": {
                            "script": script,
                            "dialogue": dialogue,
                            "destination": destination
                        }
                    }
                ]
            },
            { "id": "cellar", "name": "Cellar", "objects": [] }
        ]
    });

    // 95 个 ASCII 字符，16 列 × 6 行，全部实心
    let atlas = RgbaImage::from_pixel(64, 48, Rgba([255, 255, 255, 255]));
    let font = json!({
        "name": "blocks",
        "char_width": 4,
        "char_height": 8,
        "runs": "32-126",
        "atlas": encode_data_url(&atlas).unwrap()
    });

    let project_path = dir.join("demo.flicksy.json");
    let font_path = dir.join("font.json");
    fs::write(&project_path, project.to_string()).unwrap();
    fs::write(&font_path, font.to_string()).unwrap();

    AppConfig {
        project_path,
        font_path,
        output_dir: dir.join("frames"),
        frame_dt: 0.05,
        max_frames: 200,
        ..AppConfig::default()
    }
}

fn session(config: &AppConfig) -> HeadlessSession {
    let loaded = load_project(&config.project_path).unwrap();
    let font = load_font(&config.font_path).unwrap();
    HeadlessSession::new(loaded, font, config).unwrap()
}

#[test]
fn test_click_runs_script_dialogue_and_travel() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixture(dir.path(), "LOG('opened')\nSET('seen', true)", "Hello", "cellar");
    config.validate().unwrap();

    let mut session = session(&config);
    assert_eq!(session.player().current_scene_id(), "hall");
    // 无法解码的绘图被跳过，不影响加载
    assert_eq!(*session.player().render().get_pixel(1, 1), RED);

    let (outcome, settled) = session.click(ClickPoint { x: 1, y: 1 }).unwrap();
    assert_eq!(
        outcome,
        ClickOutcome::Triggered {
            object_id: "door".to_string()
        }
    );
    assert!(settled.finished);
    assert!(settled.frames > 0);

    assert_eq!(
        session.event_log(),
        [
            "log: opened",
            "next-page: Hello",
            "done",
            "next-scene: cellar"
        ]
    );
    assert_eq!(session.player().current_scene_id(), "cellar");
    assert!(session.player().variables().get("seen").is_some());
    assert_eq!(*session.player().render().get_pixel(1, 1), BLACK);
}

#[test]
fn test_click_on_empty_space_misses() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixture(dir.path(), "", "Hello", "");

    let mut session = session(&config);
    let (outcome, settled) = session.click(ClickPoint { x: 100, y: 50 }).unwrap();

    assert_eq!(outcome, ClickOutcome::Missed);
    assert_eq!(settled.frames, 0);
    assert!(session.event_log().is_empty());
}

#[test]
fn test_without_auto_skip_dialogue_waits_for_clicks() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_fixture(dir.path(), "", "Hi", "");
    config.max_frames = 20;

    let mut session = session(&config);
    session.set_auto_skip(false);

    let (_, settled) = session.click(ClickPoint { x: 1, y: 1 }).unwrap();
    assert!(!settled.finished);
    assert_eq!(settled.frames, 20);
    assert!(session.player().dialogue().is_fully_revealed());

    // 页面已完全显示，再次点击翻页并结束对话
    let (outcome, settled) = session.click(ClickPoint { x: 1, y: 1 }).unwrap();
    assert_eq!(outcome, ClickOutcome::Skipped);
    assert!(settled.finished);
    assert_eq!(session.event_log(), ["next-page: Hi", "done"]);
}

#[test]
fn test_dump_frames_writes_png_per_frame() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_fixture(dir.path(), "", "Hi", "");

    let mut session = session(&config);
    session.dump_frames_to(&config.output_dir);
    let (_, settled) = session.click(ClickPoint { x: 1, y: 1 }).unwrap();
    assert!(settled.finished);

    let frames = fs::read_dir(&config.output_dir).unwrap().count();
    assert_eq!(frames as u64, session.frame());

    let first = image::open(config.output_dir.join("frame-00001.png"))
        .unwrap()
        .to_rgba8();
    assert_eq!(first.dimensions(), (160, 100));
    assert_eq!(*first.get_pixel(1, 1), RED);
}

//! # Pointcast 模块
//!
//! 像素级点击检测：按 z 从高到低检查对象，返回第一个在该点 alpha 非零的对象。
//!
//! z 相同时，列表中靠后的对象先被检查（与绘制顺序一致，后画的在上面）。

use crate::scene::{DrawingImages, Scene, SceneObject};

/// 点击检测选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointcastOptions {
    /// 跳过隐藏的对象
    pub skip_hidden: bool,
}

impl Default for PointcastOptions {
    fn default() -> Self {
        Self { skip_hidden: true }
    }
}

/// 按绘制顺序（z 升序，稳定）排列的对象下标
pub fn draw_order(scene: &Scene) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scene.objects.len()).collect();
    order.sort_by_key(|&i| scene.objects[i].position.z);
    order
}

/// 返回点 `(x, y)` 处最上层的对象
pub fn pointcast<'a>(
    scene: &'a Scene,
    drawings: &DrawingImages,
    x: i32,
    y: i32,
    options: PointcastOptions,
) -> Option<&'a SceneObject> {
    draw_order(scene)
        .into_iter()
        .rev()
        .map(|i| &scene.objects[i])
        .filter(|object| !(options.skip_hidden && object.hidden))
        .find(|object| hit_test(object, drawings, x, y))
}

/// 单个对象的像素命中检测
fn hit_test(object: &SceneObject, drawings: &DrawingImages, x: i32, y: i32) -> bool {
    let Some(image) = drawings.get(&object.drawing) else {
        return false;
    };

    let local_x = x - object.position.x;
    let local_y = y - object.position.y;
    if local_x < 0 || local_y < 0 {
        return false;
    }
    let (local_x, local_y) = (local_x as u32, local_y as u32);
    if local_x >= image.width() || local_y >= image.height() {
        return false;
    }

    image.get_pixel(local_x, local_y)[3] > 0
}

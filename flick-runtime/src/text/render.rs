//! # 页面渲染
//!
//! 把当前页中可见的字形光栅化到 RGBA 画布上。
//! 字形图像的 alpha 通道作为遮罩，颜色取字形的 `fill`。

use image::{Pixel, Rgba, RgbaImage};

use super::page::Page;

/// 将页面渲染为一张新图像
///
/// `origin_x` / `origin_y` 是页面原点在图像中的位置。
pub fn render_page(page: &Page, width: u32, height: u32, origin_x: i32, origin_y: i32) -> RgbaImage {
    let mut target = RgbaImage::new(width, height);
    draw_page(&mut target, page, origin_x, origin_y);
    target
}

/// 把页面绘制到已有图像上，隐藏的字形跳过
pub fn draw_page(target: &mut RgbaImage, page: &Page, origin_x: i32, origin_y: i32) {
    for glyph in page.glyphs.iter().filter(|g| !g.hidden) {
        let x = origin_x + glyph.position.x + glyph.offset.x.round() as i32;
        let y = origin_y + glyph.position.y + glyph.offset.y.round() as i32;
        let fill = glyph.fill;

        for (gx, gy, mask) in glyph.image.enumerate_pixels() {
            if mask[3] == 0 {
                continue;
            }
            let alpha = (mask[3] as u16 * fill[3] as u16 / 255) as u8;
            let tinted = Rgba([fill[0], fill[1], fill[2], alpha]);
            blend_at(target, x + gx as i32, y + gy as i32, tinted);
        }
    }
}

/// 带边界检查的 source-over 混合
fn blend_at(target: &mut RgbaImage, x: i32, y: i32, source: Rgba<u8>) {
    if x < 0 || y < 0 || x as u32 >= target.width() || y as u32 >= target.height() {
        return;
    }
    target.get_pixel_mut(x as u32, y as u32).blend(&source);
}

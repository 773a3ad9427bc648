// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Selection preview: draws the photo contain-fitted into the viewport with
// the selected quadrilateral and its four drag handles on top.

use docscan_core::error::{Result, ScanError};
use docscan_core::{ImageSize, MAX_IMAGE_DIMENSION, Point, Quad, Viewport};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    Blend, draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut,
};
use tracing::{debug, instrument};

use crate::geometry::mapper::CoordinateMapper;
use crate::image::processor::ImageProcessor;

const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);
const OUTLINE: Rgba<u8> = Rgba([234, 88, 12, 255]);
const HANDLE_HALO: Rgba<u8> = Rgba([234, 88, 12, 128]);
const HANDLE_CENTRE: Rgba<u8> = Rgba([255, 255, 255, 255]);

const HALO_RADIUS: i32 = 20;
const CENTRE_RADIUS: i32 = 8;

/// Pixel offsets stroked around each outline segment for a 3 px line.
const STROKE_OFFSETS: [(f32, f32); 5] =
    [(0.0, 0.0), (1.0, 0.0), (-1.0, 0.0), (0.0, 1.0), (0.0, -1.0)];

/// Render the selection preview for `source` at `viewport` size.
#[instrument(skip(source, quad), fields(src_w = source.width(), src_h = source.height()))]
pub fn render_overlay(source: &RgbaImage, quad: &Quad, viewport: Viewport) -> Result<RgbaImage> {
    let size = ImageSize::new(source.width(), source.height());
    let mapper = CoordinateMapper::new(size, viewport)?;
    if !viewport.fits_canvas() {
        return Err(ScanError::Config(format!(
            "viewport {}x{} exceeds {MAX_IMAGE_DIMENSION} pixels",
            viewport.width, viewport.height
        )));
    }
    let fit = mapper.fit();

    let canvas_w = viewport.width.ceil().max(1.0) as u32;
    let canvas_h = viewport.height.ceil().max(1.0) as u32;
    let mut canvas = RgbaImage::from_pixel(canvas_w, canvas_h, BACKGROUND);

    let draw_w = fit.draw_width.round().max(1.0) as u32;
    let draw_h = fit.draw_height.round().max(1.0) as u32;
    let fitted = ImageProcessor::from_rgba(source.clone())
        .resize_exact(draw_w, draw_h)
        .into_rgba8();
    image::imageops::overlay(
        &mut canvas,
        &fitted,
        fit.offset_x.round() as i64,
        fit.offset_y.round() as i64,
    );

    let handles = mapper.handles(quad);
    for i in 0..4 {
        let from = as_f32(handles[i]);
        let to = as_f32(handles[(i + 1) % 4]);
        for (dx, dy) in STROKE_OFFSETS {
            draw_line_segment_mut(
                &mut canvas,
                (from.0 + dx, from.1 + dy),
                (to.0 + dx, to.1 + dy),
                OUTLINE,
            );
        }
    }

    let mut blended = Blend(canvas);
    for handle in handles {
        draw_filled_circle_mut(&mut blended, as_i32(handle), HALO_RADIUS, HANDLE_HALO);
    }
    let mut canvas = blended.0;
    for handle in handles {
        let centre = as_i32(handle);
        draw_filled_circle_mut(&mut canvas, centre, CENTRE_RADIUS, HANDLE_CENTRE);
        draw_hollow_circle_mut(&mut canvas, centre, CENTRE_RADIUS, OUTLINE);
    }

    debug!(canvas_w, canvas_h, draw_w, draw_h, "Overlay rendered");
    Ok(canvas)
}

fn as_f32(p: Point) -> (f32, f32) {
    (p.x as f32, p.y as f32)
}

fn as_i32(p: Point) -> (i32, i32) {
    (p.x.round() as i32, p.y.round() as i32)
}

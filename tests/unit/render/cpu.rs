use super::*;
use crate::{
    foundation::config::CollageConfig,
    layout::collage::{LayoutParams, solve_layout},
    render::plan::{CollagePlan, CollageVariant, plan_collage},
};

const RED: [u8; 4] = [255, 0, 0, 255];

fn small_config() -> CollageConfig {
    let mut cfg = CollageConfig {
        width: 300,
        height: 450,
        gap: 10.0,
        bottom_band: 15.0,
        framed_margin: 15.0,
        corner_radius: 8.0,
        ..CollageConfig::default()
    };
    cfg.shadow.blur_radius = 6;
    cfg.shadow.offset_y = 3.0;
    cfg
}

fn solid_photos(rgba: [u8; 4]) -> Vec<Option<RasterImage>> {
    (0..4)
        .map(|_| Some(RasterImage::solid(60, 80, rgba).unwrap()))
        .collect()
}

fn px(c: &CanvasRgba, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * c.width + x) * 4) as usize;
    [c.data[i], c.data[i + 1], c.data[i + 2], c.data[i + 3]]
}

fn close(a: [u8; 4], b: [u8; 4], tol: u8) -> bool {
    a.iter().zip(b).all(|(x, y)| x.abs_diff(y) <= tol)
}

fn render(plan: &CollagePlan) -> CanvasRgba {
    CpuBackend::new().render_plan(plan).unwrap()
}

#[test]
fn cells_are_filled_and_gaps_stay_light() {
    let cfg = small_config();
    let photos = solid_photos(RED);
    let plan = plan_collage(&cfg, CollageVariant::Preview, &photos, None, (0.0, 0.0)).unwrap();
    let out = render(&plan);
    assert_eq!((out.width, out.height), (300, 450));
    assert!(out.premultiplied);

    let g = solve_layout(&LayoutParams::preview(&cfg).unwrap()).unwrap();
    for cell in g.cells() {
        let c = cell.center();
        assert!(close(px(&out, c.x as u32, c.y as u32), RED, 2), "{cell:?}");
    }
    // Top edge of the gap between the two upper cells: no photo, only a faint shadow.
    let gap_x = (g.cell_rect(0).x1 + 5.0) as u32;
    let top = px(&out, gap_x, g.cell_rect(0).y0 as u32);
    assert!(top[1] > 200 && top[3] == 255, "{top:?}");
}

#[test]
fn corners_are_rounded() {
    let cfg = small_config();
    let photos = solid_photos(RED);
    let plan = plan_collage(&cfg, CollageVariant::Preview, &photos, None, (0.0, 0.0)).unwrap();
    let out = render(&plan);
    let cell = solve_layout(&LayoutParams::preview(&cfg).unwrap())
        .unwrap()
        .cell_rect(3);
    let corner = px(&out, cell.x1 as u32 - 1, cell.y0.ceil() as u32);
    assert!(
        corner[1] > 100,
        "corner should not be photo-colored: {corner:?}"
    );
    let inside = px(&out, cell.x1 as u32 - 10, cell.y0.ceil() as u32 + 10);
    assert!(close(inside, RED, 2), "{inside:?}");
}

#[test]
fn shadow_darkens_below_each_cell() {
    let cfg = small_config();
    let plan = plan_collage(
        &cfg,
        CollageVariant::Preview,
        &solid_photos([255, 255, 255, 255]),
        None,
        (0.0, 0.0),
    )
    .unwrap();
    let out = render(&plan);
    let cell = solve_layout(&LayoutParams::preview(&cfg).unwrap())
        .unwrap()
        .cell_rect(2);
    let below = px(&out, cell.center().x as u32, cell.y1.ceil() as u32 + 1);
    assert!(below[0] < 250 && below[0] > 150, "{below:?}");
    assert_eq!(below[3], 255);
    // Far away from any cell the canvas stays white.
    assert_eq!(px(&out, 299, 449), [255, 255, 255, 255]);
}

#[test]
fn opaque_frame_covers_everything() {
    let cfg = small_config();
    let frame = RasterImage::solid(20, 30, [0, 0, 255, 255]).unwrap();
    let plan = plan_collage(
        &cfg,
        CollageVariant::Framed,
        &solid_photos(RED),
        Some(&frame),
        (1.0, 5.0),
    )
    .unwrap();
    let out = render(&plan);
    for p in out.data.chunks_exact(4) {
        let pixel = [p[0], p[1], p[2], p[3]];
        assert!(close(pixel, [0, 0, 255, 255], 1), "{pixel:?}");
    }
}

#[test]
fn rendering_is_byte_deterministic() {
    let cfg = small_config();
    let photos: Vec<_> = (0..4u8)
        .map(|i| {
            let rgba: Vec<u8> = (0..(37 * 53))
                .flat_map(|k| [(k % 251) as u8, i * 40, (k % 7) as u8 * 30, 255])
                .collect();
            Some(RasterImage::from_straight_rgba8(37, 53, rgba).unwrap())
        })
        .collect();
    let plan = plan_collage(&cfg, CollageVariant::Framed, &photos, None, (0.0, 0.0)).unwrap();
    let a = render(&plan);
    let b = render(&plan);
    assert_eq!(a, b);
}

#[test]
fn draw_before_begin_is_an_error() {
    let mut backend = CpuBackend::new();
    let op = DrawOp::Frame {
        image: RasterImage::solid(1, 1, RED).unwrap(),
        dst: Rect::new(0.0, 0.0, 1.0, 1.0),
    };
    assert!(backend.draw(&op).is_err());
    assert!(backend.readback_rgba8().is_err());
}

use super::*;
use crate::{
    assets::decode::{RasterImage, decode_image},
    foundation::{
        config::CollageConfig,
        core::{Canvas, Rgba8},
    },
    render::plan::{CollageVariant, DrawOp, plan_collage},
};

#[derive(Default)]
struct RecordingBackend {
    canvas: Option<Canvas>,
    log: Vec<String>,
}

impl RenderBackend for RecordingBackend {
    fn begin(&mut self, canvas: Canvas, _clear: Rgba8) -> BoothResult<()> {
        self.canvas = Some(canvas);
        self.log.push("begin".to_string());
        Ok(())
    }

    fn draw(&mut self, op: &DrawOp) -> BoothResult<()> {
        self.log.push(match op {
            DrawOp::Shadow { slot, .. } => format!("shadow{slot}"),
            DrawOp::Photo { slot, .. } => format!("photo{slot}"),
            DrawOp::Frame { .. } => "frame".to_string(),
        });
        Ok(())
    }

    fn readback_rgba8(&mut self) -> BoothResult<CanvasRgba> {
        let c = self
            .canvas
            .ok_or_else(|| BoothError::validation("no canvas"))?;
        Ok(CanvasRgba {
            width: c.width,
            height: c.height,
            data: vec![255; c.width as usize * c.height as usize * 4],
            premultiplied: true,
        })
    }
}

fn small_config() -> CollageConfig {
    CollageConfig {
        width: 120,
        height: 180,
        gap: 4.0,
        bottom_band: 6.0,
        framed_margin: 6.0,
        corner_radius: 3.0,
        ..CollageConfig::default()
    }
}

fn photos() -> Vec<Option<RasterImage>> {
    (0..4)
        .map(|_| Some(RasterImage::solid(6, 8, [9, 9, 9, 255]).unwrap()))
        .collect()
}

#[test]
fn ops_run_in_plan_order_with_frame_last() {
    let frame = RasterImage::solid(4, 6, [0, 0, 0, 128]).unwrap();
    let plan = plan_collage(
        &small_config(),
        CollageVariant::Framed,
        &photos(),
        Some(&frame),
        (0.0, 0.0),
    )
    .unwrap();
    let mut backend = RecordingBackend::default();
    let out = render_with(&mut backend, &plan).unwrap();
    assert_eq!((out.width, out.height), (120, 180));
    assert_eq!(
        backend.log,
        [
            "begin", "shadow0", "photo0", "shadow1", "photo1", "shadow2", "photo2", "shadow3",
            "photo3", "frame"
        ]
    );
}

#[test]
fn not_ready_plans_never_reach_the_backend() {
    let mut ps = photos();
    ps[3] = None;
    let cfg = small_config();
    let err = plan_collage(&cfg, CollageVariant::Preview, &ps, None, (0.0, 0.0)).unwrap_err();
    assert!(matches!(err, BoothError::ComposeNotReady { filled: 3 }));
}

#[test]
fn encode_unpremultiplies() {
    let canvas = CanvasRgba {
        width: 1,
        height: 1,
        data: vec![64, 0, 0, 128],
        premultiplied: true,
    };
    let png = encode_canvas_png(&canvas).unwrap();
    let img = image::load_from_memory(&png).unwrap().to_rgba8();
    let p = img.get_pixel(0, 0).0;
    assert_eq!(p[3], 128);
    assert!(p[0].abs_diff(128) <= 1, "{p:?}");
}

#[tokio::test]
async fn blocking_render_produces_canonical_png() {
    let plan = plan_collage(
        &small_config(),
        CollageVariant::Preview,
        &photos(),
        None,
        (0.0, 0.0),
    )
    .unwrap();
    let result = render_collage_blocking(plan.clone()).await.unwrap();
    assert_eq!((result.width, result.height), (120, 180));
    let decoded = decode_image(&result.png).unwrap();
    assert_eq!((decoded.width, decoded.height), (120, 180));
    assert_eq!(result, render_collage(&plan).unwrap());

    let dir = std::path::PathBuf::from("target").join("pipeline_unit");
    let path = result.write_to(&dir, "photobooth.png").unwrap();
    assert_eq!(std::fs::read(path).unwrap(), result.png);
}

use super::*;

#[test]
fn defaults_are_valid_and_canonical() {
    let cfg = BoothConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.collage.width, 1200);
    assert_eq!(cfg.collage.height, 1800);
    assert_eq!(cfg.capture.countdown_ticks, 5);
    assert_eq!(cfg.frames.len(), 4);
    assert_eq!(cfg.export_file_name, "photobooth.png");
}

#[test]
fn partial_json_fills_defaults() {
    let cfg: BoothConfig = serde_json::from_str(
        r#"{
            "collage": { "gap": 10.0 },
            "capture": { "countdown_ticks": 3 },
            "frames": {
                "retro_film": { "source": { "prompt": "film strip border" } }
            }
        }"#,
    )
    .unwrap();
    cfg.validate().unwrap();
    assert_eq!(cfg.collage.gap, 10.0);
    assert_eq!(cfg.collage.width, 1200);
    assert_eq!(cfg.capture.countdown_ticks, 3);
    assert_eq!(cfg.capture.tick_ms, 1000);
    assert_eq!(cfg.frames.len(), 1);
    assert_eq!(
        cfg.frames[&BackgroundKey::RetroFilm].source,
        FrameSource::Prompt("film strip border".to_string())
    );
    assert_eq!(cfg.frame_offset(Some(BackgroundKey::RetroFilm)), (0.0, 0.0));
}

#[test]
fn frame_offset_defaults_to_zero_without_background() {
    let cfg = BoothConfig::default();
    assert_eq!(cfg.frame_offset(None), (0.0, 0.0));
    assert_eq!(
        cfg.frame_offset(Some(BackgroundKey::ClassicMono)),
        (4.0, 70.0)
    );
}

#[test]
fn overrides_apply_and_validate() {
    let mut cfg = BoothConfig::default();
    cfg.apply_overrides_from(|name| match name {
        ENV_GATEWAY_URL => Some(" http://booth.local:9000 ".to_string()),
        ENV_GATEWAY_TIMEOUT_SECS => Some("30".to_string()),
        ENV_ASSETS_ROOT => Some("/srv/booth".to_string()),
        _ => None,
    })
    .unwrap();
    assert_eq!(cfg.gateway.base_url, "http://booth.local:9000");
    assert_eq!(cfg.gateway.timeout_secs, 30);
    assert_eq!(cfg.assets_root, PathBuf::from("/srv/booth"));
    assert_eq!(cfg.gateway.model, "imagen-4.0-generate-001");
}

#[test]
fn bad_override_is_config_error() {
    let mut cfg = BoothConfig::default();
    let lookup = |name: &str| (name == ENV_GATEWAY_TIMEOUT_SECS).then(|| "soon".to_string());
    let err = cfg.apply_overrides_from(lookup).unwrap_err();
    assert!(matches!(err, BoothError::Config(_)));
}

#[test]
fn validate_rejects_out_of_range_values() {
    let mut cfg = BoothConfig::default();
    cfg.collage.framed_scale = 0.0;
    assert!(cfg.validate().is_err());

    let mut cfg = BoothConfig::default();
    cfg.collage.framed_scale = 1.5;
    assert!(cfg.validate().is_err());

    let mut cfg = BoothConfig::default();
    cfg.capture.countdown_ticks = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = BoothConfig::default();
    cfg.collage.width = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = BoothConfig::default();
    cfg.collage.shadow.alpha = 2.0;
    assert!(cfg.validate().is_err());
}

#[test]
fn from_json_path_reports_parse_errors() {
    let dir = std::path::PathBuf::from("target").join("config_unit");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("bad.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = BoothConfig::from_json_path(&path).unwrap_err();
    assert!(matches!(err, BoothError::Config(_)));

    let missing = dir.join("missing.json");
    let _ = std::fs::remove_file(&missing);
    assert!(matches!(
        BoothConfig::from_json_path(&missing).unwrap_err(),
        BoothError::Other(_)
    ));
}

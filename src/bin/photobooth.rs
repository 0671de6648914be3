use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use photobooth::{
    BackgroundKey, BoothConfig, CollageVariant, HttpGateway, Photo, PhotoStyleKey, ReplayCamera,
    SessionOrchestrator, assets::decode::decode_image, plan_collage, render_collage,
};

#[derive(Parser, Debug)]
#[command(name = "photobooth", version)]
struct Cli {
    /// JSON config file; `PHOTOBOOTH_*` environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite four existing photos into a collage PNG.
    Compose(ComposeArgs),
    /// Run a full booth session from still images, stylizing through the gateway.
    Session(SessionArgs),
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Photo files in slot order; exactly four.
    #[arg(long = "photo", required = true)]
    photos: Vec<PathBuf>,

    /// Frame image drawn above the grid (framed variant only).
    #[arg(long)]
    frame: Option<PathBuf>,

    /// Background whose calibration offset is applied to the framed grid.
    #[arg(long)]
    background: Option<BackgroundKey>,

    #[arg(long, value_enum, default_value_t = VariantChoice::Preview)]
    variant: VariantChoice,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct SessionArgs {
    /// Stills replayed as camera frames, cycling.
    #[arg(long = "still", required = true)]
    stills: Vec<PathBuf>,

    /// Background frame; defaults to the configured one.
    #[arg(long)]
    background: Option<BackgroundKey>,

    /// Photo style applied before export.
    #[arg(long)]
    style: Option<PhotoStyleKey>,

    /// Directory the final PNG is written to.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum VariantChoice {
    Preview,
    Framed,
}

impl From<VariantChoice> for CollageVariant {
    fn from(v: VariantChoice) -> Self {
        match v {
            VariantChoice::Preview => Self::Preview,
            VariantChoice::Framed => Self::Framed,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref())?;
    match cli.cmd {
        Command::Compose(args) => cmd_compose(&cfg, args),
        Command::Session(args) => cmd_session(cfg, args).await,
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<BoothConfig> {
    let mut cfg = match path {
        Some(p) => BoothConfig::from_json_path(p)?,
        None => BoothConfig::default(),
    };
    cfg.apply_env_overrides()?;
    Ok(cfg)
}

fn read_photo(path: &Path) -> anyhow::Result<Photo> {
    let bytes = std::fs::read(path).with_context(|| format!("read photo '{}'", path.display()))?;
    Photo::from_encoded(&bytes).with_context(|| format!("decode photo '{}'", path.display()))
}

fn cmd_compose(cfg: &BoothConfig, args: ComposeArgs) -> anyhow::Result<()> {
    if args.photos.len() != photobooth::SLOT_COUNT {
        anyhow::bail!(
            "compose needs exactly {} photos, got {}",
            photobooth::SLOT_COUNT,
            args.photos.len()
        );
    }
    let images = args
        .photos
        .iter()
        .map(|p| read_photo(p).map(|photo| Some(photo.image)))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let frame = match &args.frame {
        Some(p) => {
            let bytes =
                std::fs::read(p).with_context(|| format!("read frame '{}'", p.display()))?;
            Some(decode_image(&bytes)?)
        }
        None => None,
    };

    let plan = plan_collage(
        &cfg.collage,
        args.variant.into(),
        &images,
        frame.as_ref(),
        cfg.frame_offset(args.background),
    )?;
    let out = render_collage(&plan)?;
    std::fs::write(&args.out, &out.png)
        .with_context(|| format!("write collage '{}'", args.out.display()))?;
    tracing::info!(
        path = %args.out.display(),
        width = out.width,
        height = out.height,
        "collage written"
    );
    Ok(())
}

async fn cmd_session(cfg: BoothConfig, args: SessionArgs) -> anyhow::Result<()> {
    let camera = ReplayCamera::from_paths(&args.stills)?;
    let gateway = Arc::new(HttpGateway::new(&cfg.gateway)?);
    let mut booth = SessionOrchestrator::new(camera, gateway, cfg)?;

    booth.start().await?;
    loop {
        let slot = booth.capture_next().await?;
        tracing::info!(slot, "photo taken");
        if booth.keep_photo()? {
            break;
        }
    }

    booth.compose_preview().await?;
    booth.open_editor().await?;
    if args.background.is_some() {
        booth.select_background(args.background).await?;
    }
    if let Some(style) = args.style {
        booth.set_photo_style(Some(style));
        booth.apply_style().await?;
    }
    for notice in booth.take_notices() {
        tracing::warn!("{notice}");
    }

    let path = booth.export(&args.out_dir)?;
    println!("{}", path.display());
    Ok(())
}

use std::{fmt, path::PathBuf, str::FromStr};

use crate::foundation::error::BoothError;

/// Decorative frame variants drawn above the photo grid.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundKey {
    FreshJapanese,
    RetroFilm,
    KoreanFilm,
    ClassicMono,
}

impl BackgroundKey {
    pub const ALL: [Self; 4] = [
        Self::FreshJapanese,
        Self::RetroFilm,
        Self::KoreanFilm,
        Self::ClassicMono,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Self::FreshJapanese => "fresh_japanese",
            Self::RetroFilm => "retro_film",
            Self::KoreanFilm => "korean_film",
            Self::ClassicMono => "classic_mono",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::FreshJapanese => "Fresh Japanese",
            Self::RetroFilm => "Retro Film",
            Self::KoreanFilm => "Korean Film",
            Self::ClassicMono => "Classic Black & White",
        }
    }

    /// Asset path of the stock frame art, relative to the assets root.
    pub fn default_asset_path(self) -> String {
        format!("frames/{}.png", self.slug())
    }
}

/// Portrait styles offered to the stylization service.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PhotoStyleKey {
    Pixar,
    /// Keep the raw capture; never sent to the gateway.
    Original,
    ChibiFigure,
    HandDrawnAnime,
}

impl PhotoStyleKey {
    pub const ALL: [Self; 4] = [
        Self::Pixar,
        Self::Original,
        Self::ChibiFigure,
        Self::HandDrawnAnime,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Self::Pixar => "pixar",
            Self::Original => "original",
            Self::ChibiFigure => "chibi_figure",
            Self::HandDrawnAnime => "hand_drawn_anime",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pixar => "Pixar",
            Self::Original => "Original photo",
            Self::ChibiFigure => "Chibi figure",
            Self::HandDrawnAnime => "Hand-drawn anime",
        }
    }

    pub fn is_passthrough(self) -> bool {
        self == Self::Original
    }

    /// Instruction text passed verbatim to the gateway.
    pub fn prompt(self) -> &'static str {
        match self {
            Self::Pixar => {
                "Transform the photo into Pixar 3D animation style, smooth rounded features, \
                 vibrant colors, soft lighting, cartoon-like proportions while preserving facial \
                 features, Disney Pixar character aesthetic, high-quality 3D rendering"
            }
            Self::Original => {
                "Keep the original photo unchanged, no style transformation, preserve natural \
                 appearance and colors"
            }
            Self::ChibiFigure => {
                "Transform into super-deformed chibi figure style, big head small body ratio 1:2, \
                 glossy vinyl toy surface, soft studio lighting, cute proportions, smooth skin, \
                 tiny hands, gentle reflections, high detail but clean shapes, preserve likeness, \
                 kawaii aesthetic"
            }
            Self::HandDrawnAnime => {
                "Transform into Studio Ghibli hand-drawn animation style, soft watercolor-like \
                 textures, gentle shading, warm color palette, Miyazaki film aesthetic, preserve \
                 facial features in Ghibli's distinctive artistic style, high-quality anime \
                 illustration"
            }
        }
    }
}

/// How a background frame is obtained.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameSource {
    /// Static image file, relative paths resolve against the assets root.
    Asset(PathBuf),
    /// Text prompt resolved to an image by the generation service.
    Prompt(String),
}

/// Current background and photo style choice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StyleSelection {
    pub background: Option<BackgroundKey>,
    pub photo_style: Option<PhotoStyleKey>,
}

fn parse_slug<T: Copy>(raw: &str, all: &[T], slug: fn(T) -> &'static str) -> Option<T> {
    let norm = raw.trim().to_ascii_lowercase().replace('-', "_");
    all.iter().copied().find(|k| slug(*k) == norm)
}

impl FromStr for BackgroundKey {
    type Err = BoothError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_slug(s, &Self::ALL, Self::slug)
            .ok_or_else(|| BoothError::validation(format!("unknown background '{s}'")))
    }
}

impl FromStr for PhotoStyleKey {
    type Err = BoothError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_slug(s, &Self::ALL, Self::slug)
            .ok_or_else(|| BoothError::validation(format!("unknown photo style '{s}'")))
    }
}

impl fmt::Display for BackgroundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl fmt::Display for PhotoStyleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

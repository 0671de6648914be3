//! 2x2 collage geometry shared by the preview and framed variants.

pub mod collage;

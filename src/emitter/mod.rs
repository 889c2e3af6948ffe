//! Media-server bundle output
//!
//! An [`ArtifactEmitter`] turns one enriched record (plus its cached poster)
//! into files a media server can index. [`NfoEmitter`] writes the
//! Kodi/Jellyfin layout: a `<movie>` `.nfo` document, a poster next to it and
//! a zero-byte placeholder video so the library scanner picks the entry up.

mod nfo;
mod traits;

pub use nfo::NfoEmitter;
pub use traits::ArtifactEmitter;

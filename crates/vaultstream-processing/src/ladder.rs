//! Quality-ladder derivation.
//!
//! The ladder is deterministic from the source height: every standard
//! rendition not exceeding the source, highest first. A source below the
//! smallest standard height gets a single rendition at its own height so
//! nothing is ever upscaled.

use serde::{Deserialize, Serialize};

/// (height, video bitrate in kbit/s), highest first.
pub const RENDITION_LADDER: [(u32, u32); 4] = [(1080, 5000), (720, 2800), (480, 1400), (360, 800)];

const FALLBACK_BITRATE_KBPS: u32 = 800;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendition {
    pub name: String,
    pub height: u32,
    pub bitrate_kbps: u32,
}

impl Rendition {
    fn new(height: u32, bitrate_kbps: u32) -> Self {
        Rendition {
            name: format!("{}p", height),
            height,
            bitrate_kbps,
        }
    }

    pub fn playlist_name(&self) -> String {
        format!("{}.m3u8", self.name)
    }
}

/// Derive the encode ladder for a source of the given height.
pub fn derive_ladder(source_height: u32) -> Vec<Rendition> {
    let valid: Vec<Rendition> = RENDITION_LADDER
        .iter()
        .filter(|(height, _)| *height <= source_height)
        .map(|&(height, bitrate)| Rendition::new(height, bitrate))
        .collect();

    if valid.is_empty() {
        vec![Rendition::new(source_height, FALLBACK_BITRATE_KBPS)]
    } else {
        valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heights(ladder: &[Rendition]) -> Vec<u32> {
        ladder.iter().map(|r| r.height).collect()
    }

    #[test]
    fn test_1080p_source_gets_full_ladder() {
        let ladder = derive_ladder(1080);
        assert_eq!(heights(&ladder), vec![1080, 720, 480, 360]);
        assert_eq!(ladder[0].name, "1080p");
        assert_eq!(ladder[0].bitrate_kbps, 5000);
    }

    #[test]
    fn test_720p_source_is_not_upscaled() {
        let ladder = derive_ladder(720);
        assert_eq!(heights(&ladder), vec![720, 480, 360]);
    }

    #[test]
    fn test_4k_source_caps_at_1080p() {
        let ladder = derive_ladder(2160);
        assert_eq!(heights(&ladder), vec![1080, 720, 480, 360]);
    }

    #[test]
    fn test_tiny_source_gets_single_native_rendition() {
        let ladder = derive_ladder(240);
        assert_eq!(ladder.len(), 1);
        assert_eq!(ladder[0].name, "240p");
        assert_eq!(ladder[0].height, 240);
        assert_eq!(ladder[0].bitrate_kbps, 800);
    }

    #[test]
    fn test_exact_360p_source() {
        let ladder = derive_ladder(360);
        assert_eq!(heights(&ladder), vec![360]);
        assert_eq!(ladder[0].bitrate_kbps, 800);
    }

    #[test]
    fn test_odd_height_between_rungs() {
        let ladder = derive_ladder(500);
        assert_eq!(heights(&ladder), vec![480, 360]);
    }

    #[test]
    fn test_no_rendition_exceeds_source() {
        for source_height in [144, 360, 481, 719, 720, 1080, 1440] {
            for rendition in derive_ladder(source_height) {
                assert!(rendition.height <= source_height);
            }
        }
    }

    #[test]
    fn test_playlist_name() {
        assert_eq!(Rendition::new(720, 2800).playlist_name(), "720p.m3u8");
    }
}

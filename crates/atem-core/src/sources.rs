//! Well-known video source ids.
//!
//! The switcher addresses every video source by a stable 16-bit id that
//! is the same across the product line. Models with fewer inputs simply
//! reject ids they do not have. These are the values accepted by bus
//! change commands and reported back in bus status.

/// Black generator.
pub const BLACK: u16 = 0;

/// Camera inputs 1 through 8. Larger models continue the run: camera N
/// is always id N, up to [`CAM_MAX`].
pub const CAM1: u16 = 1;
pub const CAM2: u16 = 2;
pub const CAM3: u16 = 3;
pub const CAM4: u16 = 4;
pub const CAM5: u16 = 5;
pub const CAM6: u16 = 6;
pub const CAM7: u16 = 7;
pub const CAM8: u16 = 8;

/// Highest camera id across the product line.
pub const CAM_MAX: u16 = 40;

/// Color bars generator.
pub const BARS: u16 = 1000;

/// Flat color generators.
pub const COLOR1: u16 = 2001;
pub const COLOR2: u16 = 2002;

/// Media players and their key (alpha) outputs.
pub const MEDIA_PLAYER1: u16 = 3010;
pub const MEDIA_PLAYER1_KEY: u16 = 3011;
pub const MEDIA_PLAYER2: u16 = 3020;
pub const MEDIA_PLAYER2_KEY: u16 = 3021;
pub const MEDIA_PLAYER3: u16 = 3030;
pub const MEDIA_PLAYER3_KEY: u16 = 3031;
pub const MEDIA_PLAYER4: u16 = 3040;
pub const MEDIA_PLAYER4_KEY: u16 = 3041;

/// SuperSource compositors.
pub const SUPER_SOURCE: u16 = 7001;
pub const SUPER_SOURCE2: u16 = 7002;

/// Internal re-entries: feed a bus back in as a source.
pub const PROGRAM: u16 = 10010;
pub const PREVIEW: u16 = 10011;
pub const MULTIVIEW: u16 = 10012;

/// Auxiliary outputs.
pub const AUX1: u16 = 11001;
pub const AUX2: u16 = 11002;
pub const AUX3: u16 = 11003;
pub const AUX4: u16 = 11004;
pub const AUX5: u16 = 11005;
pub const AUX6: u16 = 11006;

/// Status sources for streaming and recording overlays.
pub const STREAMING: u16 = 12001;
pub const RECORDING: u16 = 12002;

/// Returns `true` for ids in the camera input range.
pub fn is_camera(id: u16) -> bool {
    (CAM1..=CAM_MAX).contains(&id)
}

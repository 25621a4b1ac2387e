use crate::model::{Bar, Melody, MelodySource};
use tunle_ports::melody::Difficulty;

pub const BUNDLED_SESSION_TAG: &str = "bundled";

// (note, left quaver, right quaver)
const BAR_1: &[(u8, bool, bool)] = &[
    (1, false, false),
    (1, false, false),
    (5, false, false),
    (5, false, false),
];
const BAR_2: &[(u8, bool, bool)] = &[
    (6, true, false),
    (6, false, true),
    (6, false, false),
    (5, false, false),
];
const BAR_3: &[(u8, bool, bool)] = &[
    (4, false, false),
    (4, false, false),
    (3, false, false),
    (3, false, false),
];
const BAR_4: &[(u8, bool, bool)] = &[
    (2, false, false),
    (2, false, false),
    (1, false, false),
];

/// Melody shipped with the app, used whenever the daily melody cannot be resolved.
/// Clip paths are relative to the asset root.
pub fn bundled_melody() -> Melody {
    Melody {
        session_tag: BUNDLED_SESSION_TAG.to_string(),
        date: None,
        difficulty: Some(Difficulty::Easy),
        source: MelodySource::Bundled,
        bars: [
            Bar::from_static(BAR_1),
            Bar::from_static(BAR_2),
            Bar::from_static(BAR_3),
            Bar::from_static(BAR_4),
        ],
        bar_urls: [
            "bundled/bar1.wav".to_string(),
            "bundled/bar2.wav".to_string(),
            "bundled/bar3.wav".to_string(),
            "bundled/bar4.wav".to_string(),
        ],
        full_tune_url: "bundled/full.wav".to_string(),
    }
}

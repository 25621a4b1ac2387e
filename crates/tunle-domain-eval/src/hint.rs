use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HintLevel {
    #[default]
    None,
    /// Reveal the expected note while it is one of the first two of the bar.
    FirstTwo,
    /// Reveal every expected note.
    Full,
}

impl HintLevel {
    /// Escalation for the hearts left on the current bar. Never lowers the level.
    pub fn escalate(self, hearts_left: u8) -> HintLevel {
        let target = match hearts_left {
            2 => HintLevel::FirstTwo,
            1 => HintLevel::Full,
            _ => return self,
        };
        self.max(target)
    }

    pub fn as_u8(self) -> u8 {
        match self {
            HintLevel::None => 0,
            HintLevel::FirstTwo => 1,
            HintLevel::Full => 2,
        }
    }
}

/// The single note the player is currently allowed to see.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hint {
    pub position: usize,
    pub note: u8,
}

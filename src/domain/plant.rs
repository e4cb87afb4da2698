//! Plant catalog

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const DEFAULT_GROW_TIME: Duration = Duration::from_secs(5 * 60 * 60);

/// A plant a player can hold in inventory and grow on a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Plant {
    Money,
    Strawberry,
    Rose,
    Sunflower,
    ChristmasTree,
}

impl Plant {
    /// Every registered plant, in catalog order
    pub const ALL: [Plant; 5] = [
        Plant::Money,
        Plant::Strawberry,
        Plant::Rose,
        Plant::Sunflower,
        Plant::ChristmasTree,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Plant::Money => "MONEY",
            Plant::Strawberry => "STRAWBERRY",
            Plant::Rose => "ROSE",
            Plant::Sunflower => "SUNFLOWER",
            Plant::ChristmasTree => "CHRISTMAS_TREE",
        }
    }

    /// Look up a plant by its catalog name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }

    /// Time from planting until the field is ready to harvest
    pub fn grow_time(&self) -> Duration {
        DEFAULT_GROW_TIME
    }
}

impl fmt::Display for Plant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Travel direction at the monitored station.

use std::fmt;

/// One of the two platforms we watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
}

impl Direction {
    /// Both directions, in display order.
    pub const ALL: [Direction; 2] = [Direction::North, Direction::South];

    /// Short label that fits alongside two arrivals on a 20 column line.
    pub fn label(&self) -> &'static str {
        match self {
            Direction::North => "Nor",
            Direction::South => "Sou",
        }
    }

    /// Full name, used when there is nothing else to show.
    pub fn name(&self) -> &'static str {
        match self {
            Direction::North => "North",
            Direction::South => "South",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

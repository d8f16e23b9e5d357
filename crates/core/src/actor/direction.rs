use glam::Vec2;

/// Eight-way heading in world space; `Up` is towards negative y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Direction {
    #[default]
    None = 0,
    Up = 1,
    Left = 2,
    Down = 3,
    Right = 4,
    UpLeft = 5,
    UpRight = 6,
    DownLeft = 7,
    DownRight = 8,
}

impl Direction {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::None,
            1 => Self::Up,
            2 => Self::Left,
            3 => Self::Down,
            4 => Self::Right,
            5 => Self::UpLeft,
            6 => Self::UpRight,
            7 => Self::DownLeft,
            8 => Self::DownRight,
            _ => return None,
        })
    }

    /// Heading of a movement delta. Components smaller than a tenth of the
    /// larger one are ignored so near-straight moves stay straight.
    pub fn from_offset(offset: Vec2) -> Self {
        let (ax, ay) = (offset.x.abs(), offset.y.abs());
        let largest = ax.max(ay);
        if largest <= f32::EPSILON {
            return Self::None;
        }

        let threshold = largest * 0.1;
        let horizontal = if ax > threshold { offset.x.signum() } else { 0.0 };
        let vertical = if ay > threshold { offset.y.signum() } else { 0.0 };

        match (horizontal as i8, vertical as i8) {
            (0, -1) => Self::Up,
            (0, 1) => Self::Down,
            (-1, 0) => Self::Left,
            (1, 0) => Self::Right,
            (-1, -1) => Self::UpLeft,
            (1, -1) => Self::UpRight,
            (-1, 1) => Self::DownLeft,
            (1, 1) => Self::DownRight,
            _ => Self::None,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Up => Self::Down,
            Self::Left => Self::Right,
            Self::Down => Self::Up,
            Self::Right => Self::Left,
            Self::UpLeft => Self::DownRight,
            Self::UpRight => Self::DownLeft,
            Self::DownLeft => Self::UpRight,
            Self::DownRight => Self::UpLeft,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Up => "up",
            Self::Left => "left",
            Self::Down => "down",
            Self::Right => "right",
            Self::UpLeft => "up-left",
            Self::UpRight => "up-right",
            Self::DownLeft => "down-left",
            Self::DownRight => "down-right",
        }
    }
}

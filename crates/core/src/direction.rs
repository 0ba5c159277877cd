//! Four-way facing used by every entity and animation lookup.

use serde::{Deserialize, Serialize};

/// Facing direction in screen space (y grows downward).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Toward negative y.
    Up,
    /// Toward positive y.
    #[default]
    Down,
    /// Toward negative x.
    Left,
    /// Toward positive x.
    Right,
}

impl Direction {
    /// All directions in a stable order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Derive a facing from the dominant axis of a movement or aim vector.
    ///
    /// Ties between axes resolve to the horizontal facing. Returns `None`
    /// for a zero vector so callers can keep their previous facing.
    pub fn from_vector(x: f64, y: f64) -> Option<Self> {
        if x == 0.0 && y == 0.0 {
            return None;
        }
        if x.abs() >= y.abs() {
            Some(if x < 0.0 {
                Direction::Left
            } else {
                Direction::Right
            })
        } else {
            Some(if y < 0.0 {
                Direction::Up
            } else {
                Direction::Down
            })
        }
    }

    /// Unit vector for this facing.
    pub fn unit(self) -> (f64, f64) {
        match self {
            Direction::Up => (0.0, -1.0),
            Direction::Down => (0.0, 1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
        }
    }

    /// Bearing of [`Direction::unit`] in radians, as returned by `atan2(y, x)`.
    pub fn angle(self) -> f64 {
        let (x, y) = self.unit();
        y.atan2(x)
    }

    /// Get the opposite facing.
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Lowercase key used by sprite-sheet lookups.
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dominant_axis_picks_facing() {
        assert_eq!(Direction::from_vector(3.0, 1.0), Some(Direction::Right));
        assert_eq!(Direction::from_vector(-3.0, 1.0), Some(Direction::Left));
        assert_eq!(Direction::from_vector(0.5, -2.0), Some(Direction::Up));
        assert_eq!(Direction::from_vector(0.5, 2.0), Some(Direction::Down));
        assert_eq!(Direction::from_vector(0.0, 0.0), None);
    }

    #[test]
    fn left_faces_the_pi_boundary() {
        assert!((Direction::Left.angle().abs() - std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(Direction::Right.angle(), 0.0);
    }

    #[test]
    fn opposite_roundtrips() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
        }
    }
}

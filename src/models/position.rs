use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A point on the abstract integer grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Uniform over `0..=grid_max` on each axis.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, grid_max: i32) -> Self {
        Self {
            x: rng.gen_range(0..=grid_max),
            y: rng.gen_range(0..=grid_max),
        }
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::Position;

    #[test]
    fn random_positions_stay_on_grid() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let p = Position::random(&mut rng, 100);
            assert!((0..=100).contains(&p.x));
            assert!((0..=100).contains(&p.y));
        }
    }

    #[test]
    fn same_seed_same_positions() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        assert_eq!(Position::random(&mut a, 100), Position::random(&mut b, 100));
    }

    #[test]
    fn displays_as_pair() {
        assert_eq!(Position::new(3, -2).to_string(), "(3, -2)");
    }
}

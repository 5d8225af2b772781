use crate::models::position::Position;

/// One tick of diagonal stepping: each axis moves at most one unit toward the target.
pub fn step_toward(current: Position, target: Position) -> Position {
    Position {
        x: current.x + (target.x - current.x).signum(),
        y: current.y + (target.y - current.y).signum(),
    }
}

/// The positions visited while driving one leg, excluding the start.
#[derive(Debug, Clone)]
pub struct Leg {
    current: Position,
    target: Position,
}

impl Leg {
    pub fn new(from: Position, to: Position) -> Self {
        Self {
            current: from,
            target: to,
        }
    }
}

impl Iterator for Leg {
    type Item = Position;

    fn next(&mut self) -> Option<Position> {
        if self.current == self.target {
            return None;
        }
        self.current = step_toward(self.current, self.target);
        Some(self.current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = crate::geo::chebyshev(&self.current, &self.target) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Leg {}

#[cfg(test)]
mod tests {
    use super::{step_toward, Leg};
    use crate::geo::chebyshev;
    use crate::models::position::Position;

    #[test]
    fn diagonal_leg_visits_expected_cells() {
        let visited: Vec<Position> = Leg::new(Position::new(0, 0), Position::new(3, -2)).collect();

        assert_eq!(
            visited,
            vec![Position::new(1, -1), Position::new(2, -2), Position::new(3, -2)]
        );
    }

    #[test]
    fn tick_count_matches_chebyshev_distance() {
        let cases = [
            (Position::new(0, 0), Position::new(100, 0)),
            (Position::new(50, 50), Position::new(0, 5)),
            (Position::new(-7, 12), Position::new(3, 3)),
        ];

        for (from, to) in cases {
            let leg = Leg::new(from, to);
            assert_eq!(leg.len(), chebyshev(&from, &to) as usize);
            assert_eq!(leg.last(), Some(to));
        }
    }

    #[test]
    fn empty_leg_when_already_there() {
        let here = Position::new(4, 4);
        assert_eq!(Leg::new(here, here).next(), None);
    }

    #[test]
    fn aligned_axis_stays_put() {
        let next = step_toward(Position::new(5, 9), Position::new(5, 0));
        assert_eq!(next, Position::new(5, 8));
    }
}

//! The three-trial neighborhood that parameterizes interpolation.

use super::repository::{Direction, TrialId, TrialRepository};
use super::state::{Move, SearchState, Trap};
use super::strategy::Strategy;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bracket {
    pub left: Option<TrialId>,
    pub center: Option<TrialId>,
    pub right: Option<TrialId>,
}

impl Bracket {
    pub fn is_complete(&self) -> bool {
        self.left.is_some() && self.center.is_some() && self.right.is_some()
    }

    pub fn contains(&self, id: TrialId) -> bool {
        self.left == Some(id) || self.center == Some(id) || self.right == Some(id)
    }

    /// Applies a step strategy using trials already in the repository.
    ///
    /// Returns false when the walk ran off the end of the repository. The
    /// direction of the walk is recorded so a follow-up guess extends the same way.
    pub fn step(
        &mut self,
        strategy: Strategy,
        repo: &TrialRepository,
        state: &mut SearchState,
    ) -> bool {
        match strategy {
            Strategy::Init => {
                if self.center.is_none() {
                    self.center = seek_real(repo, state.anchor, Direction::Here);
                    state.guess_direction = Direction::Here;
                    self.center.is_some()
                } else if self.right.is_none() {
                    self.right = seek_real(repo, self.center, Direction::Next);
                    state.guess_direction = Direction::Next;
                    self.right.is_some()
                } else if self.left.is_none() {
                    self.left = seek_real(repo, self.center, Direction::Previous);
                    state.guess_direction = Direction::Previous;
                    self.left.is_some()
                } else {
                    true
                }
            }
            Strategy::SkipLeft => {
                self.left = seek_real(repo, self.left, Direction::Previous);
                state.guess_direction = Direction::Previous;
                self.left.is_some()
            }
            Strategy::SkipRight => {
                self.right = seek_real(repo, self.right, Direction::Next);
                state.guess_direction = Direction::Next;
                self.right.is_some()
            }
            Strategy::ShiftLeft => {
                let left = seek_real(repo, self.left, Direction::Previous);
                *self = Bracket {
                    left,
                    center: self.left,
                    right: self.center,
                };
                state.guess_direction = Direction::Previous;
                left.is_some()
            }
            Strategy::ShiftRight => {
                let right = seek_real(repo, self.right, Direction::Next);
                *self = Bracket {
                    left: self.center,
                    center: self.right,
                    right,
                };
                state.guess_direction = Direction::Next;
                right.is_some()
            }
            _ => false,
        }
    }

    /// Folds a freshly evaluated trial into the bracket and reports where it landed.
    pub fn absorb(&mut self, id: TrialId, repo: &TrialRepository, state: &mut SearchState) -> Move {
        let trial = &repo[id];
        if trial.is_complex() {
            *self = Bracket {
                left: Some(id),
                center: self.left,
                right: self.center,
            };
            return Move::None;
        }

        let x = trial.s.re;
        let position = |slot: Option<TrialId>, missing: f64| slot.map_or(missing, |t| repo[t].s.re);

        let Some(center) = self.center else {
            self.center = Some(id);
            return Move::None;
        };
        if self.right.is_none() && x > repo[center].s.re {
            self.right = Some(id);
            return Move::None;
        }
        if self.left.is_none() {
            self.left = Some(id);
            return Move::None;
        }

        let l = position(self.left, f64::NEG_INFINITY);
        let c = repo[center].s.re;
        let r = position(self.right, f64::INFINITY);
        let sign = trial.deflated.re().signum();
        let center_sign = repo[center].deflated.re().signum();
        let becomes_center = |trap: Trap| match trap {
            Trap::Left | Trap::Right => sign == center_sign,
            Trap::Free => true,
            Trap::Minimum => trial.deflated.cmp_magnitude(&repo[center].deflated).is_lt(),
        };

        let mv = if x < l {
            *self = Bracket {
                left: Some(id),
                center: self.left,
                right: self.center,
            };
            Move::FarLeft
        } else if x < c {
            if becomes_center(state.trap) {
                *self = Bracket {
                    left: self.left,
                    center: Some(id),
                    right: self.center,
                };
                Move::MidLeft
            } else {
                self.left = Some(id);
                Move::NearLeft
            }
        } else if x < r {
            if becomes_center(state.trap) {
                *self = Bracket {
                    left: self.center,
                    center: Some(id),
                    right: self.right,
                };
                Move::MidRight
            } else {
                self.right = Some(id);
                Move::NearRight
            }
        } else {
            *self = Bracket {
                left: self.center,
                center: self.right,
                right: Some(id),
            };
            Move::FarRight
        };
        state.record_move(mv);
        mv
    }

    /// Rebuilds the bracket around the anchor sample and clears the trap.
    pub fn reset(&mut self, repo: &TrialRepository, state: &mut SearchState) {
        state.trap = Trap::Free;
        state.consecutive_moves = 0;
        let center = seek_real(repo, state.anchor, Direction::Here);
        *self = match center {
            Some(_) => Bracket {
                left: seek_real(repo, center, Direction::Previous),
                center,
                right: seek_real(repo, center, Direction::Next),
            },
            None => Bracket::default(),
        };
    }
}

/// [`TrialRepository::seek`] restricted to real-axis samples.
fn seek_real(
    repo: &TrialRepository,
    from: Option<TrialId>,
    direction: Direction,
) -> Option<TrialId> {
    let mut found = repo.seek(from, direction);
    let step = match direction {
        Direction::Previous => Direction::Previous,
        Direction::Here | Direction::Next => Direction::Next,
    };
    while let Some(id) = found {
        if !repo[id].is_complex() {
            return Some(id);
        }
        found = repo.seek(Some(id), step);
    }
    None
}

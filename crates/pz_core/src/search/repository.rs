//! Ordered store of evaluated trials.
//!
//! Trials live in an arena and are threaded into a doubly linked list sorted by
//! ascending real part (ties broken by imaginary part). Ids stay valid until
//! the trial is removed.

use crate::scaled::ScaledComplex;
use num_complex::Complex64;
use num_traits::Zero;
use std::ops::{Index, IndexMut};

/// Handle to a trial inside a [`TrialRepository`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrialId(usize);

/// Classification bits attached to a trial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrialFlags(u8);

impl TrialFlags {
    pub const ROOT: TrialFlags = TrialFlags(0x01);
    pub const REPEAT: TrialFlags = TrialFlags(0x02);
    pub const ABERRATION: TrialFlags = TrialFlags(0x04);
    pub const MINIMUM: TrialFlags = TrialFlags(0x08);

    pub fn contains(self, other: TrialFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: TrialFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: TrialFlags) {
        self.0 &= !other.0;
    }
}

/// One evaluated sample of the transfer function.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    pub s: Complex64,
    pub raw: ScaledComplex,
    /// `raw` divided by the factors of every root confirmed so far.
    pub deflated: ScaledComplex,
    pub multiplicity: usize,
    pub flags: TrialFlags,
    pub sequence: usize,
    /// How many times a candidate has been nudged off this trial.
    pub count: usize,
}

impl Trial {
    pub fn new(s: Complex64) -> Self {
        Self {
            s,
            raw: ScaledComplex::zero(),
            deflated: ScaledComplex::zero(),
            multiplicity: 0,
            flags: TrialFlags::default(),
            sequence: 0,
            count: 0,
        }
    }

    pub fn is_root(&self) -> bool {
        self.flags.contains(TrialFlags::ROOT)
    }

    pub fn is_minimum(&self) -> bool {
        self.flags.contains(TrialFlags::MINIMUM)
    }

    /// Set on a trial the search stalled on; it keeps its value for deflation only.
    pub fn is_aberration(&self) -> bool {
        self.flags.contains(TrialFlags::ABERRATION)
    }

    pub fn is_complex(&self) -> bool {
        self.s.im != 0.0
    }

    /// Root, minimum and stalled trials never take part in a bracket.
    pub fn is_sample(&self) -> bool {
        !self.is_root() && !self.is_minimum() && !self.is_aberration()
    }
}

/// Direction argument of [`TrialRepository::seek`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    Previous,
    #[default]
    Here,
    Next,
}

#[derive(Debug)]
struct Slot {
    trial: Trial,
    prev: Option<TrialId>,
    next: Option<TrialId>,
}

#[derive(Debug, Default)]
pub struct TrialRepository {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    head: Option<TrialId>,
    tail: Option<TrialId>,
    len: usize,
}

impl TrialRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn head(&self) -> Option<TrialId> {
        self.head
    }

    pub fn tail(&self) -> Option<TrialId> {
        self.tail
    }

    pub fn get(&self, id: TrialId) -> Option<&Trial> {
        self.slot(id).map(|slot| &slot.trial)
    }

    pub fn get_mut(&mut self, id: TrialId) -> Option<&mut Trial> {
        self.slots
            .get_mut(id.0)
            .and_then(|slot| slot.as_mut())
            .map(|slot| &mut slot.trial)
    }

    pub fn next(&self, id: TrialId) -> Option<TrialId> {
        self.slot(id).and_then(|slot| slot.next)
    }

    pub fn prev(&self, id: TrialId) -> Option<TrialId> {
        self.slot(id).and_then(|slot| slot.prev)
    }

    /// Inserts `trial` after the last trial that orders strictly before it.
    ///
    /// Returns the new id and its predecessor. Duplicates are not rejected here.
    pub fn insert_ordered(&mut self, trial: Trial) -> (TrialId, Option<TrialId>) {
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let existing = &self[id].s;
            let before = existing.re < trial.s.re
                || (existing.re == trial.s.re && existing.im < trial.s.im);
            if !before {
                break;
            }
            prev = Some(id);
            cursor = self.next(id);
        }

        let next = match prev {
            Some(p) => self.next(p),
            None => self.head,
        };
        let slot = Slot { trial, prev, next };
        let id = match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(slot);
                TrialId(index)
            }
            None => {
                self.slots.push(Some(slot));
                TrialId(self.slots.len() - 1)
            }
        };

        match prev {
            Some(p) => self.link_mut(p).next = Some(id),
            None => self.head = Some(id),
        }
        match next {
            Some(n) => self.link_mut(n).prev = Some(id),
            None => self.tail = Some(id),
        }
        self.len += 1;
        (id, prev)
    }

    /// Walks from `from` in `direction`, skipping root and minimum trials.
    ///
    /// `Direction::Here` returns `from` itself when it is an ordinary sample and
    /// otherwise behaves like `Direction::Next`. A `None` start means "before the
    /// head" for `Here`/`Next` and "after the tail" for `Previous`.
    pub fn seek(&self, from: Option<TrialId>, direction: Direction) -> Option<TrialId> {
        let mut cursor = match from {
            Some(id) => {
                if direction == Direction::Here && self[id].is_sample() {
                    return Some(id);
                }
                self.step(id, direction)
            }
            None => match direction {
                Direction::Previous => self.tail,
                Direction::Here | Direction::Next => self.head,
            },
        };
        while let Some(id) = cursor {
            if self[id].is_sample() {
                return Some(id);
            }
            cursor = self.step(id, direction);
        }
        None
    }

    /// Unlinks and returns the trial.
    pub fn remove(&mut self, id: TrialId) -> Option<Trial> {
        let slot = self.slots.get_mut(id.0)?.take()?;
        match slot.prev {
            Some(p) => self.link_mut(p).next = slot.next,
            None => self.head = slot.next,
        }
        match slot.next {
            Some(n) => self.link_mut(n).prev = slot.prev,
            None => self.tail = slot.prev,
        }
        self.free.push(id.0);
        self.len -= 1;
        Some(slot.trial)
    }

    /// Removes every trial, or every non-root trial when `keep_roots` is set.
    pub fn clear(&mut self, keep_roots: bool) {
        if !keep_roots {
            *self = Self::default();
            return;
        }
        for id in self.ids() {
            if !self[id].is_root() {
                self.remove(id);
            }
        }
    }

    /// Ids in ascending order. Collected so callers may mutate while walking.
    pub fn ids(&self) -> Vec<TrialId> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TrialId, &Trial)> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let id = cursor?;
            let slot = self.slot(id)?;
            cursor = slot.next;
            Some((id, &slot.trial))
        })
    }

    fn step(&self, id: TrialId, direction: Direction) -> Option<TrialId> {
        match direction {
            Direction::Previous => self.prev(id),
            Direction::Here | Direction::Next => self.next(id),
        }
    }

    fn slot(&self, id: TrialId) -> Option<&Slot> {
        self.slots.get(id.0).and_then(|slot| slot.as_ref())
    }

    fn link_mut(&mut self, id: TrialId) -> &mut Slot {
        match self.slots.get_mut(id.0).and_then(|slot| slot.as_mut()) {
            Some(slot) => slot,
            None => panic!("trial list links to a removed slot {}", id.0),
        }
    }
}

impl Index<TrialId> for TrialRepository {
    type Output = Trial;

    fn index(&self, id: TrialId) -> &Trial {
        match self.get(id) {
            Some(trial) => trial,
            None => panic!("stale trial id {}", id.0),
        }
    }
}

impl IndexMut<TrialId> for TrialRepository {
    fn index_mut(&mut self, id: TrialId) -> &mut Trial {
        match self.get_mut(id) {
            Some(trial) => trial,
            None => panic!("stale trial id {}", id.0),
        }
    }
}

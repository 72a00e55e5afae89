//! Back/forward navigation history with optimistic pops.
//!
//! [History::back] and [History::forward] do not touch the stacks. They hand out a
//! [Transition] that names the state to move to. The caller tries to load that state and only
//! calls [Transition::commit] once it succeeded, so a failed navigation leaves history exactly as
//! it was. Dropping the transition without committing discards it.
//!
//! The transition borrows the history mutably, so nothing else can change the stacks while a
//! navigation is pending.

use crate::core::error::{Error, Result};

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Back,
    Forward,
}

/// Two bounded stacks of states. A `max_size` of zero means unbounded.
#[derive(Debug, Clone)]
pub struct History<T> {
    back: VecDeque<T>,
    forward: VecDeque<T>,
    max_size: usize,
}

impl<T: Clone> History<T> {
    pub fn new(max_size: usize) -> Self {
        Self {
            back: VecDeque::new(),
            forward: VecDeque::new(),
            max_size,
        }
    }

    /// Records `leaving` as the state we navigate away from and invalidates the forward stack.
    pub fn go(&mut self, leaving: T) {
        push_bounded(&mut self.back, leaving, self.max_size);
        self.forward.clear();
    }

    /// Peeks the previous state.
    ///
    /// # Errors
    /// [Error::StackEmpty] when there is nothing to go back to.
    pub fn back(&mut self, leaving: T) -> Result<Transition<'_, T>> {
        self.transition(Direction::Back, leaving)
    }

    /// Peeks the next state.
    ///
    /// # Errors
    /// [Error::StackEmpty] when there is nothing to go forward to.
    pub fn forward(&mut self, leaving: T) -> Result<Transition<'_, T>> {
        self.transition(Direction::Forward, leaving)
    }

    #[inline]
    pub fn back_empty(&self) -> bool {
        self.back.is_empty()
    }

    #[inline]
    pub fn forward_empty(&self) -> bool {
        self.forward.is_empty()
    }

    #[inline]
    pub fn back_len(&self) -> usize {
        self.back.len()
    }

    #[inline]
    pub fn forward_len(&self) -> usize {
        self.forward.len()
    }

    fn transition(&mut self, direction: Direction, leaving: T) -> Result<Transition<'_, T>> {
        let source = match direction {
            Direction::Back => &self.back,
            Direction::Forward => &self.forward,
        };
        let target = source.back().cloned().ok_or(Error::StackEmpty)?;
        Ok(Transition {
            history: self,
            direction,
            target,
            leaving: Some(leaving),
        })
    }
}

/// A pending back/forward move.
#[must_use = "a transition does nothing unless committed"]
#[derive(Debug)]
pub struct Transition<'a, T> {
    history: &'a mut History<T>,
    direction: Direction,
    target: T,
    leaving: Option<T>,
}

impl<T: Clone> Transition<'_, T> {
    /// The state to move to.
    #[inline]
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Applies the move: pops the target off its stack and pushes the leaving state onto the
    /// opposite one. Returns `false` if it was already committed.
    pub fn commit(&mut self) -> bool {
        let Some(leaving) = self.leaving.take() else {
            return false;
        };
        let max = self.history.max_size;
        let (source, dest) = match self.direction {
            Direction::Back => (&mut self.history.back, &mut self.history.forward),
            Direction::Forward => (&mut self.history.forward, &mut self.history.back),
        };
        source.pop_back();
        push_bounded(dest, leaving, max);
        true
    }

    /// Drops the move, leaving history untouched.
    pub fn discard(self) {}
}

fn push_bounded<T>(stack: &mut VecDeque<T>, item: T, max_size: usize) {
    stack.push_back(item);
    if max_size > 0 {
        while stack.len() > max_size {
            stack.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pushed(max: usize, states: &[&'static str]) -> History<&'static str> {
        let mut h = History::new(max);
        for s in states {
            h.go(*s);
        }
        h
    }

    #[test]
    fn back_without_commit_is_repeatable() -> Result<()> {
        let mut h = pushed(10, &["/1", "/1/2", "/1/2/3"]);

        let t = h.back("/1/2/3/4")?;
        assert_eq!(*t.target(), "/1/2/3");
        drop(t);

        let t = h.back("/1/2/3/4")?;
        assert_eq!(*t.target(), "/1/2/3");
        t.discard();

        assert_eq!(h.back_len(), 3);
        assert!(h.forward_empty());
        Ok(())
    }

    #[test]
    fn commit_moves_between_stacks_once() -> Result<()> {
        let mut h = pushed(10, &["/1", "/1/2", "/1/2/3"]);

        let mut t = h.back("/1/2/3/4")?;
        assert!(t.commit());
        assert!(!t.commit());
        drop(t);

        assert_eq!(h.back_len(), 2);
        assert_eq!(h.forward_len(), 1);

        let t = h.back("/1/2/3")?;
        assert_eq!(*t.target(), "/1/2");
        drop(t);

        let mut t = h.forward("/1/2/3")?;
        assert_eq!(*t.target(), "/1/2/3/4");
        t.commit();
        drop(t);

        assert_eq!(h.back_len(), 3);
        assert!(h.forward_empty());
        Ok(())
    }

    #[test]
    fn empty_stacks_report_stack_empty() {
        let mut h: History<String> = History::new(5);
        assert!(h.back_empty());
        assert!(h.forward_empty());
        assert!(matches!(h.back("/".into()), Err(Error::StackEmpty)));
        assert!(matches!(h.forward("/".into()), Err(Error::StackEmpty)));
    }

    #[test]
    fn go_clears_forward() -> Result<()> {
        let mut h = pushed(10, &["/a", "/b"]);
        h.back("/c")?.commit();
        assert!(!h.forward_empty());

        h.go("/b");
        assert!(h.forward_empty());
        assert_eq!(h.back_len(), 2);
        Ok(())
    }

    #[test]
    fn bounded_keeps_most_recent() -> Result<()> {
        let states: Vec<&'static str> = vec!["0", "1", "2", "3", "4", "5", "6"];
        let mut h = pushed(3, &states);
        assert_eq!(h.back_len(), 3);

        let mut popped = Vec::new();
        let mut leaving = "7";
        while let Ok(mut t) = h.back(leaving) {
            let target = *t.target();
            t.commit();
            popped.push(target);
            leaving = target;
        }
        assert_eq!(popped, vec!["6", "5", "4"]);
        assert_eq!(h.forward_len(), 3);
        Ok(())
    }

    #[test]
    fn zero_cap_is_unbounded() {
        let mut h = History::new(0);
        for i in 0..1000 {
            h.go(i);
        }
        assert_eq!(h.back_len(), 1000);
    }
}

// SPDX-License-Identifier: GPL-3.0-or-later
use std::collections::VecDeque;
use std::time::Duration;

/// A trait for types that can be averaged together in-place.
pub trait Average {
    fn add_assign(&mut self, rhs: &Self);
    fn sub_assign(&mut self, rhs: &Self);
    fn div(&self, count: u32) -> Self;
}

impl Average for f64 {
    fn add_assign(&mut self, rhs: &Self) {
        *self += rhs;
    }

    fn sub_assign(&mut self, rhs: &Self) {
        *self -= rhs;
    }

    fn div(&self, count: u32) -> Self {
        self / f64::from(count)
    }
}

impl Average for Duration {
    fn add_assign(&mut self, rhs: &Self) {
        *self += *rhs
    }

    fn sub_assign(&mut self, rhs: &Self) {
        *self -= *rhs
    }

    fn div(&self, count: u32) -> Self {
        *self / count
    }
}

pub trait MovingAverage<T> {
    /// Add a new sample and return the new moving average afterwards.
    fn update(&mut self, new_value: T) -> T {
        self.push(new_value);
        self.current_value()
            .expect("There to be a value as we just pushed one")
    }

    /// Add a new sample for the moving average.
    fn push(&mut self, new_value: T);

    /// Get the current moving average. If there have been no samples yet, it returns [None]
    fn current_value(&self) -> Option<T>;
}

/// A moving average where the last `N` samples are weighted identically.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxcarFilter<T, const N: usize> {
    samples: VecDeque<T>,
    // Running total of everything in `samples`
    sum: Option<T>,
}

impl<T, const N: usize> BoxcarFilter<T, N> {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(N),
            sum: None,
        }
    }
}

impl<T, const N: usize> Default for BoxcarFilter<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> MovingAverage<T> for BoxcarFilter<T, N>
where
    T: Average + Clone,
{
    fn push(&mut self, new_value: T) {
        // Pop first to keep the queue from getting too big
        if self.samples.len() >= N {
            if let (Some(old_value), Some(sum)) = (self.samples.pop_front(), self.sum.as_mut()) {
                sum.sub_assign(&old_value);
            }
        }
        match self.sum.as_mut() {
            Some(sum) => sum.add_assign(&new_value),
            None => self.sum = Some(new_value.clone()),
        }
        self.samples.push_back(new_value);
    }

    fn current_value(&self) -> Option<T> {
        let count = self.samples.len() as u32;
        self.sum.as_ref().map(|sum| sum.div(count))
    }
}

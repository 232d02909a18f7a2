// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cancellation and deadlines for blocking operations.
//!
//! A [`Context`] is a node in a cancellation tree. Cancelling a node cancels
//! all of its descendants but never its parent. A node may also carry a
//! deadline, after which it reports itself as cancelled.

mod signals;

pub use signals::global_context;

use crate::error::{LeaseError, Result};
use crate::sync::SignalOnce;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    signal: SignalOnce,
    deadline: Option<Instant>,
    children: Mutex<Vec<Weak<ContextInner>>>,
}

impl ContextInner {
    fn new(deadline: Option<Instant>) -> Arc<Self> {
        Arc::new(Self {
            signal: SignalOnce::new(),
            deadline,
            children: Mutex::new(Vec::new()),
        })
    }

    fn cancel(&self) {
        if !self.signal.signal() {
            return;
        }
        let children = std::mem::take(
            &mut *self
                .children
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }
}

impl Context {
    /// A root context that is never cancelled unless asked to.
    pub fn background() -> Self {
        Self {
            inner: ContextInner::new(None),
        }
    }

    /// A child that can be cancelled independently of this context.
    pub fn with_cancel(&self) -> Self {
        self.child(self.inner.deadline)
    }

    /// A child whose deadline is at most `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now().checked_add(timeout);
        let deadline = match (self.inner.deadline, candidate) {
            (Some(parent), Some(own)) => Some(parent.min(own)),
            (parent, None) => parent,
            (None, own) => own,
        };
        self.child(deadline)
    }

    /// A fresh root bounded only by `timeout`.
    ///
    /// Neither this context's cancellation nor its deadline reach the
    /// returned context, which is what cleanup work that must outlive its
    /// caller needs.
    pub fn detached(&self, timeout: Duration) -> Self {
        Self {
            inner: ContextInner::new(Instant::now().checked_add(timeout)),
        }
    }

    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.signal.is_signaled() || self.deadline_passed()
    }

    /// `Err(RequestCanceled)` once the context is cancelled or past its deadline.
    pub fn err(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(LeaseError::RequestCanceled)
        } else {
            Ok(())
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left before the deadline; `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Sleeps for `duration`, waking early with `RequestCanceled` when the
    /// context is cancelled or its deadline arrives first.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        self.err()?;
        let (wait, cut_short) = match self.remaining() {
            Some(remaining) if remaining < duration => (remaining, true),
            _ => (duration, false),
        };
        if self.inner.signal.wait_timeout(wait) || cut_short {
            return Err(LeaseError::RequestCanceled);
        }
        Ok(())
    }

    /// Blocks until the context is cancelled or its deadline passes.
    pub fn wait(&self) {
        match self.remaining() {
            Some(remaining) => {
                self.inner.signal.wait_timeout(remaining);
            }
            None => self.inner.signal.wait(),
        }
    }

    fn child(&self, deadline: Option<Instant>) -> Self {
        let inner = ContextInner::new(deadline);
        {
            let mut children = self
                .inner
                .children
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            children.retain(|child| child.strong_count() > 0);
            children.push(Arc::downgrade(&inner));
        }
        // A cancel racing with registration may have drained the list already.
        if self.inner.signal.is_signaled() {
            inner.cancel();
        }
        Self { inner }
    }

    fn deadline_passed(&self) -> bool {
        self.inner
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.is_cancelled())
            .field("remaining", &self.remaining())
            .finish()
    }
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors surfaced by the work loop.

/// Which part of a pass an adapter call failed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Handle creation while walking the work-in-progress tree.
    Render,
    /// Attach, insert, detach or update while committing.
    Commit,
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Render => "render",
            Self::Commit => "commit",
        })
    }
}

/// Error returned by [`Root::flush`](crate::Root::flush) and friends.
///
/// `E` is the adapter's [`HostAdapter::Error`](crate::HostAdapter::Error).
#[derive(Debug, thiserror::Error)]
pub enum Error<E>
where
    E: core::error::Error + 'static,
{
    /// The renderer adapter failed.
    #[error("host adapter failed during {phase}")]
    Host {
        /// Where the failure happened.
        phase: Phase,
        /// The adapter's error.
        #[source]
        source: E,
    },
}

impl<E> Error<E>
where
    E: core::error::Error + 'static,
{
    pub(crate) fn render(source: E) -> Self {
        Self::Host {
            phase: Phase::Render,
            source,
        }
    }

    pub(crate) fn commit(source: E) -> Self {
        Self::Host {
            phase: Phase::Commit,
            source,
        }
    }

    /// The phase the error happened in.
    pub fn phase(&self) -> Phase {
        match self {
            Self::Host { phase, .. } => *phase,
        }
    }
}

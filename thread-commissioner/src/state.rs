// Copyright 2025 Google LLC
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

//! Commissioning session states

use core::fmt;

/// Commissioning session state
///
/// ```text
/// Idle
///   ↓ init
/// Initializing
///   ↓ petition
/// Petitioning
///   ↓
/// Petitioned ──(fetch dataset)──────────────┐
///   ↓ setCommissionerDataset                │
/// AwaitingJoiner                            │
///   ↓                                       ↓
/// Joined | TimedOut | Failed | Cancelled  (outcome)
///   ↓ resign
/// Resigned
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CommissioningState {
    /// Session created, nothing called yet
    #[default]
    Idle,
    /// Commissioner `init` in progress
    Initializing,
    /// Petition in progress
    Petitioning,
    /// This commissioner is the active commissioner
    Petitioned,
    /// Waiting for a joiner to finalize
    AwaitingJoiner,
    /// Dataset fetched or joiner finalized
    Joined,
    /// Joiner wait exhausted
    TimedOut,
    /// A native call failed
    Failed,
    /// Cancelled by the caller
    Cancelled,
    /// `resign` called; the session is over
    Resigned,
}

impl CommissioningState {
    /// Whether the session produced its outcome
    pub fn is_outcome(self) -> bool {
        matches!(
            self,
            Self::Joined | Self::TimedOut | Self::Failed | Self::Cancelled
        )
    }

    /// Whether a session may move from `self` to `next`
    ///
    /// `Resigned` can follow any other state; a session that never got past
    /// `Idle` may still be resigned explicitly.
    pub fn can_transition_to(self, next: Self) -> bool {
        use CommissioningState::*;
        match (self, next) {
            (Idle, Initializing)
            | (Initializing, Petitioning)
            | (Petitioning, Petitioned)
            | (Petitioned, AwaitingJoiner | Joined)
            | (AwaitingJoiner, Joined | TimedOut) => true,
            (Initializing | Petitioning | Petitioned | AwaitingJoiner, Failed | Cancelled) => true,
            (Resigned, _) => false,
            (_, Resigned) => true,
            _ => false,
        }
    }

    pub(crate) const fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Initializing => "Initializing",
            Self::Petitioning => "Petitioning",
            Self::Petitioned => "Petitioned",
            Self::AwaitingJoiner => "AwaitingJoiner",
            Self::Joined => "Joined",
            Self::TimedOut => "TimedOut",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
            Self::Resigned => "Resigned",
        }
    }
}

impl fmt::Display for CommissioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::CommissioningState::*;
    use super::*;

    #[test]
    fn test_happy_paths_are_allowed() {
        let fetch = [Idle, Initializing, Petitioning, Petitioned, Joined, Resigned];
        let join = [
            Idle,
            Initializing,
            Petitioning,
            Petitioned,
            AwaitingJoiner,
            TimedOut,
            Resigned,
        ];
        for path in [&fetch[..], &join[..]] {
            for edge in path.windows(2) {
                assert!(edge[0].can_transition_to(edge[1]), "{} -> {}", edge[0], edge[1]);
            }
        }
    }

    #[test]
    fn test_skipping_or_leaving_resigned_is_rejected() {
        assert!(!Idle.can_transition_to(Petitioned));
        assert!(!Idle.can_transition_to(Failed));
        assert!(!Petitioned.can_transition_to(TimedOut));
        assert!(!Joined.can_transition_to(Failed));
        assert!(!Resigned.can_transition_to(Idle));
        assert!(!Resigned.can_transition_to(Resigned));
        assert!(Petitioning.can_transition_to(Cancelled));
        assert!(Idle.can_transition_to(Resigned));
    }
}

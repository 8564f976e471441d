//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Executor configuration.

use std::time::Duration;

/// What happens to a handler that outlives its deadline.
///
/// In both cases the caller is answered with "execution timed out" right
/// away and the handler's [`CancellationToken`](crate::cancel::CancellationToken)
/// is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutPolicy {
    /// Let the handler task run to completion and discard its result.
    #[default]
    Abandon,
    /// Abort the handler task at its next await point.
    Abort,
}

/// Configuration for an [`Executor`](crate::executor::Executor).
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Calls running longer than this are logged at warn level. `None`
    /// disables the warning.
    pub slow_call_threshold: Option<Duration>,
    /// Handling of handlers that exceed their deadline.
    pub timeout_policy: TimeoutPolicy,
    /// Deadline applied when the caller does not send a time-to-live.
    pub default_deadline: Option<Duration>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            slow_call_threshold: Some(Duration::from_secs(2)),
            timeout_policy: TimeoutPolicy::Abandon,
            default_deadline: None,
        }
    }
}

impl ExecutorConfig {
    /// Sets the slow call threshold.
    #[must_use]
    pub fn with_slow_call_threshold(mut self, threshold: Option<Duration>) -> Self {
        self.slow_call_threshold = threshold;
        self
    }

    /// Sets the timeout policy.
    #[must_use]
    pub fn with_timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.timeout_policy = policy;
        self
    }

    /// Sets the deadline for calls without a time-to-live.
    #[must_use]
    pub fn with_default_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.default_deadline = deadline;
        self
    }
}

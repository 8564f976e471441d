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

//! Token authentication for inbound calls.

use async_trait::async_trait;
use std::collections::HashSet;

/// Decides whether a caller's token is acceptable.
///
/// Injected into an [`Executor`](crate::executor::Executor); without one,
/// authentication is disabled. Plain closures `Fn(&str) -> bool` implement
/// this trait.
///
/// ```rust
/// use xrpc::executor::Authenticator;
///
/// # async fn example() {
/// let auth = |token: &str| token == "let-me-in";
/// assert!(auth.is_token_valid("let-me-in").await);
/// assert!(!auth.is_token_valid("guess").await);
/// # }
/// ```
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Returns `true` if `token` may call protected methods.
    async fn is_token_valid(&self, token: &str) -> bool;
}

#[async_trait]
impl<F> Authenticator for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    async fn is_token_valid(&self, token: &str) -> bool {
        self(token)
    }
}

/// Accepts a fixed set of tokens.
#[derive(Debug, Clone, Default)]
pub struct StaticTokens {
    tokens: HashSet<String>,
}

impl StaticTokens {
    /// Creates an authenticator accepting exactly `tokens`.
    pub fn new<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl Authenticator for StaticTokens {
    async fn is_token_valid(&self, token: &str) -> bool {
        !token.is_empty() && self.tokens.contains(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_tokens() {
        let auth = StaticTokens::new(["alpha", "beta"]);
        assert!(auth.is_token_valid("alpha").await);
        assert!(!auth.is_token_valid("gamma").await);
        assert!(!auth.is_token_valid("").await);
    }

    #[tokio::test]
    async fn test_closure_authenticator() {
        let auth = |token: &str| token.starts_with("ok-");
        assert!(auth.is_token_valid("ok-1").await);
        assert!(!auth.is_token_valid("no").await);
    }
}

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

//! Integration tests for the `#[service]` registration adapter.

#![cfg(feature = "macros")]

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use xrpc::executor::{Executor, StaticTokens};
use xrpc::registry::{Registry, RegistryError, Service};
use xrpc::{CallPayload, CallerInfo, Unused, XrpcError, service};

#[derive(Debug, Serialize, Deserialize)]
struct Deposit {
    amount: u64,
}

#[derive(Default)]
struct Bank {
    balance: AtomicU64,
}

#[service(name = "Accounts")]
impl Bank {
    /// Sync method with caller info by value.
    pub fn deposit(&self, info: CallerInfo, deposit: Deposit) -> Result<u64, String> {
        if info.caller_id.is_empty() {
            return Err("anonymous deposits are not accepted".to_string());
        }
        Ok(self.balance.fetch_add(deposit.amount, Ordering::SeqCst) + deposit.amount)
    }

    /// Async method without caller info, readable without a token.
    #[xrpc(name = "Balance", no_auth)]
    pub async fn current_balance(&self, _: Unused) -> Result<u64, String> {
        Ok(self.balance.load(Ordering::SeqCst))
    }

    /// `impl Future` method without result, borrowing caller info.
    pub fn reset(&self, info: &CallerInfo, _: Unused) -> impl Future<Output = Result<(), String>> + Send {
        let allowed = info.caller_id == "admin";
        if allowed {
            self.balance.store(0, Ordering::SeqCst);
        }
        async move {
            if allowed {
                Ok(())
            } else {
                Err("only admin may reset".to_string())
            }
        }
    }

    #[xrpc(skip)]
    pub fn audit(&self, _: Unused) -> Result<u64, String> {
        Ok(0)
    }

    pub fn describe(&self) -> String {
        "bank".to_string()
    }

    fn internal(&self, _: Unused) -> Result<(), String> {
        Ok(())
    }
}

async fn call<R: serde::de::DeserializeOwned>(
    executor: &Executor,
    caller: &str,
    token: &str,
    method: &str,
    args: &impl Serialize,
) -> Result<R, XrpcError> {
    let info = CallerInfo::new(caller).with_token(token);
    let call = CallPayload::new(info, method, args)?;
    executor.execute(call).await.into_result()
}

#[test]
fn test_registration_names_and_skips() {
    let bank = Bank::default();
    assert_eq!(bank.service_name(), "Accounts");
    assert_eq!(bank.describe(), "bank");
    assert!(bank.internal(Unused).is_ok());

    let skipped = bank.skipped_methods();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].name, "describe");

    let registry = Registry::new();
    assert_eq!(registry.register(bank).unwrap(), 3);
    let mut names = registry.names();
    names.sort();
    assert_eq!(
        names,
        ["Accounts.Balance", "Accounts.Deposit", "Accounts.Reset"]
    );

    let deposit = registry.lookup("Accounts.Deposit").unwrap();
    assert!(deposit.requires_caller_info());
    assert!(deposit.requires_authentication());
    assert!(deposit.result_type().is_some());

    let balance = registry.lookup("Accounts.Balance").unwrap();
    assert!(!balance.requires_caller_info());
    assert!(!balance.requires_authentication());

    let reset = registry.lookup("Accounts.Reset").unwrap();
    assert!(reset.result_type().is_none());
    assert!(registry.lookup("Accounts.Audit").is_none());
}

#[test]
fn test_duplicate_registration_is_rejected() {
    let registry = Registry::new();
    registry.register(Bank::default()).unwrap();
    let err = registry.register(Bank::default()).unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateMethod { .. }));
    assert_eq!(registry.len(), 3);
}

#[tokio::test]
async fn test_generated_methods_dispatch() {
    let bank = Arc::new(Bank::default());
    let registry = Registry::new();
    registry.register_arc(bank.clone()).unwrap();
    let executor = Executor::new(registry).with_authenticator(StaticTokens::new(["t"]));

    let total: u64 = call(&executor, "alice", "t", "Accounts.Deposit", &Deposit { amount: 5 })
        .await
        .unwrap();
    assert_eq!(total, 5);

    // No token needed for the balance.
    let balance: u64 = call(&executor, "bob", "", "Accounts.Balance", &Unused)
        .await
        .unwrap();
    assert_eq!(balance, 5);

    let err = call::<u64>(&executor, "bob", "", "Accounts.Deposit", &Deposit { amount: 1 })
        .await
        .unwrap_err();
    assert!(err.is_authentication_invalid());

    let err = call::<()>(&executor, "bob", "t", "Accounts.Reset", &Unused)
        .await
        .unwrap_err();
    assert!(matches!(err, XrpcError::Business(ref m) if m == "only admin may reset"));

    call::<()>(&executor, "admin", "t", "Accounts.Reset", &Unused)
        .await
        .unwrap();
    assert_eq!(bank.balance.load(Ordering::SeqCst), 0);

    let err = call::<u64>(&executor, "alice", "t", "Accounts.Deposit", &"not an object")
        .await
        .unwrap_err();
    assert!(err.is_transport_error());
}

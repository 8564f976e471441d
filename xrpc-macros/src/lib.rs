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

//! Procedural macros for xrpc.
//!
//! Provides `#[service]`, which registers the public methods of an inherent
//! impl block as remotely callable methods. It is re-exported as
//! `xrpc::service` when the `macros` feature is enabled.
//!
//! # Example
//!
//! ```ignore
//! use xrpc::{CallerInfo, service};
//!
//! struct Calc;
//!
//! #[service]
//! impl Calc {
//!     /// Registered as `Calc.Product`.
//!     pub fn product(&self, args: Pair) -> Result<i64, String> {
//!         Ok(args.a * args.b)
//!     }
//!
//!     /// Registered as `Calc.Whoami`, receives caller metadata.
//!     pub async fn whoami(&self, info: CallerInfo, _: xrpc::Unused) -> Result<String, String> {
//!         Ok(info.caller_id)
//!     }
//! }
//! ```

use proc_macro::TokenStream;
use syn::{ItemImpl, LitStr, parse_macro_input};

mod generate;
mod parse;

/// Implements `xrpc::registry::Service` for the type of an impl block.
///
/// # Arguments
///
/// - `name = "..."`: service name used as the method prefix. Defaults to the
///   type's name.
///
/// # Method shapes
///
/// A public method is registered when it takes `&self` and either
/// `(arg)` or `(CallerInfo, arg)` (or `&CallerInfo`), and returns
/// `Result<T, E>` directly, from an `async fn`, or through
/// `impl Future<Output = Result<T, E>>`. `arg` and `T` must be serde types,
/// `E` must implement `Display`. `T = ()` registers a method without result.
///
/// Other public methods are reported through `Service::skipped_methods`
/// and logged when the service is registered. Private methods are ignored.
///
/// # Method attributes
///
/// - `#[xrpc(name = "...")]`: wire name of the method instead of its
///   PascalCase Rust name
/// - `#[xrpc(no_auth)]`: skip token authentication for this method
/// - `#[xrpc(skip)]`: do not register the method
#[proc_macro_attribute]
pub fn service(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut name: Option<LitStr> = None;
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("name") {
            name = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported service argument; expected name = \"...\""))
        }
    });
    parse_macro_input!(attr with parser);
    let item = parse_macro_input!(item as ItemImpl);

    match parse::parse_service(name, item) {
        Ok(def) => generate::generate_service(&def).into(),
        Err(e) => e.to_compile_error().into(),
    }
}

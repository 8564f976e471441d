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

//! Code generation for the `#[service]` attribute.

use crate::parse::{CallerInfoArg, MethodDef, ServiceDef};
use proc_macro2::TokenStream;
use quote::quote;

/// Emits the cleaned impl block followed by its `Service` implementation.
pub fn generate_service(def: &ServiceDef) -> TokenStream {
    let item = &def.item;
    let self_ty = &def.item.self_ty;
    let service_name = &def.service_name;
    let descriptors = def.methods.iter().map(generate_descriptor);
    let skipped = def.skipped.iter().map(|skipped| {
        let name = &skipped.name;
        let reason = skipped.reason;
        quote! {
            ::xrpc::registry::SkippedMethod { name: #name, reason: #reason }
        }
    });

    quote! {
        #item

        impl ::xrpc::registry::Service for #self_ty {
            fn service_name(&self) -> &'static str {
                #service_name
            }

            fn methods(
                self: ::std::sync::Arc<Self>,
            ) -> ::std::vec::Vec<::xrpc::registry::MethodDescriptor> {
                ::std::vec![#(#descriptors),*]
            }

            fn skipped_methods(&self) -> &'static [::xrpc::registry::SkippedMethod] {
                &[#(#skipped),*]
            }
        }
    }
}

/// One `MethodDescriptor` expression holding its own `Arc<Self>`.
fn generate_descriptor(method: &MethodDef) -> TokenStream {
    let ident = &method.ident;
    let wire_name = &method.wire_name;
    let arg_ty = &method.arg_ty;
    let requires_auth = method.requires_auth;
    let uses_caller_info = method.caller_info != CallerInfoArg::None;

    let call_args = match method.caller_info {
        CallerInfoArg::None => quote! { arg },
        CallerInfoArg::Owned => quote! { caller_info, arg },
        CallerInfoArg::Borrowed => quote! { &caller_info, arg },
    };
    let invoke = if method.is_future {
        quote! { this.#ident(#call_args).await }
    } else {
        quote! { this.#ident(#call_args) }
    };
    let constructor = if method.unit_result {
        quote! { without_result }
    } else {
        quote! { new }
    };
    let caller_info_pat = if uses_caller_info {
        quote! { caller_info }
    } else {
        quote! { _caller_info }
    };

    quote! {
        {
            let this = ::std::sync::Arc::clone(&self);
            ::xrpc::registry::MethodDescriptor::#constructor(
                #wire_name,
                move |#caller_info_pat: ::xrpc::CallerInfo, arg: #arg_ty| {
                    let this = ::std::sync::Arc::clone(&this);
                    async move { #invoke }
                },
            )
            .with_caller_info(#uses_caller_info)
            .with_authentication(#requires_auth)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_service;
    use syn::parse_quote;

    fn expand(item: syn::ItemImpl) -> String {
        let def = parse_service(None, item).unwrap();
        generate_service(&def).to_string()
    }

    #[test]
    fn test_generates_service_impl() {
        let out = expand(parse_quote! {
            impl Calc {
                pub async fn product(&self, args: Pair) -> Result<i64, String> { todo!() }
            }
        });
        assert!(out.contains("impl :: xrpc :: registry :: Service for Calc"));
        assert!(out.contains("\"Calc\""));
        assert!(out.contains("\"Calc.Product\""));
        assert!(out.contains("MethodDescriptor :: new"));
        assert!(out.contains("this . product (arg) . await"));
        assert!(out.contains("with_caller_info (false)"));
        assert!(out.contains("with_authentication (true)"));
    }

    #[test]
    fn test_unit_result_uses_without_result() {
        let out = expand(parse_quote! {
            impl Log {
                pub fn write(&self, info: &CallerInfo, line: String) -> Result<(), String> { Ok(()) }
            }
        });
        assert!(out.contains("MethodDescriptor :: without_result"));
        assert!(out.contains("this . write (& caller_info , arg)"));
        assert!(!out.contains(". await"));
        assert!(out.contains("with_caller_info (true)"));
    }

    #[test]
    fn test_skipped_methods_listed() {
        let out = expand(parse_quote! {
            impl Calc {
                pub fn count(&self) -> usize { 0 }
            }
        });
        assert!(out.contains("SkippedMethod { name : \"count\""));
        assert!(out.contains("expected (argument) or (CallerInfo, argument) parameters"));
    }
}

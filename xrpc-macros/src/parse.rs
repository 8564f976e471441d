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

//! Parsing for the `#[service]` attribute.
//!
//! Walks an inherent `impl` block and sorts its public methods into
//! registrable ones, described by [`MethodDef`], and skipped ones with the
//! reason their shape did not qualify.

use syn::{
    Attribute, Error, FnArg, GenericArgument, ImplItem, ImplItemFn, ItemImpl, LitStr,
    PathArguments, Result, ReturnType, Type, TypeParamBound, Visibility,
};

/// Parsed `#[service]` impl block.
#[derive(Debug)]
pub struct ServiceDef {
    /// The impl block with all `#[xrpc(..)]` attributes removed.
    pub item: ItemImpl,
    /// Prefix of every qualified method name.
    pub service_name: String,
    /// Methods that will be registered.
    pub methods: Vec<MethodDef>,
    /// Public methods that will not, with the reason.
    pub skipped: Vec<SkippedDef>,
}

/// A registrable method.
#[derive(Debug)]
pub struct MethodDef {
    /// Rust method name
    pub ident: syn::Ident,
    /// Qualified wire name, `Service.Method`
    pub wire_name: String,
    /// How caller info is passed, if at all
    pub caller_info: CallerInfoArg,
    /// Argument type
    pub arg_ty: Type,
    /// `true` if the success type is `()`
    pub unit_result: bool,
    /// `true` for `async fn` and `impl Future` methods
    pub is_future: bool,
    /// Cleared by `#[xrpc(no_auth)]`
    pub requires_auth: bool,
}

/// How a method takes [`CallerInfo`](https://docs.rs/xrpc).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerInfoArg {
    /// Not taken
    None,
    /// Taken by value
    Owned,
    /// Taken by shared reference
    Borrowed,
}

/// A public method that will not be registered.
#[derive(Debug)]
pub struct SkippedDef {
    /// Rust method name
    pub name: String,
    /// Why
    pub reason: &'static str,
}

/// Options collected from `#[xrpc(..)]` on one method.
#[derive(Debug, Default)]
struct MethodOptions {
    name: Option<String>,
    no_auth: bool,
    skip: bool,
}

/// Parses `#[service(name = "...")]` arguments applied to `item`.
pub fn parse_service(name: Option<LitStr>, mut item: ItemImpl) -> Result<ServiceDef> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(Error::new_spanned(
            path,
            "#[service] must be applied to an inherent impl block, not a trait impl",
        ));
    }
    if !item.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &item.generics,
            "#[service] does not support generic impl blocks",
        ));
    }

    let service_name = match name {
        Some(name) => name.value(),
        None => type_name(&item.self_ty)?,
    };

    let mut methods = Vec::new();
    let mut skipped = Vec::new();
    for impl_item in &mut item.items {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };
        let options = take_options(&mut method.attrs)?;
        if options.skip || !matches!(method.vis, Visibility::Public(_)) {
            continue;
        }

        match parse_method(method, &service_name, options) {
            Ok(def) => methods.push(def),
            Err(reason) => skipped.push(SkippedDef {
                name: method.sig.ident.to_string(),
                reason,
            }),
        }
    }

    Ok(ServiceDef {
        item,
        service_name,
        methods,
        skipped,
    })
}

/// The last path segment of the impl's self type.
fn type_name(ty: &Type) -> Result<String> {
    match ty {
        Type::Path(path) if path.qself.is_none() => path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string())
            .ok_or_else(|| Error::new_spanned(ty, "cannot name this type")),
        _ => Err(Error::new_spanned(
            ty,
            "cannot derive a service name from this type; use #[service(name = \"...\")]",
        )),
    }
}

/// Removes `#[xrpc(..)]` attributes, returning their combined options.
fn take_options(attrs: &mut Vec<Attribute>) -> Result<MethodOptions> {
    let mut options = MethodOptions::default();
    let mut error: Option<Error> = None;

    attrs.retain(|attr| {
        if !attr.path().is_ident("xrpc") {
            return true;
        }
        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let name: LitStr = meta.value()?.parse()?;
                options.name = Some(name.value());
                Ok(())
            } else if meta.path.is_ident("no_auth") {
                options.no_auth = true;
                Ok(())
            } else if meta.path.is_ident("skip") {
                options.skip = true;
                Ok(())
            } else {
                Err(meta.error("unsupported xrpc option; expected name, no_auth or skip"))
            }
        });
        if let Err(e) = parsed {
            match &mut error {
                Some(existing) => existing.combine(e),
                None => error = Some(e),
            }
        }
        false
    });

    match error {
        Some(e) => Err(e),
        None => Ok(options),
    }
}

fn parse_method(
    method: &ImplItemFn,
    service_name: &str,
    options: MethodOptions,
) -> std::result::Result<MethodDef, &'static str> {
    let sig = &method.sig;
    if !sig.generics.params.is_empty() {
        return Err("generic methods cannot be registered");
    }

    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => return Err("receiver must be &self"),
    }

    let typed: Vec<&Type> = inputs
        .filter_map(|arg| match arg {
            FnArg::Typed(pat) => Some(&*pat.ty),
            FnArg::Receiver(_) => None,
        })
        .collect();
    let (caller_info, arg_ty) = match typed.as_slice() {
        [arg] => (CallerInfoArg::None, *arg),
        [first, arg] => match caller_info_kind(first) {
            Some(kind) => (kind, *arg),
            None => return Err("with two parameters the first must be CallerInfo"),
        },
        _ => return Err("expected (argument) or (CallerInfo, argument) parameters"),
    };
    if matches!(arg_ty, Type::Reference(_)) {
        return Err("argument must be an owned, deserializable type");
    }

    let (output, is_future) = if sig.asyncness.is_some() {
        (return_type(&sig.output), true)
    } else {
        match return_type(&sig.output).and_then(future_output) {
            Some(output) => (Some(output), true),
            None => (return_type(&sig.output), false),
        }
    };
    let success = output
        .and_then(result_success_type)
        .ok_or("must return Result<T, E>")?;

    let method_name = options
        .name
        .unwrap_or_else(|| pascal_case(&sig.ident.to_string()));

    Ok(MethodDef {
        ident: sig.ident.clone(),
        wire_name: format!("{service_name}.{method_name}"),
        caller_info,
        arg_ty: arg_ty.clone(),
        unit_result: is_unit(success),
        is_future,
        requires_auth: !options.no_auth,
    })
}

fn return_type(output: &ReturnType) -> Option<&Type> {
    match output {
        ReturnType::Type(_, ty) => Some(ty),
        ReturnType::Default => None,
    }
}

/// `T` of `impl Future<Output = T>`.
fn future_output(ty: &Type) -> Option<&Type> {
    let Type::ImplTrait(impl_trait) = ty else {
        return None;
    };
    impl_trait.bounds.iter().find_map(|bound| {
        let TypeParamBound::Trait(trait_bound) = bound else {
            return None;
        };
        let segment = trait_bound.path.segments.last()?;
        if segment.ident != "Future" {
            return None;
        }
        let PathArguments::AngleBracketed(args) = &segment.arguments else {
            return None;
        };
        args.args.iter().find_map(|arg| match arg {
            GenericArgument::AssocType(assoc) if assoc.ident == "Output" => Some(&assoc.ty),
            _ => None,
        })
    })
}

/// `T` of `Result<T, E>`.
fn result_success_type(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Result" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    let mut types = args.args.iter().filter_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    });
    match (types.next(), types.next(), types.next()) {
        (Some(success), Some(_), None) => Some(success),
        _ => None,
    }
}

fn caller_info_kind(ty: &Type) -> Option<CallerInfoArg> {
    match ty {
        Type::Reference(reference) if reference.mutability.is_none() => {
            is_caller_info(&reference.elem).then_some(CallerInfoArg::Borrowed)
        }
        other => is_caller_info(other).then_some(CallerInfoArg::Owned),
    }
}

fn is_caller_info(ty: &Type) -> bool {
    matches!(ty, Type::Path(path) if path.path.segments.last().is_some_and(|s| s.ident == "CallerInfo"))
}

fn is_unit(ty: &Type) -> bool {
    matches!(ty, Type::Tuple(tuple) if tuple.elems.is_empty())
}

/// Converts a snake_case identifier to PascalCase.
pub fn pascal_case(s: &str) -> String {
    s.trim_start_matches("r#")
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn parse(item: ItemImpl) -> ServiceDef {
        parse_service(None, item).unwrap()
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("product"), "Product");
        assert_eq!(pascal_case("pass_the_buck"), "PassTheBuck");
        assert_eq!(pascal_case("r#match"), "Match");
        assert_eq!(pascal_case(""), "");
    }

    #[test]
    fn test_suitable_shapes() {
        let def = parse(parse_quote! {
            impl Calc {
                pub fn product(&self, args: Pair) -> Result<i64, String> { todo!() }
                pub async fn sum(&self, info: CallerInfo, args: Vec<i64>) -> Result<i64, String> { todo!() }
                pub fn reset(&self, info: &CallerInfo, _: Unused) -> impl Future<Output = Result<(), Error>> + Send { async { Ok(()) } }
            }
        });
        assert_eq!(def.service_name, "Calc");
        assert!(def.skipped.is_empty());

        let names: Vec<_> = def.methods.iter().map(|m| m.wire_name.as_str()).collect();
        assert_eq!(names, ["Calc.Product", "Calc.Sum", "Calc.Reset"]);

        assert_eq!(def.methods[0].caller_info, CallerInfoArg::None);
        assert!(!def.methods[0].is_future);
        assert_eq!(def.methods[1].caller_info, CallerInfoArg::Owned);
        assert!(def.methods[1].is_future);
        assert_eq!(def.methods[2].caller_info, CallerInfoArg::Borrowed);
        assert!(def.methods[2].unit_result);
        assert!(def.methods[2].is_future);
    }

    #[test]
    fn test_unsuitable_shapes_are_skipped() {
        let def = parse(parse_quote! {
            impl Odd {
                pub fn no_result(&self, x: i32) -> i32 { x }
                pub fn too_many(&self, a: i32, b: i32) -> Result<i32, String> { Ok(a + b) }
                pub fn borrowed(&self, s: &str) -> Result<(), String> { Ok(()) }
                pub fn by_value(self, x: i32) -> Result<i32, String> { Ok(x) }
                pub fn mutable(&mut self, x: i32) -> Result<i32, String> { Ok(x) }
                pub fn generic<T>(&self, x: T) -> Result<(), String> { Ok(()) }
                fn private(&self, x: i32) -> Result<i32, String> { Ok(x) }
            }
        });
        assert!(def.methods.is_empty());
        let skipped: Vec<_> = def.skipped.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            skipped,
            ["no_result", "too_many", "borrowed", "by_value", "mutable", "generic"]
        );
    }

    #[test]
    fn test_method_options_are_applied_and_stripped() {
        let def = parse_service(
            Some(parse_quote!("Billing")),
            parse_quote! {
                impl Accounts {
                    #[xrpc(name = "Balance", no_auth)]
                    pub fn get_balance(&self, id: u64) -> Result<u64, String> { Ok(0) }
                    #[xrpc(skip)]
                    pub fn helper(&self, id: u64) -> Result<u64, String> { Ok(id) }
                }
            },
        )
        .unwrap();

        assert_eq!(def.methods.len(), 1);
        assert_eq!(def.methods[0].wire_name, "Billing.Balance");
        assert!(!def.methods[0].requires_auth);
        assert!(def.skipped.is_empty());

        for item in &def.item.items {
            let ImplItem::Fn(method) = item else { continue };
            assert!(method.attrs.iter().all(|a| !a.path().is_ident("xrpc")));
        }
    }

    #[test]
    fn test_trait_impl_rejected() {
        let err = parse_service(None, parse_quote! { impl Display for Calc {} }).unwrap_err();
        assert!(err.to_string().contains("inherent impl"));
    }

    #[test]
    fn test_unknown_option_rejected() {
        let err = parse_service(
            None,
            parse_quote! {
                impl Calc {
                    #[xrpc(fast)]
                    pub fn product(&self, x: i64) -> Result<i64, String> { Ok(x) }
                }
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("unsupported xrpc option"));
    }
}

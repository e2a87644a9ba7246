use crate::derive_utils::{DeriveToggles, apply_derives};
use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Item, parse_macro_input};

/// #[string_key] 宏实现
/// 仅支持 `struct X(String);` 形式的单字段 tuple struct，并为包装类型：
/// - 合并/追加派生：Clone, (Debug 可控), Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord
///   （`default = true` 时追加 Default，默认不追加）
/// - 以 `#[serde(transparent)]` 序列化为裸字符串
/// - 提供 new/as_str/into_inner、Display、FromStr、AsRef<str>、Borrow<str>、From 等便捷实现
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as DeriveToggles);
    let input = parse_macro_input!(item as Item);

    let st = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(other.span(), "#[string_key] only on struct")
                .to_compile_error()
                .into();
        }
    };

    let field = match &st.fields {
        syn::Fields::Unnamed(f) if f.unnamed.len() == 1 => &f.unnamed[0],
        syn::Fields::Unnamed(f) => {
            return syn::Error::new(
                f.span(),
                "#[string_key] requires a tuple struct with exactly one field",
            )
            .to_compile_error()
            .into();
        }
        _ => {
            return syn::Error::new(
                st.span(),
                "#[string_key] supports only tuple struct, e.g., struct X(String);",
            )
            .to_compile_error()
            .into();
        }
    };

    if !is_string_type(&field.ty) {
        return syn::Error::new(field.ty.span(), "#[string_key] inner field must be String")
            .to_compile_error()
            .into();
    }

    if !st.generics.params.is_empty() {
        return syn::Error::new(st.generics.span(), "#[string_key] does not support generics")
            .to_compile_error()
            .into();
    }

    let mut st_out = st.clone();
    let mut required: Vec<syn::Path> = vec![
        syn::parse_quote!(Clone),
        syn::parse_quote!(serde::Serialize),
        syn::parse_quote!(serde::Deserialize),
        syn::parse_quote!(PartialEq),
        syn::parse_quote!(Eq),
        syn::parse_quote!(Hash),
        syn::parse_quote!(PartialOrd),
        syn::parse_quote!(Ord),
    ];
    if cfg.default.unwrap_or(false) {
        required.insert(0, syn::parse_quote!(Default));
    }
    if cfg.debug.unwrap_or(true) {
        required.insert(0, syn::parse_quote!(Debug));
    }
    apply_derives(&mut st_out.attrs, required);
    st_out.attrs.push(syn::parse_quote!(#[serde(transparent)]));

    let ident = &st_out.ident;

    let out = quote! {
        #st_out

        impl #ident {
            pub fn new(value: impl ::core::convert::Into<::std::string::String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            pub fn into_inner(self) -> ::std::string::String {
                self.0
            }
        }

        impl ::std::fmt::Display for #ident {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::std::str::FromStr for #ident {
            type Err = ::core::convert::Infallible;
            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                ::std::result::Result::Ok(Self(s.to_owned()))
            }
        }

        impl ::core::convert::AsRef<str> for #ident {
            fn as_ref(&self) -> &str { &self.0 }
        }

        impl ::core::borrow::Borrow<str> for #ident {
            fn borrow(&self) -> &str { &self.0 }
        }

        impl ::core::convert::From<::std::string::String> for #ident {
            fn from(value: ::std::string::String) -> Self { Self(value) }
        }

        impl ::core::convert::From<&str> for #ident {
            fn from(value: &str) -> Self { Self(value.to_owned()) }
        }

        impl ::core::convert::From<#ident> for ::std::string::String {
            fn from(value: #ident) -> Self { value.0 }
        }

        impl ::core::cmp::PartialEq<str> for #ident {
            fn eq(&self, other: &str) -> bool { self.0 == other }
        }

        impl ::core::cmp::PartialEq<&str> for #ident {
            fn eq(&self, other: &&str) -> bool { self.0 == *other }
        }
    };

    TokenStream::from(out)
}

fn is_string_type(ty: &syn::Type) -> bool {
    match ty {
        syn::Type::Path(p) if p.qself.is_none() => p
            .path
            .segments
            .last()
            .map(|s| s.ident == "String" && s.arguments.is_empty())
            .unwrap_or(false),
        _ => false,
    }
}

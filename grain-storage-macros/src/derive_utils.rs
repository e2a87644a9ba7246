use quote::ToTokens;
use syn::ext::IdentExt;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Attribute, Result, Token, parse::Parse, parse::ParseStream};

// 提取非 derive 属性与已有 derive 列表
pub(crate) fn split_derives(attrs: &[Attribute]) -> (Vec<Attribute>, Vec<syn::Path>) {
    let mut retained = Vec::new();
    let mut existing = Vec::new();
    for attr in attrs.iter() {
        if attr.path().is_ident("derive") {
            if let Ok(list) =
                attr.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated)
            {
                existing.extend(list);
            }
        } else {
            retained.push(attr.clone());
        }
    }
    (retained, existing)
}

// 合并默认与已有 derive（去重，优先保留 required）
pub(crate) fn merge_derives(existing: Vec<syn::Path>, required: Vec<syn::Path>) -> Attribute {
    let mut seen = std::collections::HashSet::<String>::new();
    let mut final_list: Vec<syn::Path> = Vec::new();
    for p in required.into_iter().chain(existing) {
        if seen.insert(derive_key(&p)) {
            final_list.push(p);
        }
    }
    syn::parse_quote!(#[derive(#(#final_list),*)])
}

// 归一化 derive 的 key，避免 Serialize/serde::Serialize 重复
pub(crate) fn derive_key(p: &syn::Path) -> String {
    if let Some(last) = p.segments.last() {
        let last_ident = last.ident.to_string();
        match last_ident.as_str() {
            "Serialize" | "Deserialize" => format!("serde::{}", last_ident),
            _ => last_ident,
        }
    } else {
        p.to_token_stream().to_string()
    }
}

// 直接在 attrs 上应用默认派生合并
pub(crate) fn apply_derives(attrs: &mut Vec<Attribute>, required: Vec<syn::Path>) {
    let (retained, existing) = split_derives(attrs);
    let merged = merge_derives(existing, required);
    *attrs = std::iter::once(merged).chain(retained).collect();
}

/// 宏参数：`debug = bool`、`default = bool`
///
/// `#[value_object]` 与 `#[string_key]` 共用；未出现的键为 `None`，由调用方决定默认值。
#[derive(Default)]
pub(crate) struct DeriveToggles {
    pub(crate) debug: Option<bool>,
    pub(crate) default: Option<bool>,
}

impl Parse for DeriveToggles {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut out = Self::default();
        if input.is_empty() {
            return Ok(out);
        }

        let pairs: Punctuated<ToggleElem, Token![,]> = Punctuated::parse_terminated(input)?;
        for elem in pairs {
            let slot = match elem.key.as_str() {
                "debug" => &mut out.debug,
                "default" => &mut out.default,
                _ => unreachable!("key validated in ToggleElem::parse"),
            };
            if slot.is_some() {
                return Err(syn::Error::new(
                    elem.span,
                    format!("duplicate key '{}' in attribute", elem.key),
                ));
            }
            *slot = Some(elem.value);
        }
        Ok(out)
    }
}

struct ToggleElem {
    key: String,
    value: bool,
    span: proc_macro2::Span,
}

impl Parse for ToggleElem {
    fn parse(input: ParseStream) -> Result<Self> {
        // parse_any 兼容关键字形式的键名
        let key = syn::Ident::parse_any(input)?;
        let name = key.to_string();
        if name != "debug" && name != "default" {
            return Err(syn::Error::new(
                key.span(),
                "unknown key in attribute; expected 'debug' or 'default'",
            ));
        }

        let _eq: Token![=] = input.parse()?;
        let expr: syn::Expr = input.parse()?;
        match expr {
            syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Bool(b),
                ..
            }) => Ok(Self {
                key: name,
                value: b.value(),
                span: key.span(),
            }),
            other => Err(syn::Error::new(
                other.span(),
                format!("expected boolean literal for '{}'", name),
            )),
        }
    }
}

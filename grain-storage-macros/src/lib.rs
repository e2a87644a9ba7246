//! grain-storage 的过程宏
//!
//! - `#[value_object]`：为值对象（具名结构体/枚举）补齐统一的派生集合；
//! - `#[string_key]`：为 `struct X(String);` 形式的键类型生成派生与转换实现。
//!
use proc_macro::TokenStream;

mod derive_utils;
mod string_key;
mod value_object;

/// 值对象宏
/// - 追加派生：Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq, Hash
/// - 参数：`#[value_object(debug = false)]` 跳过 Debug，`#[value_object(default = false)]` 跳过 Default
#[proc_macro_attribute]
pub fn value_object(attr: TokenStream, item: TokenStream) -> TokenStream {
    value_object::expand(attr, item)
}

/// 字符串键宏
/// 用于 `EntityIdentity(String)`、`ETag(String)` 这类只包一层 `String` 的键类型。
/// - 参数：`#[string_key(debug = false)]` 跳过 Debug，`#[string_key(default = true)]` 追加 Default
#[proc_macro_attribute]
pub fn string_key(attr: TokenStream, item: TokenStream) -> TokenStream {
    string_key::expand(attr, item)
}

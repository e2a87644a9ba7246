use grain_storage_macros::string_key;

#[string_key]
struct GrainKey(String);

#[string_key(default = true)]
struct Slot(String);

#[string_key(debug = false)]
struct Secret(String);

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret(..)")
    }
}

fn main() {
    let key = GrainKey::new("2024-02-07_SomeCounter");
    assert_eq!(key.as_str(), "2024-02-07_SomeCounter");
    assert_eq!(key.to_string(), "2024-02-07_SomeCounter");
    assert!(key == "2024-02-07_SomeCounter");

    let parsed: GrainKey = "abc".parse().unwrap();
    let from_string: GrainKey = String::from("abc").into();
    assert_eq!(parsed, from_string);
    let inner: String = parsed.into_inner();
    assert_eq!(inner, "abc");

    let _slot = Slot::default();

    // 使用手写 Debug，可编译则说明未自动派生 Debug
    let _ = format!("{:?}", Secret::new("x"));
}

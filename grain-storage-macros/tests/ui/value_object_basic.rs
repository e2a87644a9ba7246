use grain_storage_macros::value_object;

#[value_object]
struct Address {
    partition: String,
    row: String,
}

#[value_object(debug = false)]
struct NonDebugVO(i32);

#[value_object(default = false)]
struct NoDefault {
    value: u64,
}

#[value_object]
enum Stage {
    #[default]
    Early,
    Late,
}

fn main() {
    // Debug 默认开启，应可格式化
    let _ = format!("{:?}", Address::default());

    // Default/Clone/PartialEq/Hash 可用（编译期检查足矣）
    let a = Address::default();
    let _b = a.clone();
    let _eq = a == Address { partition: String::new(), row: String::new() };
    let mut set = std::collections::HashSet::new();
    set.insert(a);

    let _ = NonDebugVO(1);
    let _ = NoDefault { value: 1 }.clone();

    let _st: Stage = Default::default();
}

use serde_json::{Map, Value};

/// 生成缓存键：`前缀:名称=值&...`，参数按名称字典序排列
///
/// 参数顺序不影响结果，相同参数集合总是得到相同的键。
pub fn create_cache_key(prefix: &str, params: &Map<String, Value>) -> String {
    cache_key_from_pairs(prefix, params.iter().map(|(name, value)| (name.as_str(), value)))
}

/// 由任意顺序的 `(名称, 值)` 对生成缓存键
pub fn cache_key_from_pairs<'a, I>(prefix: &str, pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let mut pairs: Vec<(&str, &Value)> = pairs.into_iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let query = pairs
        .into_iter()
        .map(|(name, value)| format!("{}={}", name, canonical_value(value)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}:{}", prefix, query)
}

/// 将 JSON 对象转为参数表；非对象值得到空表
pub fn object_params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// 参数值的规范文本
fn canonical_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        // serde_json 的 Map 基于 BTreeMap，嵌套对象序列化时键已有序
        other => other.to_string(),
    }
}

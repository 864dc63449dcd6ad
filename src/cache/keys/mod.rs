/// 缓存键模块
/// 按功能划分前缀，避免不同功能之间的键冲突
pub mod namespaces;
pub mod params;

pub use params::{cache_key_from_pairs, create_cache_key, object_params};

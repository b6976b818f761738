// 缓存模块
// 缓存键定义与商品缓存读写

pub mod accessor;
pub mod keys;

pub use accessor::ProductAccessor;

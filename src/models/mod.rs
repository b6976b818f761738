// 领域模型

pub mod product;

pub use product::{NewProduct, Product, ProductChanges, ProductFilter};

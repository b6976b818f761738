use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{NewProduct, ProductChanges};

const NAME_MAX: usize = 100;
const DESCRIPTION_MAX: usize = 500;
const CATEGORY_MAX: usize = 50;

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub stock: i32,
    pub category: String,
}

/// 部分更新，只有出现的字段会被修改
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i32>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteProductResponse {
    pub message: String,
}

// 长度按字符计算
fn check_len(errors: &mut Vec<String>, field: &str, value: &str, min: usize, max: usize) {
    let len = value.chars().count();
    if len < min || len > max {
        if min == 0 {
            errors.push(format!("{} must be at most {} characters", field, max));
        } else {
            errors.push(format!(
                "{} must be between {} and {} characters",
                field, min, max
            ));
        }
    }
}

fn check_price(errors: &mut Vec<String>, price: f64) {
    if !price.is_finite() || price < 0.0 {
        errors.push("price must be greater than or equal to 0".to_string());
    }
}

fn check_stock(errors: &mut Vec<String>, stock: i32) {
    if stock < 0 {
        errors.push("stock must be greater than or equal to 0".to_string());
    }
}

fn into_result<T>(errors: Vec<String>, value: T) -> Result<T, AppError> {
    if errors.is_empty() {
        Ok(value)
    } else {
        Err(AppError::Validation(errors.join("; ")))
    }
}

impl CreateProductRequest {
    pub fn validate(self) -> Result<NewProduct, AppError> {
        let mut errors = Vec::new();
        check_len(&mut errors, "name", &self.name, 1, NAME_MAX);
        check_len(&mut errors, "description", &self.description, 0, DESCRIPTION_MAX);
        check_price(&mut errors, self.price);
        check_stock(&mut errors, self.stock);
        check_len(&mut errors, "category", &self.category, 1, CATEGORY_MAX);

        into_result(
            errors,
            NewProduct {
                name: self.name,
                description: self.description,
                price: self.price,
                stock: self.stock,
                category: self.category,
            },
        )
    }
}

impl UpdateProductRequest {
    pub fn validate(self) -> Result<ProductChanges, AppError> {
        let mut errors = Vec::new();
        if let Some(name) = &self.name {
            check_len(&mut errors, "name", name, 1, NAME_MAX);
        }
        if let Some(description) = &self.description {
            check_len(&mut errors, "description", description, 0, DESCRIPTION_MAX);
        }
        if let Some(price) = self.price {
            check_price(&mut errors, price);
        }
        if let Some(stock) = self.stock {
            check_stock(&mut errors, stock);
        }
        if let Some(category) = &self.category {
            check_len(&mut errors, "category", category, 1, CATEGORY_MAX);
        }

        into_result(
            errors,
            ProductChanges {
                name: self.name,
                description: self.description,
                price: self.price,
                stock: self.stock,
                category: self.category,
            },
        )
    }
}

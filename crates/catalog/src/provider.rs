use std::sync::{Arc, RwLock};

use thiserror::Error;

use souq_core::Money;

use crate::variant::{VariantId, VariantRecord};

/// Lookup failures, one per distinct shopper-facing message.
///
/// Ambiguity is reported separately from absence so the caller can tell the
/// shopper to narrow the name rather than retype it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("product '{name}' does not exist")]
    ProductNotFound { name: String },

    #[error("product name '{name}' matches more than one product")]
    AmbiguousProduct { name: String },

    #[error("no variant of '{name}' with color '{color}' and size '{size}'")]
    VariantNotFound {
        name: String,
        color: String,
        size: String,
    },

    #[error("more than one variant of '{name}' matches color '{color}' and size '{size}'")]
    AmbiguousVariant {
        name: String,
        color: String,
        size: String,
    },
}

/// Catalog provider: resolves shopper-supplied descriptors to priced variants.
///
/// Matching is case-insensitive on all three fields. Exactly one product must
/// match the name and exactly one of its variants must match (color, size).
pub trait Catalog: Send + Sync {
    fn resolve(&self, name: &str, color: &str, size: &str) -> Result<VariantRecord, CatalogError>;
}

impl<C: Catalog + ?Sized> Catalog for Arc<C> {
    fn resolve(&self, name: &str, color: &str, size: &str) -> Result<VariantRecord, CatalogError> {
        (**self).resolve(name, color, size)
    }
}

/// One sellable variant under a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantEntry {
    pub variant_id: VariantId,
    pub color: String,
    pub size: String,
}

/// A product with its price and variants. Prices are per-product in this
/// catalog; variants share them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub name: String,
    pub sale_price: Money,
    pub purchase_price: Money,
    pub variants: Vec<VariantEntry>,
}

/// In-memory catalog for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<Vec<ProductRecord>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, product: ProductRecord) {
        if let Ok(mut products) = self.products.write() {
            products.push(product);
        }
    }
}

impl Catalog for InMemoryCatalog {
    fn resolve(&self, name: &str, color: &str, size: &str) -> Result<VariantRecord, CatalogError> {
        let products = match self.products.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let matches: Vec<&ProductRecord> = products
            .iter()
            .filter(|p| p.name.eq_ignore_ascii_case(name))
            .collect();

        let product = match matches.as_slice() {
            [] => {
                return Err(CatalogError::ProductNotFound {
                    name: name.to_string(),
                })
            }
            [one] => *one,
            _ => {
                return Err(CatalogError::AmbiguousProduct {
                    name: name.to_string(),
                })
            }
        };

        let variants: Vec<&VariantEntry> = product
            .variants
            .iter()
            .filter(|v| v.color.eq_ignore_ascii_case(color) && v.size.eq_ignore_ascii_case(size))
            .collect();

        let variant = match variants.as_slice() {
            [] => {
                return Err(CatalogError::VariantNotFound {
                    name: name.to_string(),
                    color: color.to_string(),
                    size: size.to_string(),
                })
            }
            [one] => *one,
            _ => {
                return Err(CatalogError::AmbiguousVariant {
                    name: name.to_string(),
                    color: color.to_string(),
                    size: size.to_string(),
                })
            }
        };

        Ok(VariantRecord {
            variant_id: variant.variant_id,
            product_name: product.name.clone(),
            color: variant.color.clone(),
            size: variant.size.clone(),
            sale_price: product.sale_price,
            purchase_price: product.purchase_price,
        })
    }
}

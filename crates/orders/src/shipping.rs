use serde::{Deserialize, Serialize};

use souq_core::{DomainError, Money};

/// Shipping details captured at order creation. Every field is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInfo {
    pub full_name: String,
    pub address: String,
    pub phone: String,
    pub governorate: String,
}

impl ShippingInfo {
    pub fn validate(&self) -> Result<(), DomainError> {
        for (field, value) in [
            ("fullName", &self.full_name),
            ("address", &self.address),
            ("phone", &self.phone),
            ("governorate", &self.governorate),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::validation(format!(
                    "shipping field '{field}' is required"
                )));
            }
        }
        Ok(())
    }
}

/// Delivery fee schedule by governorate (case-insensitive): Cairo 40,
/// Alexandria 50, everywhere else 70.
pub fn delivery_fee_for(governorate: &str) -> Money {
    let governorate = governorate.trim();
    if governorate.eq_ignore_ascii_case("Cairo") {
        Money::from_minor(40)
    } else if governorate.eq_ignore_ascii_case("Alexandria") {
        Money::from_minor(50)
    } else {
        Money::from_minor(70)
    }
}

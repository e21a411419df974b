//! # Validation Module
//!
//! Input validation for Cartwright operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request surface (external)                                   │
//! │  └── Parsing, types                                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (before any storage access)                      │
//! │  ├── quantity > 0                                                      │
//! │  ├── shipping fields present and bounded                               │
//! │  └── page ≥ 1                                                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (quantity > 0), CHECK (qty_available >= 0)                  │
//! │  └── UNIQUE (user_id), UNIQUE (cart_id, product_id)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::ShippingInfo;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_EMAIL_LEN: usize = 200;
const MAX_PHONE_LEN: usize = 32;
const MAX_ADDRESS_LEN: usize = 1000;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart quantity.
///
/// ## Rules
/// - Must be positive (> 0)
///
/// ```rust
/// use cartwright_core::validation::validate_quantity;
///
/// assert!(validate_quantity(1).is_ok());
/// assert!(validate_quantity(0).is_err());
/// assert!(validate_quantity(-3).is_err());
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a 1-based page number.
pub fn validate_page(page: u32) -> ValidationResult<()> {
    if page == 0 {
        return Err(ValidationError::OutOfRange {
            field: "page".to_string(),
            min: 1,
            max: i64::from(u32::MAX),
        });
    }

    Ok(())
}

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates that an identifier is present.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Shipping Validators
// =============================================================================

/// Validates shipping details and returns a trimmed copy.
///
/// ## Rules
/// - name, email, address required
/// - email has exactly one `@` with text on both sides
/// - phone optional; blank phone becomes `None`
/// - length limits: name/email 200, phone 32, address 1000
pub fn validate_shipping(info: &ShippingInfo) -> ValidationResult<ShippingInfo> {
    let name = required("shipping name", &info.name, MAX_NAME_LEN)?;
    let email = required("shipping email", &info.email, MAX_EMAIL_LEN)?;
    let address = required("shipping address", &info.address, MAX_ADDRESS_LEN)?;

    let mut parts = email.split('@');
    let well_formed = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty()
    );
    if !well_formed {
        return Err(ValidationError::InvalidFormat {
            field: "shipping email".to_string(),
            reason: "must look like name@domain".to_string(),
        });
    }

    let phone = match info.phone.as_deref().map(str::trim) {
        Some(p) if !p.is_empty() => {
            if p.chars().count() > MAX_PHONE_LEN {
                return Err(ValidationError::TooLong {
                    field: "shipping phone".to_string(),
                    max: MAX_PHONE_LEN,
                });
            }
            Some(p.to_string())
        }
        _ => None,
    };

    Ok(ShippingInfo {
        name,
        email,
        phone,
        address,
    })
}

fn required(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn shipping() -> ShippingInfo {
        ShippingInfo {
            name: " John Doe ".to_string(),
            email: "john@test.com".to_string(),
            phone: Some("  ".to_string()),
            address: "123 Main Street, Chennai".to_string(),
        }
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999_999).is_ok());
        assert_eq!(
            validate_quantity(0),
            Err(ValidationError::MustBePositive {
                field: "quantity".to_string()
            })
        );
        assert!(validate_quantity(-1).is_err());
    }

    #[test]
    fn test_validate_page() {
        assert!(validate_page(1).is_ok());
        assert!(validate_page(0).is_err());
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("user id", "u-1").is_ok());
        assert!(validate_id("user id", "   ").is_err());
    }

    #[test]
    fn test_validate_shipping_trims_and_drops_blank_phone() {
        let cleaned = validate_shipping(&shipping()).unwrap();
        assert_eq!(cleaned.name, "John Doe");
        assert_eq!(cleaned.phone, None);
    }

    #[test]
    fn test_validate_shipping_rejects_bad_input() {
        let mut info = shipping();
        info.name = String::new();
        assert!(matches!(
            validate_shipping(&info),
            Err(ValidationError::Required { .. })
        ));

        let mut info = shipping();
        info.email = "john.test.com".to_string();
        assert!(matches!(
            validate_shipping(&info),
            Err(ValidationError::InvalidFormat { .. })
        ));

        let mut info = shipping();
        info.email = "a@b@c".to_string();
        assert!(validate_shipping(&info).is_err());

        let mut info = shipping();
        info.phone = Some("9".repeat(40));
        assert!(matches!(
            validate_shipping(&info),
            Err(ValidationError::TooLong { .. })
        ));

        let mut info = shipping();
        info.address = "x".repeat(1001);
        assert!(validate_shipping(&info).is_err());
    }
}

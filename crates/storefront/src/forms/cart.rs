//! Cart quantity form.

use shopkeep_core::Quantity;

use super::{CleanedData, FieldKind, FieldSpec, FormSchema, MissingField, Validator};

#[must_use]
pub fn quantity_schema() -> FormSchema {
    FormSchema::new(vec![
        FieldSpec::new("quantity", "Quantity", FieldKind::Integer)
            .validate_with(Validator::Min(1))
            .validate_with(Validator::Max(i64::from(Quantity::MAX))),
    ])
}

/// # Errors
///
/// Returns `MissingField` if the data did not come from [`quantity_schema`].
pub fn quantity_from_cleaned(data: &CleanedData) -> Result<Quantity, MissingField> {
    let value = data.integer("quantity")?;
    u32::try_from(value)
        .ok()
        .and_then(|q| Quantity::new(q).ok())
        .ok_or(MissingField("quantity"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::forms::FormData;

    #[test]
    fn test_quantity_bounds() {
        let schema = quantity_schema();

        let ok = schema.validate(&FormData::default().with("quantity", "3")).unwrap();
        assert_eq!(quantity_from_cleaned(&ok).unwrap().get(), 3);

        for bad in ["0", "-1", "abc", "", "2147483648"] {
            assert!(
                schema.validate(&FormData::default().with("quantity", bad)).is_err(),
                "{bad} should be rejected"
            );
        }
    }
}

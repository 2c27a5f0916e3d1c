use crate::validator::{Inspect, Validator};

/// The value has to be a boolean.
pub fn boolean<V: Inspect + 'static>() -> Validator<V> {
    Validator::builtin("value has to be a boolean", |value: &V| {
        value.as_flag().is_some()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn accepts_only_booleans() {
        let v = boolean::<Value>();
        assert!(v.is_valid(&json!(true)));
        assert!(v.is_valid(&json!(false)));
        assert!(!v.is_valid(&json!(77)));
        assert!(!v.is_valid(&json!("true")));
    }
}

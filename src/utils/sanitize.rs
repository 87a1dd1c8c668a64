use serde_json::Value;

const VISIBLE_EDGE: usize = 4;

/// Masks account identifiers and credentials in JSON payloads for logging.
pub fn sanitize_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, val)| {
                    let sanitized = if is_sensitive_field(key) {
                        mask_value(val)
                    } else {
                        sanitize_json(val)
                    };
                    (key.clone(), sanitized)
                })
                .collect(),
        ),
        Value::Array(arr) => Value::Array(arr.iter().map(sanitize_json).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_field(key: &str) -> bool {
    matches!(
        key.to_lowercase().as_str(),
        "source_account"
            | "destination_account"
            | "account"
            | "password"
            | "secret"
            | "token"
            | "authorization"
    )
}

fn mask_value(value: &Value) -> Value {
    match value {
        Value::String(s) if s.chars().count() > VISIBLE_EDGE * 2 => {
            let chars: Vec<char> = s.chars().collect();
            let head: String = chars[..VISIBLE_EDGE].iter().collect();
            let tail: String = chars[chars.len() - VISIBLE_EDGE..].iter().collect();
            Value::String(format!("{}****{}", head, tail))
        }
        _ => Value::String("****".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_accounts() {
        let input = json!({
            "transaction_id": "txn_test_001",
            "source_account": "acc_user_001",
            "destination_account": "acc_merchant_001",
            "amount": 100.5
        });

        let sanitized = sanitize_json(&input);

        assert_eq!(sanitized["source_account"], "acc_****_001");
        assert_eq!(sanitized["destination_account"], "acc_****_001");
        assert_eq!(sanitized["transaction_id"], "txn_test_001");
        assert_eq!(sanitized["amount"], 100.5);
    }

    #[test]
    fn test_short_and_non_string_values_fully_masked() {
        let input = json!({ "account": "abc", "token": 42 });
        let sanitized = sanitize_json(&input);

        assert_eq!(sanitized["account"], "****");
        assert_eq!(sanitized["token"], "****");
    }

    #[test]
    fn test_multibyte_values_do_not_split_chars() {
        let input = json!({ "source_account": "ñññññ_ççççç" });
        let sanitized = sanitize_json(&input);

        assert_eq!(sanitized["source_account"], "ññññ****çççç");
    }

    #[test]
    fn test_sanitize_nested() {
        let input = json!({
            "batch": [{ "source_account": "acc_user_001", "currency": "USD" }]
        });

        let sanitized = sanitize_json(&input);
        assert!(sanitized["batch"][0]["source_account"]
            .as_str()
            .unwrap()
            .contains("****"));
        assert_eq!(sanitized["batch"][0]["currency"], "USD");
    }
}

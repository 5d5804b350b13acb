//! Acceptance rules for create payloads.
//!
//! Each schema walks the decoded JSON body, records every problem it finds
//! as an [`Issue`] and only returns the typed input when there are none.
//! Unknown keys are ignored. String lengths count characters, not bytes.

use crate::model::{NewCategory, NewProduct, NewSupplier};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

pub const CATEGORY_NAME_MIN_LEN: usize = 3;
pub const PRODUCT_NAME_MIN_LEN: usize = 5;
/// Scale of the `price` column (`NUMERIC(19, 4)`).
pub const PRICE_SCALE: u32 = 4;
/// Exclusive bound on a rounded price's magnitude; the column keeps 15 integer digits.
pub const PRICE_LIMIT: i64 = 1_000_000_000_000_000;

static CNPJ: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{14}$").expect("valid CNPJ pattern"));

/// Tunable rules. Only the supplier name length varies between deployments.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidationRules {
    #[serde(default = "default_supplier_name_min_len")]
    pub supplier_name_min_len: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            supplier_name_min_len: default_supplier_name_min_len(),
        }
    }
}

fn default_supplier_name_min_len() -> usize {
    3
}

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Dotted path into the body, e.g. `categorias.0.id`. Empty for the body itself.
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    issues: Vec<Issue>,
}

impl ValidationError {
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![Issue {
                path: path.into(),
                message: message.into(),
            }],
        }
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// True if any issue is reported at `path`.
    pub fn has_issue_at(&self, path: &str) -> bool {
        self.issues.iter().any(|i| i.path == path)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid input")?;
        for (n, issue) in self.issues.iter().enumerate() {
            let sep = if n == 0 { ": " } else { "; " };
            if issue.path.is_empty() {
                write!(f, "{sep}{}", issue.message)?;
            } else {
                write!(f, "{sep}{}: {}", issue.path, issue.message)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Decodes a request body. Malformed JSON is a validation failure.
pub fn parse_body(body: &[u8]) -> Result<Value, ValidationError> {
    serde_json::from_slice(body).map_err(|e| ValidationError::single("", format!("malformed JSON: {e}")))
}

/// `{ nome_categoria: string(min 3) }`
pub fn category(body: &Value) -> Result<NewCategory, ValidationError> {
    let mut fields = Fields::new(body)?;
    let name = fields.string("nome_categoria", CATEGORY_NAME_MIN_LEN);
    fields.finish()?;

    Ok(NewCategory {
        name: name.unwrap_or_default(),
    })
}

/// `{ nome_produto: string(min 5), preco: number, estoque: number,
///    categorias: [{ id: string, nome_categoria: string }] (min 1) }`
///
/// Category ids that are not UUIDs cannot match a stored row and are
/// dropped here, like any other unknown id.
pub fn product(body: &Value) -> Result<NewProduct, ValidationError> {
    let mut fields = Fields::new(body)?;
    let name = fields.string("nome_produto", PRODUCT_NAME_MIN_LEN);
    let price = fields.price("preco");
    let stock = fields.stock("estoque");
    let category_ids = fields.category_refs("categorias");
    fields.finish()?;

    Ok(NewProduct {
        name: name.unwrap_or_default(),
        price: price.unwrap_or_default(),
        stock: stock.unwrap_or_default(),
        category_ids: category_ids.unwrap_or_default(),
    })
}

/// `{ nome_empresa: string(min n), cnpj?: "" | 14 digits, produtos?: string[] }`
///
/// An empty `cnpj` normalizes to absent.
pub fn supplier(body: &Value, rules: &ValidationRules) -> Result<NewSupplier, ValidationError> {
    let mut fields = Fields::new(body)?;
    let company_name = fields.string("nome_empresa", rules.supplier_name_min_len);
    let tax_id = fields.tax_id("cnpj");
    let product_ids = fields.id_list("produtos");
    fields.finish()?;

    Ok(NewSupplier {
        company_name: company_name.unwrap_or_default(),
        tax_id,
        product_ids,
    })
}

fn parse_ids<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<Uuid> {
    let mut out: Vec<Uuid> = Vec::new();
    for id in ids {
        if let Ok(uuid) = Uuid::parse_str(id) {
            if !out.contains(&uuid) {
                out.push(uuid);
            }
        }
    }
    out
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Field reader that accumulates issues instead of stopping at the first.
struct Fields<'a> {
    object: &'a Map<String, Value>,
    issues: Vec<Issue>,
}

impl<'a> Fields<'a> {
    fn new(body: &'a Value) -> Result<Self, ValidationError> {
        match body {
            Value::Object(object) => Ok(Self {
                object,
                issues: Vec::new(),
            }),
            other => Err(ValidationError::single(
                "",
                format!("expected object, received {}", type_name(other)),
            )),
        }
    }

    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.issues.push(Issue {
            path: path.into(),
            message: message.into(),
        });
    }

    fn required(&mut self, key: &str) -> Option<&'a Value> {
        let value = self.object.get(key);
        if value.is_none() {
            self.push(key, "required");
        }
        value
    }

    fn string(&mut self, key: &str, min_len: usize) -> Option<String> {
        match self.required(key)? {
            Value::String(s) if s.chars().count() >= min_len => Some(s.clone()),
            Value::String(_) => {
                self.push(key, format!("must contain at least {min_len} character(s)"));
                None
            }
            other => {
                self.push(key, format!("expected string, received {}", type_name(other)));
                None
            }
        }
    }

    fn number(&mut self, key: &str) -> Option<f64> {
        match self.required(key)? {
            Value::Number(n) => match n.as_f64() {
                Some(v) if v.is_finite() => Some(v),
                _ => {
                    self.push(key, "must be a finite number");
                    None
                }
            },
            other => {
                self.push(key, format!("expected number, received {}", type_name(other)));
                None
            }
        }
    }

    fn price(&mut self, key: &str) -> Option<Decimal> {
        let value = self.number(key)?;
        let price = match Decimal::try_from(value) {
            Ok(price) => price.round_dp(PRICE_SCALE),
            Err(_) => {
                self.push(key, "out of range");
                return None;
            }
        };
        if price.abs() >= Decimal::from(PRICE_LIMIT) {
            self.push(key, format!("must be less than {PRICE_LIMIT} in absolute value"));
            return None;
        }
        Some(price)
    }

    fn stock(&mut self, key: &str) -> Option<i32> {
        let value = self.number(key)?;
        if value.fract() != 0.0 {
            self.push(key, "expected integer, received float");
            return None;
        }
        if value < 0.0 || value > f64::from(i32::MAX) {
            self.push(key, format!("must be between 0 and {}", i32::MAX));
            return None;
        }
        Some(value as i32)
    }

    fn category_refs(&mut self, key: &str) -> Option<Vec<Uuid>> {
        let items = match self.required(key)? {
            Value::Array(items) => items,
            other => {
                self.push(key, format!("expected array, received {}", type_name(other)));
                return None;
            }
        };
        if items.is_empty() {
            self.push(key, "must contain at least 1 element(s)");
            return None;
        }

        let mut ids = Vec::with_capacity(items.len());
        let before = self.issues.len();
        for (n, item) in items.iter().enumerate() {
            let Some(entry) = item.as_object() else {
                self.push(format!("{key}.{n}"), format!("expected object, received {}", type_name(item)));
                continue;
            };
            for field in ["id", "nome_categoria"] {
                match entry.get(field) {
                    Some(Value::String(_)) => {}
                    Some(other) => self.push(
                        format!("{key}.{n}.{field}"),
                        format!("expected string, received {}", type_name(other)),
                    ),
                    None => self.push(format!("{key}.{n}.{field}"), "required"),
                }
            }
            if let Some(Value::String(id)) = entry.get("id") {
                ids.push(id.as_str());
            }
        }

        if self.issues.len() > before {
            return None;
        }
        Some(parse_ids(ids.into_iter()))
    }

    fn tax_id(&mut self, key: &str) -> Option<String> {
        match self.object.get(key)? {
            Value::String(s) if s.is_empty() => None,
            Value::String(s) if CNPJ.is_match(s) => Some(s.clone()),
            Value::String(_) => {
                self.push(key, "must be exactly 14 digits");
                None
            }
            other => {
                self.push(key, format!("expected string, received {}", type_name(other)));
                None
            }
        }
    }

    fn id_list(&mut self, key: &str) -> Vec<Uuid> {
        let items = match self.object.get(key) {
            None => return Vec::new(),
            Some(Value::Array(items)) => items,
            Some(other) => {
                self.push(key, format!("expected array, received {}", type_name(other)));
                return Vec::new();
            }
        };

        let mut ids = Vec::with_capacity(items.len());
        for (n, item) in items.iter().enumerate() {
            match item {
                Value::String(id) => ids.push(id.as_str()),
                other => self.push(
                    format!("{key}.{n}"),
                    format!("expected string, received {}", type_name(other)),
                ),
            }
        }
        parse_ids(ids.into_iter())
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                issues: self.issues,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_accepts_three_characters() {
        let new = category(&json!({ "nome_categoria": "AMD" })).unwrap();
        assert_eq!(new.name, "AMD");
    }

    #[test]
    fn test_category_rejects_short_missing_and_mistyped_names() {
        assert!(category(&json!({ "nome_categoria": "AB" }))
            .unwrap_err()
            .has_issue_at("nome_categoria"));
        assert!(category(&json!({})).unwrap_err().has_issue_at("nome_categoria"));
        assert!(category(&json!({ "nome_categoria": 123 }))
            .unwrap_err()
            .has_issue_at("nome_categoria"));
        assert!(category(&json!(["nome_categoria"])).unwrap_err().has_issue_at(""));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // three characters, six bytes
        assert!(category(&json!({ "nome_categoria": "ééé" })).is_ok());
        assert!(category(&json!({ "nome_categoria": "éé" })).is_err());
    }

    #[test]
    fn test_parse_body_rejects_malformed_json() {
        let err = parse_body(b"{\"nome_categoria\":").unwrap_err();
        assert!(err.has_issue_at(""));
        assert!(parse_body(b"{}").is_ok());
    }

    fn product_body(categories: Value) -> Value {
        json!({
            "nome_produto": "Ryzen 5 5500",
            "preco": 600,
            "estoque": 10,
            "categorias": categories,
        })
    }

    #[test]
    fn test_product_with_empty_categories_is_rejected() {
        let err = product(&product_body(json!([]))).unwrap_err();
        assert!(err.has_issue_at("categorias"));
        assert_eq!(err.issues().len(), 1);
    }

    #[test]
    fn test_product_collects_every_issue() {
        let err = product(&json!({
            "nome_produto": "SSD",
            "preco": "600",
            "categorias": [{ "id": 1 }],
        }))
        .unwrap_err();
        assert!(err.has_issue_at("nome_produto"));
        assert!(err.has_issue_at("preco"));
        assert!(err.has_issue_at("estoque"));
        assert!(err.has_issue_at("categorias.0.id"));
        assert!(err.has_issue_at("categorias.0.nome_categoria"));
    }

    #[test]
    fn test_product_drops_non_uuid_and_duplicate_category_ids() {
        let id = Uuid::new_v4();
        let new = product(&product_body(json!([
            { "id": id.to_string(), "nome_categoria": "Processador" },
            { "id": "cm0abc", "nome_categoria": "Fantasma" },
            { "id": id.to_string(), "nome_categoria": "Processador" },
        ])))
        .unwrap();
        assert_eq!(new.category_ids, vec![id]);
        assert_eq!(new.price, Decimal::from(600));
        assert_eq!(new.stock, 10);
    }

    #[test]
    fn test_product_price_may_be_fractional_or_negative() {
        let id = Uuid::new_v4().to_string();
        let mut body = product_body(json!([{ "id": id, "nome_categoria": "AMD" }]));
        body["preco"] = json!(-19.99);
        let new = product(&body).unwrap();
        assert_eq!(new.price, Decimal::new(-1999, 2));
    }

    #[test]
    fn test_product_price_must_fit_the_column() {
        let id = Uuid::new_v4().to_string();
        let mut body = product_body(json!([{ "id": id, "nome_categoria": "AMD" }]));
        for bad in [1e16, -1e15, 1e28] {
            body["preco"] = json!(bad);
            assert!(product(&body).unwrap_err().has_issue_at("preco"), "should reject {bad}");
        }
        body["preco"] = json!(999_999_999_999_999.0);
        assert_eq!(product(&body).unwrap().price, Decimal::from(999_999_999_999_999i64));
        // rounded to the column scale
        body["preco"] = json!(0.00001);
        assert_eq!(product(&body).unwrap().price, Decimal::ZERO);
    }

    #[test]
    fn test_product_stock_must_be_a_non_negative_integer() {
        let id = Uuid::new_v4().to_string();
        let mut body = product_body(json!([{ "id": id, "nome_categoria": "AMD" }]));
        body["estoque"] = json!(1.5);
        assert!(product(&body).unwrap_err().has_issue_at("estoque"));
        body["estoque"] = json!(-1);
        assert!(product(&body).unwrap_err().has_issue_at("estoque"));
        body["estoque"] = json!(0);
        assert_eq!(product(&body).unwrap().stock, 0);
    }

    #[test]
    fn test_supplier_empty_cnpj_is_absent() {
        let rules = ValidationRules::default();
        let new = supplier(&json!({ "nome_empresa": "Kabum", "cnpj": "" }), &rules).unwrap();
        assert_eq!(new.tax_id, None);
        let new = supplier(&json!({ "nome_empresa": "Kabum" }), &rules).unwrap();
        assert_eq!(new.tax_id, None);
        assert!(new.product_ids.is_empty());
    }

    #[test]
    fn test_supplier_cnpj_must_be_fourteen_ascii_digits() {
        let rules = ValidationRules::default();
        let ok = supplier(&json!({ "nome_empresa": "Kabum", "cnpj": "69128630000142" }), &rules).unwrap();
        assert_eq!(ok.tax_id.as_deref(), Some("69128630000142"));

        for bad in ["1234567890123", "123456789012345", "69.128.630/0001", "١٢٣٤٥٦٧٨٩٠١٢٣٤"] {
            let err = supplier(&json!({ "nome_empresa": "Kabum", "cnpj": bad }), &rules).unwrap_err();
            assert!(err.has_issue_at("cnpj"), "should reject {bad}");
        }
    }

    #[test]
    fn test_supplier_name_min_len_is_configurable() {
        let strict = ValidationRules {
            supplier_name_min_len: 5,
        };
        assert!(supplier(&json!({ "nome_empresa": "Kabum" }), &strict).is_ok());
        assert!(supplier(&json!({ "nome_empresa": "Kab" }), &strict).is_err());
        assert!(supplier(&json!({ "nome_empresa": "Kab" }), &ValidationRules::default()).is_ok());
    }

    #[test]
    fn test_supplier_products_must_be_strings() {
        let rules = ValidationRules::default();
        let err = supplier(&json!({ "nome_empresa": "Pichau", "produtos": [1] }), &rules).unwrap_err();
        assert!(err.has_issue_at("produtos.0"));
        let err = supplier(&json!({ "nome_empresa": "Pichau", "produtos": "x" }), &rules).unwrap_err();
        assert!(err.has_issue_at("produtos"));
    }

    #[test]
    fn test_validation_error_display_lists_paths() {
        let err = category(&json!({ "nome_categoria": 1 })).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid input: nome_categoria: expected string, received number"
        );
    }
}

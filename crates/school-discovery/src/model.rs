/// School records as they arrive from the catalog sources.
///
/// The primary store, the CSV seed and older content exports all spell the same logical
/// field differently: a plain string, a list of strings, a list of `{name: ...}` objects,
/// or a single object with a `title`. `FieldValue` captures those shapes explicitly and
/// `FieldValue::normalize` is the one total function that flattens them to strings.
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Missing,
    Text(String),
    Number(Number),
    Flag(bool),
    List(Vec<FieldValue>),
    Labeled(LabeledValue),
}

/// An object-shaped field value. Only the label-bearing keys are interpreted; the
/// original object is kept for display.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LabeledValue {
    /// `name`
    pub name: Option<String>,
    /// `Name`
    pub capitalized_name: Option<String>,
    /// `title`
    pub title: Option<String>,
    /// `Type`
    pub type_label: Option<String>,
    /// `curriculum`
    pub curriculum: Option<String>,
    pub source: Map<String, Value>,
}

impl LabeledValue {
    pub fn from_map(source: Map<String, Value>) -> Self {
        Self {
            name: label_text(source.get("name")),
            capitalized_name: label_text(source.get("Name")),
            title: label_text(source.get("title")),
            type_label: label_text(source.get("Type")),
            curriculum: label_text(source.get("curriculum")),
            source,
        }
    }

    /// Label used when the object is one element of a list.
    pub fn element_label(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or(self.capitalized_name.as_deref())
            .or(self.title.as_deref())
            .or(self.type_label.as_deref())
    }

    /// Label used when the object is the whole field value.
    pub fn field_label(&self) -> Option<&str> {
        self.element_label().or(self.curriculum.as_deref())
    }

    fn json_text(&self) -> String {
        serde_json::to_string(&self.source).unwrap_or_default()
    }
}

fn label_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

impl FieldValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    /// Values a loosely-typed source would treat as "nothing here".
    pub fn is_falsy(&self) -> bool {
        match self {
            FieldValue::Missing => true,
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::Number(n) => n.as_f64() == Some(0.0),
            FieldValue::Flag(b) => !b,
            FieldValue::List(_) | FieldValue::Labeled(_) => false,
        }
    }

    /// `self`, unless it is falsy, in which case `fallback`.
    pub fn or_else<'a>(&'a self, fallback: &'a FieldValue) -> &'a FieldValue {
        if self.is_falsy() {
            fallback
        } else {
            self
        }
    }

    /// Flatten to the non-empty strings this value carries. Never fails: shapes with
    /// nothing usable produce an empty vector.
    pub fn normalize(&self) -> Vec<String> {
        match self {
            FieldValue::Missing => Vec::new(),
            FieldValue::Text(s) => non_blank(s).into_iter().collect(),
            FieldValue::Number(n) => vec![n.to_string()],
            FieldValue::Flag(b) => vec![b.to_string()],
            FieldValue::List(items) => {
                let mut out = Vec::new();
                for item in items {
                    collect_element(item, &mut out);
                }
                out
            }
            FieldValue::Labeled(labeled) => labeled
                .field_label()
                .map(|label| vec![label.to_string()])
                .unwrap_or_default(),
        }
    }

    /// First normalized string, or empty.
    pub fn first_text(&self) -> String {
        self.normalize().into_iter().next().unwrap_or_default()
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Missing => Value::Null,
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Number(n) => Value::Number(n.clone()),
            FieldValue::Flag(b) => Value::Bool(*b),
            FieldValue::List(items) => Value::Array(items.iter().map(FieldValue::to_json).collect()),
            FieldValue::Labeled(labeled) => Value::Object(labeled.source.clone()),
        }
    }
}

fn collect_element(item: &FieldValue, out: &mut Vec<String>) {
    if item.is_falsy() {
        return;
    }
    match item {
        FieldValue::Text(s) => out.extend(non_blank(s)),
        FieldValue::Number(n) => out.push(n.to_string()),
        FieldValue::Flag(b) => out.push(b.to_string()),
        // Nested lists are flattened.
        FieldValue::List(nested) => {
            for inner in nested {
                collect_element(inner, out);
            }
        }
        FieldValue::Labeled(labeled) => match labeled.element_label() {
            Some(label) => out.push(label.to_string()),
            None => out.extend(non_blank(&labeled.json_text())),
        },
        FieldValue::Missing => {}
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Missing,
            Value::Bool(b) => FieldValue::Flag(b),
            Value::Number(n) => FieldValue::Number(n),
            Value::String(s) => FieldValue::Text(s),
            Value::Array(items) => FieldValue::List(items.into_iter().map(FieldValue::from).collect()),
            Value::Object(map) => FieldValue::Labeled(LabeledValue::from_map(map)),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(FieldValue::from)
    }
}

/// One school from any catalog source.
///
/// Only the fields discovery filters and sorts on are typed; every other column is kept
/// in `extra`. Conversion from JSON never fails: a row that is not an object becomes a
/// record with every field missing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchoolRecord {
    pub id: FieldValue,
    pub name: FieldValue,
    pub curriculum: FieldValue,
    pub school_type: FieldValue,
    /// `feeRange` or `fee_range`
    pub fee_range: FieldValue,
    pub fee: FieldValue,
    pub city: FieldValue,
    pub state: FieldValue,
    pub location: FieldValue,
    pub extra: Map<String, Value>,
}

impl SchoolRecord {
    pub fn id_text(&self) -> String {
        self.id.first_text()
    }

    pub fn display_name(&self) -> String {
        self.name.first_text()
    }

    /// `feeRange`, falling back to `fee`.
    pub fn fee_value(&self) -> &FieldValue {
        self.fee_range.or_else(&self.fee)
    }

    /// `city`, falling back to `location`.
    pub fn city_value(&self) -> &FieldValue {
        self.city.or_else(&self.location)
    }

    /// `state`, falling back to `location`.
    pub fn state_value(&self) -> &FieldValue {
        self.state.or_else(&self.location)
    }

    fn typed_slot(&mut self, key: &str) -> Option<&mut FieldValue> {
        let slot = match key {
            "id" => &mut self.id,
            "name" => &mut self.name,
            "curriculum" => &mut self.curriculum,
            "type" => &mut self.school_type,
            "feeRange" | "fee_range" => &mut self.fee_range,
            "fee" => &mut self.fee,
            "city" => &mut self.city,
            "state" => &mut self.state,
            "location" => &mut self.location,
            _ => return None,
        };
        Some(slot)
    }

    pub fn to_json(&self) -> Value {
        let mut out = self.extra.clone();
        let typed = [
            ("id", &self.id),
            ("name", &self.name),
            ("curriculum", &self.curriculum),
            ("type", &self.school_type),
            ("feeRange", &self.fee_range),
            ("fee", &self.fee),
            ("city", &self.city),
            ("state", &self.state),
            ("location", &self.location),
        ];
        for (key, value) in typed {
            if !value.is_missing() {
                out.insert(key.to_string(), value.to_json());
            }
        }
        Value::Object(out)
    }
}

impl From<Value> for SchoolRecord {
    fn from(value: Value) -> Self {
        let Value::Object(map) = value else {
            return SchoolRecord::default();
        };
        let mut record = SchoolRecord::default();
        for (key, value) in map {
            if let Some(slot) = record.typed_slot(&key) {
                // A row carrying both `feeRange` and `fee_range` keeps the first one read.
                if slot.is_missing() {
                    *slot = FieldValue::from(value);
                }
                continue;
            }
            record.extra.insert(key, value);
        }
        record
    }
}

impl Serialize for SchoolRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SchoolRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(SchoolRecord::from)
    }
}

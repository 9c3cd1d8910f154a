//! Primary and satellite key resolution
//!
//! Primary keys are inferred from field-name conventions, tried in priority
//! order. Satellite tables are always keyed by their parent linkage.

/// Separator between a parent table name and a nested field name
pub const SATELLITE_SEPARATOR: &str = "__";

/// Column linking a satellite row to its parent row
pub const PARENT_ID: &str = "parent_id";

/// Column holding the 0-based position of an array element
pub const INDEX: &str = "idx";

/// Column holding a scalar array element
pub const VALUE: &str = "value";

/// Naming conventions used to find a primary key, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRule {
    /// `{table}Id`, e.g. `expenseId` for `expense`
    TableId,
    /// `{singular table}Id`, e.g. `userId` for `users`
    SingularTableId,
    /// `id`
    LowerId,
    /// `Id`
    UpperId,
    /// First field whose name ends in `Id`
    SuffixId,
}

impl KeyRule {
    /// All rules in the order they are tried
    pub const ORDER: [KeyRule; 5] = [
        KeyRule::TableId,
        KeyRule::SingularTableId,
        KeyRule::LowerId,
        KeyRule::UpperId,
        KeyRule::SuffixId,
    ];

    /// Find the field this rule selects, if any
    pub fn apply<'a>(self, table: &str, fields: &[&'a str]) -> Option<&'a str> {
        match self {
            KeyRule::TableId => find_any(fields, &id_candidates(table)),
            KeyRule::SingularTableId => find_any(fields, &id_candidates(&singularize(table))),
            KeyRule::LowerId => find_any(fields, &["id".to_string()]),
            KeyRule::UpperId => find_any(fields, &["Id".to_string()]),
            KeyRule::SuffixId => fields
                .iter()
                .copied()
                .find(|f| f.len() > 2 && f.ends_with("Id")),
        }
    }
}

/// The key of a table, or the explicit absence of one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableKey {
    /// A single natural key column
    Primary {
        /// Key column name
        field: String,
        /// Rule that found it; `None` when the caller named the field
        rule: Option<KeyRule>,
    },
    /// `(parent_id)` or `(parent_id, idx)`
    Satellite {
        /// Whether rows carry an array index
        with_index: bool,
    },
    /// No key could be inferred
    Missing,
}

impl TableKey {
    /// Key given explicitly by the caller
    pub fn explicit(field: impl Into<String>) -> Self {
        Self::Primary {
            field: field.into(),
            rule: None,
        }
    }

    /// Field whose value identifies a row to its children
    pub fn field(&self) -> Option<&str> {
        match self {
            TableKey::Primary { field, .. } => Some(field),
            TableKey::Satellite { .. } => Some(PARENT_ID),
            TableKey::Missing => None,
        }
    }

    /// Key columns, `None` when there is no key
    pub fn columns(&self) -> Option<Vec<String>> {
        match self {
            TableKey::Primary { field, .. } => Some(vec![field.clone()]),
            TableKey::Satellite { with_index: false } => Some(vec![PARENT_ID.to_string()]),
            TableKey::Satellite { with_index: true } => {
                Some(vec![PARENT_ID.to_string(), INDEX.to_string()])
            }
            TableKey::Missing => None,
        }
    }

    /// Check if no key was found
    pub fn is_missing(&self) -> bool {
        matches!(self, TableKey::Missing)
    }
}

/// Infer the primary key of `table` from its observed field names
pub fn infer_primary_key(table: &str, fields: &[&str]) -> TableKey {
    KeyRule::ORDER
        .iter()
        .find_map(|rule| {
            rule.apply(table, fields).map(|field| TableKey::Primary {
                field: field.to_string(),
                rule: Some(*rule),
            })
        })
        .unwrap_or(TableKey::Missing)
}

/// Key of a satellite table given its observed field names
pub fn satellite_key(fields: &[&str]) -> TableKey {
    TableKey::Satellite {
        with_index: fields.contains(&INDEX),
    }
}

/// Pick the key for any staged table by its name
pub fn resolve_key(table: &str, fields: &[&str]) -> TableKey {
    if is_satellite(table) {
        satellite_key(fields)
    } else {
        infer_primary_key(table, fields)
    }
}

/// Name of the satellite table holding `field` of `parent`
pub fn satellite_name(parent: &str, field: &str) -> String {
    format!("{parent}{SATELLITE_SEPARATOR}{field}")
}

/// Whether a table name denotes a generated satellite table
pub fn is_satellite(table: &str) -> bool {
    table.contains(SATELLITE_SEPARATOR)
}

/// Naive English singular of a table name
pub fn singularize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{stem}y");
        }
    }
    for suffix in ["sses", "xes", "ches", "shes"] {
        if name.ends_with(suffix) {
            return name[..name.len() - 2].to_string();
        }
    }
    if name.ends_with("ss") || name.len() <= 1 {
        return name.to_string();
    }
    name.strip_suffix('s').unwrap_or(name).to_string()
}

// `cost_center` may show up as `cost_centerId` or `costCenterId`.
fn id_candidates(table: &str) -> Vec<String> {
    let literal = format!("{table}Id");
    let camel = format!("{}Id", to_camel_case(table));
    if camel == literal {
        vec![literal]
    } else {
        vec![literal, camel]
    }
}

fn find_any<'a>(fields: &[&'a str], candidates: &[String]) -> Option<&'a str> {
    candidates
        .iter()
        .find_map(|c| fields.iter().copied().find(|f| *f == c.as_str()))
}

fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for ch in name.chars() {
        if ch == '_' || ch == '-' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

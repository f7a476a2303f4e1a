use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored resource record: a JSON object keyed by field name.
pub type Document = Map<String, Value>;

/// Primary key field present on every stored document.
pub const ID_FIELD: &str = "_id";

/// Creation timestamp field, used as the default sort key.
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Owner reference field on user-authored resources.
pub const USER_FIELD: &str = "user";

/// Returns the `_id` of a document, if it has a string one.
#[must_use]
pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

/// Authorization role carried by an authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular user: may write reviews.
    User,
    /// Publisher: may create bootcamps and courses.
    Publisher,
    /// Administrator: may do anything.
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Publisher => "publisher",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role string is not one of the known roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "publisher" => Ok(Role::Publisher),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Authenticated caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Identifier of the user account.
    pub id: String,
    /// Role used for authorization checks.
    pub role: Role,
}

impl Principal {
    #[must_use]
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether the principal has any of the given roles.
    #[must_use]
    pub fn has_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }

    /// Whether the document's `user` reference points at this principal.
    #[must_use]
    pub fn owns(&self, doc: &Document) -> bool {
        doc.get(USER_FIELD).and_then(Value::as_str) == Some(self.id.as_str())
    }

    /// Owners and admins may modify a document.
    #[must_use]
    pub fn can_modify(&self, doc: &Document) -> bool {
        self.is_admin() || self.owns(doc)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Publisher".parse::<Role>(), Ok(Role::Publisher));
        assert_eq!(" admin ".parse::<Role>(), Ok(Role::Admin));
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn ownership_and_admin_override() {
        let review = doc(json!({"_id": "r1", "user": "u1"}));
        let owner = Principal::new("u1", Role::User);
        let other = Principal::new("u2", Role::User);
        let admin = Principal::new("u3", Role::Admin);

        assert!(owner.can_modify(&review));
        assert!(!other.can_modify(&review));
        assert!(admin.can_modify(&review));
    }

    #[test]
    fn document_id_reads_string_ids_only() {
        assert_eq!(document_id(&doc(json!({"_id": "abc"}))), Some("abc"));
        assert_eq!(document_id(&doc(json!({"_id": 7}))), None);
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(CalendarId);
id_newtype!(TemplateId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Ownership {
    #[default]
    None,
    Owned,
    ViewingShared,
}

/// Where a visit starts from, as carried in the editor URL.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CalendarReference {
    Calendar(CalendarId),
    Template(TemplateId),
    #[default]
    None,
}

impl CalendarReference {
    /// Calendar ids win over template ids when both are present.
    pub fn from_parts(calendar_id: Option<String>, template_id: Option<String>) -> Self {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        if let Some(id) = non_empty(calendar_id) {
            return Self::Calendar(CalendarId(id));
        }
        if let Some(id) = non_empty(template_id) {
            return Self::Template(TemplateId(id));
        }
        Self::None
    }
}

//! Categorical encoding for the `Area` and `Item` inputs
//!
//! Codes are the positions of labels in the fitted encoder's class list,
//! the same integers the models saw during training.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Categorical input fields known to the models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryField {
    Area,
    Item,
}

impl CategoryField {
    pub const ALL: [CategoryField; 2] = [CategoryField::Area, CategoryField::Item];

    /// Column name used in the feature spec
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryField::Area => "Area",
            CategoryField::Item => "Item",
        }
    }
}

impl fmt::Display for CategoryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fitted label encoder: ordered labels and their integer codes
#[derive(Debug, Clone)]
pub struct CategoryEncoder {
    classes: Vec<String>,
    codes: HashMap<String, i64>,
}

impl CategoryEncoder {
    /// Build an encoder from its ordered class list.
    ///
    /// Fails on duplicate labels, since the label to code mapping would no
    /// longer be bijective.
    pub fn from_classes(classes: Vec<String>) -> std::result::Result<Self, String> {
        let mut codes = HashMap::with_capacity(classes.len());
        for (code, label) in classes.iter().enumerate() {
            if codes.insert(label.clone(), code as i64).is_some() {
                return Err(format!("duplicate class label '{}'", label));
            }
        }
        Ok(Self { classes, codes })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Code for a label, if the label is known
    pub fn code(&self, label: &str) -> Option<i64> {
        self.codes.get(label).copied()
    }

    /// Label for a code, if the code is in range
    pub fn label(&self, code: i64) -> Option<&str> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| self.classes.get(idx))
            .map(String::as_str)
    }
}

/// Encoders for every categorical field
#[derive(Debug, Clone)]
pub struct CategoryEncoderRegistry {
    area: Arc<CategoryEncoder>,
    item: Arc<CategoryEncoder>,
}

impl CategoryEncoderRegistry {
    pub fn new(area: Arc<CategoryEncoder>, item: Arc<CategoryEncoder>) -> Self {
        Self { area, item }
    }

    fn encoder(&self, field: CategoryField) -> &CategoryEncoder {
        match field {
            CategoryField::Area => &self.area,
            CategoryField::Item => &self.item,
        }
    }

    /// Valid labels for a field, in encoder order
    pub fn classes(&self, field: CategoryField) -> &[String] {
        self.encoder(field).classes()
    }

    /// Encode a label. Unknown labels are an error, never a default code.
    pub fn encode(&self, field: CategoryField, label: &str) -> Result<i64> {
        self.encoder(field)
            .code(label)
            .ok_or_else(|| PipelineError::UnknownCategory {
                field,
                label: label.to_string(),
            })
    }

    /// Inverse of [`encode`](Self::encode)
    pub fn decode(&self, field: CategoryField, code: i64) -> Option<&str> {
        self.encoder(field).label(code)
    }
}

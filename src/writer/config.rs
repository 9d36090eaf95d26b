use crate::core::{Payload, RecordId, Result, Value, WriteError};
use crate::statement::InsertStatement;

/// Base for position numbering within one child collection.
///
/// The backing stores this component was written against disagree on the
/// convention: "sort_order" columns count from 0, "step_number" columns from
/// 1. The base is therefore per-collection configuration, not a global guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionBase {
    #[default]
    Zero,
    One,
}

impl PositionBase {
    pub fn position(&self, index: usize) -> i64 {
        match self {
            PositionBase::Zero => index as i64,
            PositionBase::One => index as i64 + 1,
        }
    }
}

/// One caller-supplied scalar column of an entity.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub required: bool,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
        }
    }

    /// Mark the column as required: the payload must carry a non-null value.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Shape of one entity type: its table/collection name and caller columns.
#[derive(Debug, Clone)]
pub struct EntityTemplate {
    entity: String,
    columns: Vec<Column>,
}

impl EntityTemplate {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Check a payload against this template without touching the backend.
    pub(crate) fn validate(&self, payload: &Payload) -> Result<()> {
        for column in payload.columns() {
            if !self.columns.iter().any(|c| c.name == column) {
                return Err(WriteError::Validation(format!(
                    "unknown column '{}' for entity '{}'",
                    column, self.entity
                )));
            }
        }

        for column in self.columns.iter().filter(|c| c.required) {
            match payload.get(&column.name) {
                Some(value) if !value.is_null() => {}
                _ => {
                    return Err(WriteError::Validation(format!(
                        "required column '{}' of entity '{}' is missing or null",
                        column.name, self.entity
                    )));
                }
            }
        }

        Ok(())
    }

    /// Bind a payload to this template's column order; absent optional
    /// columns bind as NULL.
    pub(crate) fn bind(&self, payload: &Payload) -> Vec<Value> {
        self.columns
            .iter()
            .map(|c| payload.get(&c.name).cloned().unwrap_or(Value::Null))
            .collect()
    }

    pub(crate) fn insert_statement(&self) -> InsertStatement {
        InsertStatement::new(
            self.entity.clone(),
            self.columns.iter().map(|c| c.name.clone()).collect(),
        )
    }

    fn validate_shape(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(WriteError::Validation(format!(
                "entity '{}' declares no columns",
                self.entity
            )));
        }
        for (i, column) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|c| c.name == column.name) {
                return Err(WriteError::Validation(format!(
                    "entity '{}' declares column '{}' twice",
                    self.entity, column.name
                )));
            }
        }
        Ok(())
    }
}

/// Shape of one child collection: its entity template plus the parent-key
/// and position columns the coordinator injects on every row.
#[derive(Debug, Clone)]
pub struct CollectionTemplate {
    template: EntityTemplate,
    parent_key: String,
    position_column: String,
    base: PositionBase,
}

impl CollectionTemplate {
    pub fn new(
        entity: impl Into<String>,
        parent_key: impl Into<String>,
        position_column: impl Into<String>,
    ) -> Self {
        Self {
            template: EntityTemplate::new(entity),
            parent_key: parent_key.into(),
            position_column: position_column.into(),
            base: PositionBase::default(),
        }
    }

    pub fn column(mut self, column: Column) -> Self {
        self.template = self.template.column(column);
        self
    }

    /// Number positions from 1 ("step_number" style).
    pub fn one_based(mut self) -> Self {
        self.base = PositionBase::One;
        self
    }

    /// Number positions from 0 ("sort_order" style). This is the default.
    pub fn zero_based(mut self) -> Self {
        self.base = PositionBase::Zero;
        self
    }

    pub fn entity(&self) -> &str {
        self.template.entity()
    }

    pub fn parent_key(&self) -> &str {
        &self.parent_key
    }

    pub fn position_column(&self) -> &str {
        &self.position_column
    }

    pub fn base(&self) -> PositionBase {
        self.base
    }

    pub(crate) fn validate(&self, payload: &Payload) -> Result<()> {
        self.template.validate(payload)
    }

    /// Bind one child row: injected parent key and position first, then the
    /// caller columns in template order.
    pub(crate) fn bind(&self, payload: &Payload, parent: RecordId, position: i64) -> Vec<Value> {
        let mut params = Vec::with_capacity(self.template.columns().len() + 2);
        params.push(Value::Integer(parent.as_u64() as i64));
        params.push(Value::Integer(position));
        params.extend(self.template.bind(payload));
        params
    }

    pub(crate) fn insert_statement(&self) -> InsertStatement {
        let mut columns = Vec::with_capacity(self.template.columns().len() + 2);
        columns.push(self.parent_key.clone());
        columns.push(self.position_column.clone());
        columns.extend(self.template.columns().iter().map(|c| c.name.clone()));
        InsertStatement::new(self.template.entity().to_string(), columns)
    }

    fn validate_shape(&self) -> Result<()> {
        self.template.validate_shape()?;
        for injected in [&self.parent_key, &self.position_column] {
            if self.template.columns().iter().any(|c| &c.name == injected) {
                return Err(WriteError::Validation(format!(
                    "entity '{}' declares injected column '{}' as a caller column",
                    self.template.entity(),
                    injected
                )));
            }
        }
        if self.parent_key == self.position_column {
            return Err(WriteError::Validation(format!(
                "entity '{}' uses '{}' as both parent key and position column",
                self.template.entity(),
                self.parent_key
            )));
        }
        Ok(())
    }
}

/// Full shape of an aggregate: the parent entity and its child collections.
///
/// # Examples
///
/// ```
/// use aggwrite::{AggregateConfig, CollectionTemplate, Column, EntityTemplate};
///
/// let config = AggregateConfig::new(
///     EntityTemplate::new("recipes")
///         .column(Column::new("title").required())
///         .column(Column::new("description")),
/// )
/// .collection(
///     "ingredients",
///     CollectionTemplate::new("ingredients", "recipe_id", "sort_order")
///         .column(Column::new("name").required())
///         .column(Column::new("qty")),
/// )
/// .collection(
///     "instructions",
///     CollectionTemplate::new("instructions", "recipe_id", "step_number")
///         .one_based()
///         .column(Column::new("text").required()),
/// );
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct AggregateConfig {
    parent: EntityTemplate,
    collections: Vec<(String, CollectionTemplate)>,
}

impl AggregateConfig {
    pub fn new(parent: EntityTemplate) -> Self {
        Self {
            parent,
            collections: Vec::new(),
        }
    }

    /// Register a child collection under the name callers will use.
    pub fn collection(
        mut self,
        name: impl Into<String>,
        template: CollectionTemplate,
    ) -> Self {
        self.collections.push((name.into(), template));
        self
    }

    pub fn parent(&self) -> &EntityTemplate {
        &self.parent
    }

    pub fn collections(&self) -> &[(String, CollectionTemplate)] {
        &self.collections
    }

    pub fn collection_named(&self, name: &str) -> Option<&CollectionTemplate> {
        self.collections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    /// Validate the configuration itself.
    pub fn validate(&self) -> Result<()> {
        self.parent.validate_shape()?;
        for (i, (name, template)) in self.collections.iter().enumerate() {
            if self.collections[..i].iter().any(|(n, _)| n == name) {
                return Err(WriteError::Validation(format!(
                    "collection '{}' is configured twice",
                    name
                )));
            }
            template.validate_shape()?;
        }
        Ok(())
    }

    /// Check a parent payload before any backend interaction.
    pub(crate) fn validate_parent(&self, payload: &Payload) -> Result<()> {
        if payload.is_empty() {
            return Err(WriteError::Validation(format!(
                "parent payload for '{}' is empty",
                self.parent.entity()
            )));
        }
        self.parent.validate(payload)
    }
}

//! A remote-backed object with explicit change tracking.
//!
//! `set` records the field as dirty; `save` sends only the dirty fields
//! (PUT when the record has an `ID`, POST to create it otherwise), then
//! replaces the local fields with what the service returned.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::error::ApiError;
use crate::http::Transport;
use crate::params::{ParamValue, ParameterMap};
use crate::session::Session;
use crate::types::Item;

pub const ID_FIELD: &str = "ID";

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    obj_code: String,
    fields: Item,
    dirty: BTreeSet<String>,
}

impl Record {
    /// A record that does not exist remotely yet.
    pub fn new(obj_code: &str) -> Self {
        Self::from_item(obj_code, Item::new())
    }

    /// Wrap fields returned by the service. Nothing is dirty.
    pub fn from_item(obj_code: &str, fields: Item) -> Self {
        Self {
            obj_code: obj_code.to_string(),
            fields,
            dirty: BTreeSet::new(),
        }
    }

    /// Load `id` with the given fields.
    pub fn fetch<T: Transport>(
        session: &mut Session<T>,
        obj_code: &str,
        id: &str,
        fields: &[&str],
    ) -> Result<Self, ApiError> {
        Ok(Self::from_item(obj_code, session.get(obj_code, id, fields)?))
    }

    pub fn obj_code(&self) -> &str {
        &self.obj_code
    }

    pub fn id(&self) -> Option<&str> {
        self.fields.get(ID_FIELD).and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
        self.dirty.insert(key.to_string());
    }

    pub fn fields(&self) -> &Item {
        &self.fields
    }

    pub fn dirty_fields(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Parameters for the dirty fields only.
    pub fn changes(&self) -> Result<ParameterMap, ApiError> {
        let mut params = ParameterMap::new();
        for key in &self.dirty {
            if let Some(value) = self.fields.get(key) {
                params.insert(key.as_str(), ParamValue::from_json(value))?;
            }
        }
        Ok(params)
    }

    /// Persist the dirty fields and refresh from the response.
    pub fn save<T: Transport>(&mut self, session: &mut Session<T>) -> Result<(), ApiError> {
        if !self.is_dirty() {
            return Err(ApiError::validation("no fields were modified"));
        }
        let params = self.changes()?;
        let keys: Vec<String> = self
            .fields
            .keys()
            .filter(|k| k.as_str() != ID_FIELD)
            .cloned()
            .collect();
        let fields: Vec<&str> = keys.iter().map(String::as_str).collect();

        let saved = match self.id() {
            Some(id) => session.put(&self.obj_code, id, &params, &fields)?,
            None => session.post(&self.obj_code, &params, &fields)?,
        };
        self.fields = saved;
        self.dirty.clear();
        Ok(())
    }

    /// Delete the record remotely. `force` also removes dependents.
    pub fn delete<T: Transport>(&self, session: &mut Session<T>, force: bool) -> Result<Value, ApiError> {
        let id = self
            .id()
            .ok_or_else(|| ApiError::validation("record has no ID"))?;
        session.delete(&self.obj_code, id, force)
    }
}

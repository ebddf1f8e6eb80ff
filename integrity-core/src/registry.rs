//! Probe registry
//!
//! A static, ordered list of probe descriptors. The registry is pure data:
//! swapping it is the only thing needed to check a different set of signals.
//! Every row-key it will ever report, including the sub-keys of
//! multi-verdict probes, is known at construction time.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::error::RegistryError;
use crate::probe::Probe;

/// A row declared by a multi-verdict probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubRow {
    pub key: String,
    pub display_name: String,
}

impl SubRow {
    pub fn new(key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
        }
    }
}

/// Result shape a descriptor promises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeShape {
    Single,
    Multi(Vec<SubRow>),
}

impl ProbeShape {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            ProbeShape::Single => "single",
            ProbeShape::Multi(_) => "multi",
        }
    }
}

/// One report row as known before any probe runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowSpec {
    pub key: String,
    pub display_name: String,
    pub group: String,
}

/// An immutable probe registration.
pub struct ProbeDescriptor {
    key: String,
    display_name: String,
    group: String,
    shape: ProbeShape,
    probe: Rc<dyn Probe>,
}

impl ProbeDescriptor {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn shape(&self) -> &ProbeShape {
        &self.shape
    }

    pub fn probe(&self) -> &dyn Probe {
        self.probe.as_ref()
    }

    /// Row-keys this probe reports under.
    pub fn row_keys(&self) -> Vec<&str> {
        match &self.shape {
            ProbeShape::Single => vec![self.key.as_str()],
            ProbeShape::Multi(rows) => rows.iter().map(|r| r.key.as_str()).collect(),
        }
    }

    fn rows(&self) -> Vec<RowSpec> {
        match &self.shape {
            ProbeShape::Single => vec![RowSpec {
                key: self.key.clone(),
                display_name: self.display_name.clone(),
                group: self.group.clone(),
            }],
            ProbeShape::Multi(rows) => rows
                .iter()
                .map(|r| RowSpec {
                    key: r.key.clone(),
                    display_name: r.display_name.clone(),
                    group: self.group.clone(),
                })
                .collect(),
        }
    }
}

impl fmt::Debug for ProbeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeDescriptor")
            .field("key", &self.key)
            .field("display_name", &self.display_name)
            .field("group", &self.group)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

/// Validated, ordered set of probes.
#[derive(Debug)]
pub struct ProbeRegistry {
    descriptors: Vec<ProbeDescriptor>,
}

impl ProbeRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn descriptors(&self) -> &[ProbeDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// The static row plan, in registry order.
    pub fn rows(&self) -> Vec<RowSpec> {
        self.descriptors.iter().flat_map(|d| d.rows()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.descriptors.iter().map(|d| d.row_keys().len()).sum()
    }
}

/// Builder for [`ProbeRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    descriptors: Vec<ProbeDescriptor>,
}

impl RegistryBuilder {
    /// Register a single-verdict probe.
    pub fn single(
        mut self,
        key: impl Into<String>,
        display_name: impl Into<String>,
        group: impl Into<String>,
        probe: impl Probe + 'static,
    ) -> Self {
        let key = key.into();
        self.descriptors.push(ProbeDescriptor {
            display_name: display_name.into(),
            key,
            group: group.into(),
            shape: ProbeShape::Single,
            probe: Rc::new(probe),
        });
        self
    }

    /// Register a multi-verdict probe with its statically known sub-rows.
    pub fn multi(
        mut self,
        key: impl Into<String>,
        display_name: impl Into<String>,
        group: impl Into<String>,
        sub_rows: Vec<SubRow>,
        probe: impl Probe + 'static,
    ) -> Self {
        let key = key.into();
        self.descriptors.push(ProbeDescriptor {
            display_name: display_name.into(),
            key,
            group: group.into(),
            shape: ProbeShape::Multi(sub_rows),
            probe: Rc::new(probe),
        });
        self
    }

    /// Validate and freeze the registry.
    ///
    /// Descriptor keys must be unique among descriptors, and row-keys must be
    /// unique across the whole row plan.
    pub fn build(self) -> Result<ProbeRegistry, RegistryError> {
        let mut probe_keys: HashSet<&str> = HashSet::new();
        let mut row_keys: HashSet<&str> = HashSet::new();

        for descriptor in &self.descriptors {
            if descriptor.key.is_empty() {
                return Err(RegistryError::EmptyKey);
            }
            if let ProbeShape::Multi(rows) = &descriptor.shape {
                if rows.is_empty() {
                    return Err(RegistryError::NoSubRows(descriptor.key.clone()));
                }
            }
            if !probe_keys.insert(descriptor.key.as_str()) {
                return Err(RegistryError::DuplicateRowKey(descriptor.key.clone()));
            }
            for key in descriptor.row_keys() {
                if key.is_empty() {
                    return Err(RegistryError::EmptyKey);
                }
                if !row_keys.insert(key) {
                    return Err(RegistryError::DuplicateRowKey(key.to_string()));
                }
            }
        }

        log::debug!("Probe registry built with {} probes", self.descriptors.len());

        Ok(ProbeRegistry {
            descriptors: self.descriptors,
        })
    }
}

//! Reference data resolution for one import run
//!
//! Lookup tables are fetched once, before any record is processed, and then
//! shared read-only by validation and payload building. A failure to fetch
//! any table aborts the batch.

use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

use crate::backend::DirectoryBackend;
use crate::error::ImportError;
use crate::import::constants::{
    FAILED_TO_LIST_ADDRESS_TYPES, FAILED_TO_LIST_CUSTOM_FIELDS, FAILED_TO_LIST_DEPARTMENTS,
    FAILED_TO_LIST_PATRON_GROUPS, FAILED_TO_LIST_SERVICE_POINTS, FAILED_TO_SAVE_DEPARTMENTS,
    FAILED_TO_UPDATE_CUSTOM_FIELDS,
};
use crate::models::{
    AddressType, CustomFieldDefinition, Department, ImportBatch, IncludedDepartment,
    PatronGroup, SelectFieldOption, ServicePoint,
};

/// Name and id index over one kind of reference entity
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    by_name: HashMap<String, String>,
    ids: HashSet<String>,
}

impl LookupTable {
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut table = LookupTable::default();
        for (id, name) in pairs {
            table.ids.insert(id.clone());
            table.by_name.insert(name, id);
        }
        table
    }

    /// Resolve an id or a name to the entity id; ids take precedence
    pub fn resolve(&self, id_or_name: &str) -> Option<&str> {
        if let Some(id) = self.ids.get(id_or_name) {
            return Some(id.as_str());
        }
        self.by_name.get(id_or_name).map(String::as_str)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Immutable snapshot of the reference data used by one run
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub patron_groups: LookupTable,
    pub address_types: LookupTable,
    pub service_points: HashSet<String>,
    pub departments: LookupTable,
    pub custom_fields: HashMap<String, CustomFieldDefinition>,
}

impl ReferenceTables {
    pub fn new(
        patron_groups: Vec<PatronGroup>,
        address_types: Vec<AddressType>,
        service_points: Vec<ServicePoint>,
    ) -> Self {
        Self {
            patron_groups: LookupTable::from_pairs(
                patron_groups.into_iter().map(|group| (group.id, group.name)),
            ),
            address_types: LookupTable::from_pairs(
                address_types.into_iter().map(|kind| (kind.id, kind.name)),
            ),
            service_points: service_points.into_iter().map(|point| point.id).collect(),
            ..Default::default()
        }
    }

    pub fn with_departments(mut self, departments: Vec<Department>) -> Self {
        self.departments = LookupTable::from_pairs(
            departments
                .into_iter()
                .filter_map(|department| department.id.map(|id| (id, department.name))),
        );
        self
    }

    pub fn with_custom_fields(mut self, definitions: Vec<CustomFieldDefinition>) -> Self {
        self.custom_fields = definitions
            .into_iter()
            .map(|definition| (definition.ref_id.clone(), definition))
            .collect();
        self
    }

    pub fn custom_field(&self, ref_id: &str) -> Option<&CustomFieldDefinition> {
        self.custom_fields.get(ref_id)
    }
}

/// Fetches reference tables from the directory, honoring inline data on the batch
pub struct ReferenceDataCache<'a> {
    backend: &'a dyn DirectoryBackend,
}

impl<'a> ReferenceDataCache<'a> {
    pub fn new(backend: &'a dyn DirectoryBackend) -> Self {
        Self { backend }
    }

    pub async fn warm(&self, batch: &ImportBatch) -> Result<ReferenceTables, ImportError> {
        let patron_groups = self
            .backend
            .list_patron_groups()
            .await
            .map_err(|cause| ImportError::ReferenceData {
                stage: FAILED_TO_LIST_PATRON_GROUPS,
                cause,
            })?;

        let address_types = self
            .backend
            .list_address_types()
            .await
            .map_err(|cause| ImportError::ReferenceData {
                stage: FAILED_TO_LIST_ADDRESS_TYPES,
                cause,
            })?;

        let service_points = self
            .backend
            .list_service_points()
            .await
            .map_err(|cause| ImportError::ReferenceData {
                stage: FAILED_TO_LIST_SERVICE_POINTS,
                cause,
            })?;

        let mut tables = ReferenceTables::new(patron_groups, address_types, service_points);

        if needs_departments(batch) {
            let departments = self.load_departments(batch.included_departments()).await?;
            tables = tables.with_departments(departments);
        }

        if needs_custom_fields(batch) {
            let definitions = self
                .load_custom_fields(batch.included_custom_fields())
                .await?;
            tables = tables.with_custom_fields(definitions);
        }

        debug!(
            patron_groups = tables.patron_groups.len(),
            address_types = tables.address_types.len(),
            service_points = tables.service_points.len(),
            departments = tables.departments.len(),
            custom_fields = tables.custom_fields.len(),
            "Reference data loaded"
        );

        Ok(tables)
    }

    async fn load_departments(
        &self,
        included: &[IncludedDepartment],
    ) -> Result<Vec<Department>, ImportError> {
        let mut departments =
            self.backend
                .list_departments()
                .await
                .map_err(|cause| ImportError::ReferenceData {
                    stage: FAILED_TO_LIST_DEPARTMENTS,
                    cause,
                })?;

        for wanted in included {
            match departments.iter_mut().find(|known| known.name == wanted.name) {
                Some(known) => {
                    if wanted.code.is_some() && known.code != wanted.code {
                        known.code = wanted.code.clone();
                        self.backend
                            .update_department(known)
                            .await
                            .map_err(|cause| ImportError::IncludedDataSave {
                                stage: FAILED_TO_SAVE_DEPARTMENTS,
                                cause,
                            })?;
                    }
                }
                None => {
                    let created = self
                        .backend
                        .create_department(&Department {
                            id: None,
                            name: wanted.name.clone(),
                            code: wanted.code.clone(),
                        })
                        .await
                        .map_err(|cause| ImportError::IncludedDataSave {
                            stage: FAILED_TO_SAVE_DEPARTMENTS,
                            cause,
                        })?;
                    departments.push(created);
                }
            }
        }

        Ok(departments)
    }

    async fn load_custom_fields(
        &self,
        included: &[CustomFieldDefinition],
    ) -> Result<Vec<CustomFieldDefinition>, ImportError> {
        let mut definitions = self
            .backend
            .list_custom_field_definitions()
            .await
            .map_err(|cause| ImportError::ReferenceData {
                stage: FAILED_TO_LIST_CUSTOM_FIELDS,
                cause,
            })?;

        if included.is_empty() {
            return Ok(definitions);
        }

        let unknown: BTreeSet<String> = included
            .iter()
            .filter(|wanted| !definitions.iter().any(|known| known.ref_id == wanted.ref_id))
            .map(|wanted| wanted.ref_id.clone())
            .collect();
        if !unknown.is_empty() {
            return Err(ImportError::UnknownCustomFields(unknown.into_iter().collect()));
        }

        let mut changed = false;
        for wanted in included {
            if let Some(known) = definitions
                .iter_mut()
                .find(|known| known.ref_id == wanted.ref_id)
            {
                changed |= merge_options(known, wanted);
            }
        }

        if changed {
            self.backend
                .update_custom_field_definitions(&definitions)
                .await
                .map_err(|cause| ImportError::IncludedDataSave {
                    stage: FAILED_TO_UPDATE_CUSTOM_FIELDS,
                    cause,
                })?;
        }

        Ok(definitions)
    }
}

fn needs_departments(batch: &ImportBatch) -> bool {
    !batch.included_departments().is_empty()
        || batch.users.iter().any(|user| {
            user.departments
                .as_ref()
                .is_some_and(|departments| !departments.is_empty())
        })
}

fn needs_custom_fields(batch: &ImportBatch) -> bool {
    !batch.included_custom_fields().is_empty()
        || batch.users.iter().any(|user| {
            user.custom_fields
                .as_ref()
                .is_some_and(|fields| !fields.is_empty())
        })
}

/// Append options from `wanted` that `known` does not define yet.
/// Returns true when `known` changed.
fn merge_options(known: &mut CustomFieldDefinition, wanted: &CustomFieldDefinition) -> bool {
    let mut queued = HashSet::new();
    let missing: Vec<String> = wanted
        .options()
        .iter()
        .filter(|option| known.find_option(&option.value).is_none())
        .filter(|option| queued.insert(option.value.as_str()))
        .map(|option| option.value.clone())
        .collect();
    if missing.is_empty() {
        return false;
    }

    let mut next = next_option_number(known.options());
    let select = known.select_field.get_or_insert_with(Default::default);
    for value in missing {
        select.options.values.push(SelectFieldOption {
            id: Some(format!("opt_{}", next)),
            value,
            default: None,
        });
        next += 1;
    }
    true
}

fn next_option_number(options: &[SelectFieldOption]) -> usize {
    options
        .iter()
        .filter_map(|option| option.id.as_deref())
        .filter_map(|id| id.strip_prefix("opt_"))
        .filter_map(|number| number.parse::<usize>().ok())
        .max()
        .map(|max| max + 1)
        .unwrap_or(options.len())
}

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use user_import::backend::database::DatabaseBackendConfig;
use user_import::backend::{Backend, ReferenceDataBackend, UserDirectoryBackend};
use user_import::error::{AppError, AppResult};
use user_import::import::{ImportSettings, UserImporter};
use user_import::models::{
    AddressType, CustomFieldDefinition, Department, DirectoryUser, ImportBatch, IncomingUser,
    PatronGroup, PersonalInfo, ServicePoint,
};
use user_import::resource::AppState;
use user_import::startup::build_router;

pub const SERVICE_POINT_ID: &str = "3a40852d-49fd-4df2-a1f9-6e2641a6e91f";

/// Collaborator operations that can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fail {
    PatronGroups,
    AddressTypes,
    ServicePoints,
    Departments,
    CustomFields,
    SaveDepartments,
    SaveCustomFields,
    Search,
    SearchMalformed,
    ListBySourceType,
    Deactivate,
    PermissionUser,
    Health,
}

#[derive(Default)]
struct MockState {
    patron_groups: Vec<PatronGroup>,
    address_types: Vec<AddressType>,
    service_points: Vec<ServicePoint>,
    departments: Vec<Department>,
    custom_fields: Vec<CustomFieldDefinition>,
    users: Vec<DirectoryUser>,
    failures: HashSet<Fail>,
    failing_writes: HashSet<String>,
    calls: Vec<String>,
    next_id: usize,
}

/// In-memory directory with failure injection and call recording
#[derive(Clone, Default)]
pub struct MockDirectory {
    state: Arc<Mutex<MockState>>,
}

impl MockDirectory {
    /// Directory preloaded with a small, fixed set of reference data
    pub fn new() -> Self {
        let mock = Self::default();
        {
            let mut state = mock.state.lock().unwrap();
            state.patron_groups = vec![
                PatronGroup {
                    id: "pg-staff".to_string(),
                    name: "staff".to_string(),
                },
                PatronGroup {
                    id: "pg-faculty".to_string(),
                    name: "faculty".to_string(),
                },
            ];
            state.address_types = vec![
                AddressType {
                    id: "at-home".to_string(),
                    name: "Home".to_string(),
                },
                AddressType {
                    id: "at-work".to_string(),
                    name: "Work".to_string(),
                },
            ];
            state.service_points = vec![ServicePoint {
                id: SERVICE_POINT_ID.to_string(),
                name: Some("Circulation Desk".to_string()),
                code: Some("cd1".to_string()),
            }];
            state.departments = vec![Department {
                id: Some("dep-history".to_string()),
                name: "History".to_string(),
                code: Some("HIS".to_string()),
            }];
            state.custom_fields = vec![
                serde_json::from_value(serde_json::json!({
                    "id": "cf-1",
                    "refId": "department_1",
                    "name": "Department",
                    "type": "MULTI_SELECT_DROPDOWN",
                    "selectField": {
                        "multiSelect": true,
                        "options": {
                            "values": [
                                {"id": "opt_0", "value": "Design"},
                                {"id": "opt_1", "value": "Development"}
                            ]
                        }
                    }
                }))
                .unwrap(),
                serde_json::from_value(serde_json::json!({
                    "id": "cf-2",
                    "refId": "nickname",
                    "name": "Nickname",
                    "type": "TEXTBOX_SHORT"
                }))
                .unwrap(),
            ];
        }
        mock
    }

    pub fn fail(self, failure: Fail) -> Self {
        self.state.lock().unwrap().failures.insert(failure);
        self
    }

    /// Make create and update calls fail for one external system id
    pub fn fail_writes_for(self, external_system_id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_writes
            .insert(external_system_id.to_string());
        self
    }

    pub fn with_user(self, user: DirectoryUser) -> Self {
        self.state.lock().unwrap().users.push(user);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub fn users(&self) -> Vec<DirectoryUser> {
        self.state.lock().unwrap().users.clone()
    }

    pub fn user(&self, external_system_id: &str) -> Option<DirectoryUser> {
        self.users()
            .into_iter()
            .find(|user| user.external_system_id.as_deref() == Some(external_system_id))
    }

    pub fn departments(&self) -> Vec<Department> {
        self.state.lock().unwrap().departments.clone()
    }

    pub fn custom_fields(&self) -> Vec<CustomFieldDefinition> {
        self.state.lock().unwrap().custom_fields.clone()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn check(&self, failure: Fail) -> AppResult<()> {
        if self.state.lock().unwrap().failures.contains(&failure) {
            return Err(AppError::Database(format!("{:?} unavailable", failure)));
        }
        Ok(())
    }

    fn write_fails(&self, user: &DirectoryUser) -> bool {
        let state = self.state.lock().unwrap();
        user.external_system_id
            .as_ref()
            .is_some_and(|id| state.failing_writes.contains(id))
    }
}

#[async_trait]
impl Backend for MockDirectory {
    async fn connect(_config: &DatabaseBackendConfig) -> AppResult<Self> {
        Ok(Self::new())
    }

    async fn health_check(&self) -> AppResult<()> {
        self.check(Fail::Health)
    }

    async fn init_schema(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ReferenceDataBackend for MockDirectory {
    async fn list_patron_groups(&self) -> AppResult<Vec<PatronGroup>> {
        self.record("list_patron_groups".to_string());
        self.check(Fail::PatronGroups)?;
        Ok(self.state.lock().unwrap().patron_groups.clone())
    }

    async fn list_address_types(&self) -> AppResult<Vec<AddressType>> {
        self.record("list_address_types".to_string());
        self.check(Fail::AddressTypes)?;
        Ok(self.state.lock().unwrap().address_types.clone())
    }

    async fn list_service_points(&self) -> AppResult<Vec<ServicePoint>> {
        self.record("list_service_points".to_string());
        self.check(Fail::ServicePoints)?;
        Ok(self.state.lock().unwrap().service_points.clone())
    }

    async fn list_departments(&self) -> AppResult<Vec<Department>> {
        self.record("list_departments".to_string());
        self.check(Fail::Departments)?;
        Ok(self.state.lock().unwrap().departments.clone())
    }

    async fn create_department(&self, department: &Department) -> AppResult<Department> {
        self.record(format!("create_department:{}", department.name));
        self.check(Fail::SaveDepartments)?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let created = Department {
            id: Some(format!("dep-{}", state.next_id)),
            ..department.clone()
        };
        state.departments.push(created.clone());
        Ok(created)
    }

    async fn update_department(&self, department: &Department) -> AppResult<()> {
        self.record(format!("update_department:{}", department.name));
        self.check(Fail::SaveDepartments)?;
        let mut state = self.state.lock().unwrap();
        if let Some(known) = state
            .departments
            .iter_mut()
            .find(|known| known.id == department.id)
        {
            *known = department.clone();
        }
        Ok(())
    }

    async fn list_custom_field_definitions(&self) -> AppResult<Vec<CustomFieldDefinition>> {
        self.record("list_custom_fields".to_string());
        self.check(Fail::CustomFields)?;
        Ok(self.state.lock().unwrap().custom_fields.clone())
    }

    async fn update_custom_field_definitions(
        &self,
        definitions: &[CustomFieldDefinition],
    ) -> AppResult<()> {
        self.record("update_custom_fields".to_string());
        self.check(Fail::SaveCustomFields)?;
        self.state.lock().unwrap().custom_fields = definitions.to_vec();
        Ok(())
    }
}

#[async_trait]
impl UserDirectoryBackend for MockDirectory {
    async fn search_users_by_external_id(
        &self,
        external_system_id: &str,
    ) -> AppResult<Vec<DirectoryUser>> {
        self.record(format!("search_users:{}", external_system_id));
        self.check(Fail::Search)?;
        if self.state.lock().unwrap().failures.contains(&Fail::SearchMalformed) {
            return Err(AppError::SchemaMismatch(
                "user record is missing username".to_string(),
            ));
        }
        Ok(self
            .users()
            .into_iter()
            .filter(|user| user.external_system_id.as_deref() == Some(external_system_id))
            .collect())
    }

    async fn create_user(&self, user: &DirectoryUser) -> AppResult<String> {
        let external_system_id = user.external_system_id.clone().unwrap_or_default();
        self.record(format!("create_user:{}", external_system_id));
        if self.write_fails(user) {
            return Err(AppError::Database("connection reset".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("user-{}", state.next_id);
        let mut stored = user.clone();
        stored.id = Some(id.clone());
        state.users.push(stored);
        Ok(id)
    }

    async fn create_permission_user(&self, user_id: &str) -> AppResult<()> {
        self.record(format!("create_permission_user:{}", user_id));
        self.check(Fail::PermissionUser)
    }

    async fn update_user(&self, id: &str, user: &DirectoryUser) -> AppResult<()> {
        let external_system_id = user.external_system_id.clone().unwrap_or_default();
        self.record(format!("update_user:{}", external_system_id));
        if self.write_fails(user) {
            return Err(AppError::Database("connection reset".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        match state
            .users
            .iter_mut()
            .find(|known| known.id.as_deref() == Some(id))
        {
            Some(known) => {
                *known = user.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("User {} not found", id))),
        }
    }

    async fn list_users_by_source_type(&self, source_type: &str) -> AppResult<Vec<DirectoryUser>> {
        self.record(format!("list_users_by_source_type:{}", source_type));
        self.check(Fail::ListBySourceType)?;
        Ok(self
            .users()
            .into_iter()
            .filter(|user| user.source_type.as_deref() == Some(source_type))
            .collect())
    }

    async fn deactivate_user(&self, id: &str) -> AppResult<()> {
        self.record(format!("deactivate_user:{}", id));
        self.check(Fail::Deactivate)?;
        let mut state = self.state.lock().unwrap();
        if let Some(known) = state
            .users
            .iter_mut()
            .find(|known| known.id.as_deref() == Some(id))
        {
            known.active = Some(false);
        }
        Ok(())
    }
}

pub fn importer(mock: &MockDirectory) -> UserImporter {
    UserImporter::new(Arc::new(mock.clone()), ImportSettings::default())
}

pub fn importer_with_concurrency(mock: &MockDirectory, max_concurrency: usize) -> UserImporter {
    UserImporter::new(
        Arc::new(mock.clone()),
        ImportSettings {
            max_concurrency,
            ..ImportSettings::default()
        },
    )
}

/// Create a test app backed by the given mock directory
pub fn setup_test_app(mock: &MockDirectory) -> Router {
    let state = AppState::new(importer(mock), Arc::new(mock.clone()));
    build_router(state, false)
}

/// Incoming record in the "staff" patron group with a name
pub fn user(external_system_id: &str, username: &str) -> IncomingUser {
    let mut user = IncomingUser::new(external_system_id, username);
    user.patron_group = Some("staff".to_string());
    user.personal = Some(PersonalInfo {
        last_name: Some("Cabble".to_string()),
        first_name: Some("Amy".to_string()),
        ..Default::default()
    });
    user
}

pub fn batch(users: Vec<IncomingUser>) -> ImportBatch {
    ImportBatch::new(users)
}

/// Existing directory account tagged with the default source type
pub fn account(id: &str, external_system_id: &str, username: &str) -> DirectoryUser {
    DirectoryUser {
        id: Some(id.to_string()),
        external_system_id: Some(external_system_id.to_string()),
        username: username.to_string(),
        active: Some(true),
        patron_group: Some("pg-staff".to_string()),
        source_type: Some("import".to_string()),
        ..Default::default()
    }
}

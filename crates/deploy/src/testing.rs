//! In-memory collaborators shared by the unit tests.

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use scfdeploy_protocol::{
    ArtifactLocation, ConfigUpdate, DeployedFunction, DeployedState, DesiredSpec, EventSpec,
    Fingerprint, FunctionConfig, FunctionDescriptor, FunctionIdentity, FunctionStatus,
    GatewayApi, GatewayDeployment, GatewaySummary, QueueTrigger, TimerTrigger, TriggerRecord,
    TriggerSpec,
};
use scfdeploy_state::MemoryStore;
use scfdeploy_transfer::{ProgressObserver, ProgressReporter, TransferError};

use crate::config::EngineConfig;
use crate::service::{
    Collaborators, Fingerprinter, FunctionService, GatewayProvisioner, GatewayRequest,
    ObjectStorage, Packager, ServiceError, ServiceFuture,
};

fn request_error(msg: &str) -> ServiceError {
    ServiceError::Request(msg.into())
}

// ---------------------------------------------------------------------------
// Packager / Fingerprinter
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockPackager {
    pub calls: Mutex<Vec<(PathBuf, Vec<String>, Vec<String>, PathBuf)>>,
    pub fail: Mutex<Option<String>>,
}

impl Packager for MockPackager {
    fn pack<'a>(
        &'a self,
        source_dir: &'a Path,
        include: &'a [String],
        exclude: &'a [String],
        output: &'a Path,
    ) -> ServiceFuture<'a, PathBuf> {
        Box::pin(async move {
            self.calls.lock().unwrap().push((
                source_dir.to_path_buf(),
                include.to_vec(),
                exclude.to_vec(),
                output.to_path_buf(),
            ));
            if let Some(msg) = self.fail.lock().unwrap().as_deref() {
                return Err(request_error(msg));
            }
            Ok(output.to_path_buf())
        })
    }
}

/// Returns whatever hash the test configured.
pub struct MockFingerprinter {
    pub hash: Mutex<String>,
}

impl MockFingerprinter {
    pub fn new(hash: &str) -> Self {
        Self {
            hash: Mutex::new(hash.into()),
        }
    }
}

impl Fingerprinter for MockFingerprinter {
    fn fingerprint(&self, _artifact: &Path) -> Result<Fingerprint, TransferError> {
        Ok(Fingerprint::new(self.hash.lock().unwrap().clone()))
    }
}

// ---------------------------------------------------------------------------
// Object storage
// ---------------------------------------------------------------------------

pub struct MockStorage {
    exists: Mutex<Result<bool, String>>,
    pub upload_fail: Mutex<Option<String>>,
    pub uploads: Mutex<Vec<ArtifactLocation>>,
    pub exists_checks: Mutex<Vec<ArtifactLocation>>,
    next_key: Mutex<u32>,
}

impl Default for MockStorage {
    fn default() -> Self {
        Self {
            exists: Mutex::new(Ok(true)),
            upload_fail: Mutex::new(None),
            uploads: Mutex::new(Vec::new()),
            exists_checks: Mutex::new(Vec::new()),
            next_key: Mutex::new(1),
        }
    }
}

impl MockStorage {
    pub fn set_exists(&self, answer: Result<bool, String>) {
        *self.exists.lock().unwrap() = answer;
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

impl ObjectStorage for MockStorage {
    fn artifact_location<'a>(
        &'a self,
        identity: &'a FunctionIdentity,
    ) -> ServiceFuture<'a, ArtifactLocation> {
        Box::pin(async move {
            let mut next = self.next_key.lock().unwrap();
            let location = ArtifactLocation {
                bucket: "code".into(),
                key: format!("{}-{}.zip", identity.name, *next),
            };
            *next += 1;
            Ok(location)
        })
    }

    fn exists<'a>(&'a self, location: &'a ArtifactLocation) -> ServiceFuture<'a, bool> {
        Box::pin(async move {
            self.exists_checks.lock().unwrap().push(location.clone());
            self.exists.lock().unwrap().clone().map_err(|e| request_error(&e))
        })
    }

    fn upload<'a>(
        &'a self,
        location: &'a ArtifactLocation,
        _artifact: &'a Path,
        observer: &'a dyn ProgressObserver,
    ) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            let reporter = ProgressReporter::new(observer, 1024);
            reporter.advance(512);
            if let Some(msg) = self.upload_fail.lock().unwrap().as_deref() {
                return Err(request_error(msg));
            }
            reporter.finish();
            self.uploads.lock().unwrap().push(location.clone());
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Function service
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockFunctions {
    /// Deployed functions keyed by identity.
    pub functions: Mutex<BTreeMap<String, FunctionDescriptor>>,
    /// Log of mutating calls, e.g. `"create_trigger queue:orders"`.
    pub calls: Mutex<Vec<String>>,
    /// Native triggers attached remotely, keyed by (function, trigger key).
    pub triggers: Mutex<BTreeMap<(String, String), String>>,
    pub configs: Mutex<Vec<FunctionConfig>>,
    pub config_updates: Mutex<Vec<ConfigUpdate>>,
    pub tags: Mutex<Vec<BTreeMap<String, String>>>,
    /// Scripted `status` answers; `Ready` once exhausted.
    pub statuses: Mutex<VecDeque<Result<FunctionStatus, String>>>,
    pub status_calls: Mutex<u32>,
    /// Function names whose `delete` fails with a request error.
    pub fail_delete: Mutex<Vec<String>>,
    /// Trigger names whose create/update/delete fails.
    pub fail_triggers: Mutex<Vec<String>>,
    pub fail_apply: Mutex<Option<String>>,
    pub fail_get: Mutex<Option<String>>,
    pub role_checks: Mutex<u32>,
    next_trigger: Mutex<u32>,
}

impl MockFunctions {
    pub fn insert(&self, descriptor: FunctionDescriptor) {
        self.functions
            .lock()
            .unwrap()
            .insert(descriptor.identity.to_string(), descriptor);
    }

    pub fn contains(&self, identity: &FunctionIdentity) -> bool {
        self.functions
            .lock()
            .unwrap()
            .contains_key(&identity.to_string())
    }

    /// Attaches a trigger remotely as an earlier pass would have.
    pub fn seed_trigger(&self, identity: &FunctionIdentity, record: &TriggerRecord) {
        self.triggers.lock().unwrap().insert(
            (identity.to_string(), record.key().to_string()),
            record.trigger_id.clone(),
        );
    }

    /// Remote trigger keys of `identity`.
    pub fn trigger_keys(&self, identity: &FunctionIdentity) -> Vec<String> {
        let function = identity.to_string();
        self.triggers
            .lock()
            .unwrap()
            .keys()
            .filter(|(f, _)| *f == function)
            .map(|(_, key)| key.clone())
            .collect()
    }

    pub fn script_statuses(&self, statuses: Vec<Result<FunctionStatus, String>>) {
        *self.statuses.lock().unwrap() = statuses.into();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn trigger_fails(&self, name: &str) -> bool {
        self.fail_triggers.lock().unwrap().iter().any(|n| n == name)
    }

    fn next_trigger_id(&self) -> String {
        let mut next = self.next_trigger.lock().unwrap();
        *next += 1;
        format!("trg-{}", *next)
    }
}

impl FunctionService for MockFunctions {
    fn get<'a>(
        &'a self,
        identity: &'a FunctionIdentity,
    ) -> ServiceFuture<'a, Option<FunctionDescriptor>> {
        Box::pin(async move {
            if let Some(msg) = self.fail_get.lock().unwrap().as_deref() {
                return Err(request_error(msg));
            }
            Ok(self
                .functions
                .lock()
                .unwrap()
                .get(&identity.to_string())
                .cloned())
        })
    }

    fn create_or_update<'a>(
        &'a self,
        config: &'a FunctionConfig,
    ) -> ServiceFuture<'a, FunctionDescriptor> {
        Box::pin(async move {
            self.record(format!("create_or_update {}", config.identity.name));
            if let Some(msg) = self.fail_apply.lock().unwrap().as_deref() {
                return Err(request_error(msg));
            }
            self.configs.lock().unwrap().push(config.clone());
            let descriptor = FunctionDescriptor {
                identity: config.identity.clone(),
                runtime: config.runtime.clone(),
                handler: config.handler.clone(),
                memory_size: config.memory_size,
                timeout: config.timeout,
                description: config.description.clone(),
                environment: config.environment.clone(),
                role: config.role.clone(),
                status: FunctionStatus::Pending,
            };
            self.insert(descriptor.clone());
            Ok(descriptor)
        })
    }

    fn status<'a>(&'a self, _identity: &'a FunctionIdentity) -> ServiceFuture<'a, FunctionStatus> {
        Box::pin(async move {
            *self.status_calls.lock().unwrap() += 1;
            match self.statuses.lock().unwrap().pop_front() {
                Some(Ok(status)) => Ok(status),
                Some(Err(msg)) => Err(request_error(&msg)),
                None => Ok(FunctionStatus::Ready),
            }
        })
    }

    fn delete<'a>(&'a self, identity: &'a FunctionIdentity) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            self.record(format!("delete {}", identity.name));
            if self
                .fail_delete
                .lock()
                .unwrap()
                .iter()
                .any(|n| *n == identity.name)
            {
                return Err(request_error("delete rejected"));
            }
            let function = identity.to_string();
            match self.functions.lock().unwrap().remove(&function) {
                Some(_) => {
                    self.triggers.lock().unwrap().retain(|(f, _), _| *f != function);
                    Ok(())
                }
                None => Err(ServiceError::NotFound(function)),
            }
        })
    }

    fn tag<'a>(
        &'a self,
        identity: &'a FunctionIdentity,
        tags: &'a BTreeMap<String, String>,
    ) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            self.record(format!("tag {}", identity.name));
            self.tags.lock().unwrap().push(tags.clone());
            Ok(())
        })
    }

    fn ensure_role<'a>(&'a self, _region: &'a str) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            *self.role_checks.lock().unwrap() += 1;
            Ok(())
        })
    }

    fn update_configuration<'a>(&'a self, update: &'a ConfigUpdate) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            self.record(format!("update_configuration {}", update.name));
            if let Some(msg) = self.fail_apply.lock().unwrap().as_deref() {
                return Err(request_error(msg));
            }
            self.config_updates.lock().unwrap().push(update.clone());
            let mut functions = self.functions.lock().unwrap();
            let Some(descriptor) = functions.get_mut(&update.identity().to_string()) else {
                return Err(ServiceError::NotFound(update.name.clone()));
            };
            if let Some(memory) = update.memory_size {
                descriptor.memory_size = memory;
            }
            if let Some(timeout) = update.timeout {
                descriptor.timeout = timeout;
            }
            if let Some(description) = &update.description {
                descriptor.description = description.clone();
            }
            if let Some(environment) = &update.environment {
                descriptor.environment = environment.clone();
            }
            if update.role.is_some() {
                descriptor.role = update.role.clone();
            }
            Ok(())
        })
    }

    fn create_trigger<'a>(
        &'a self,
        identity: &'a FunctionIdentity,
        event: &'a EventSpec,
    ) -> ServiceFuture<'a, String> {
        Box::pin(async move {
            let key = event.key().to_string();
            self.record(format!("create_trigger {key}"));
            if self.trigger_fails(&event.name) {
                return Err(request_error("trigger quota exceeded"));
            }
            let slot = (identity.to_string(), key.clone());
            if self.triggers.lock().unwrap().contains_key(&slot) {
                return Err(ServiceError::AlreadyExists(key));
            }
            let id = self.next_trigger_id();
            self.triggers.lock().unwrap().insert(slot, id.clone());
            Ok(id)
        })
    }

    fn update_trigger<'a>(
        &'a self,
        identity: &'a FunctionIdentity,
        _existing: &'a TriggerRecord,
        event: &'a EventSpec,
    ) -> ServiceFuture<'a, String> {
        Box::pin(async move {
            let key = event.key().to_string();
            self.record(format!("update_trigger {key}"));
            if self.trigger_fails(&event.name) {
                return Err(request_error("trigger update rejected"));
            }
            self.triggers
                .lock()
                .unwrap()
                .get(&(identity.to_string(), key.clone()))
                .cloned()
                .ok_or(ServiceError::NotFound(key))
        })
    }

    fn delete_trigger<'a>(
        &'a self,
        identity: &'a FunctionIdentity,
        existing: &'a TriggerRecord,
    ) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            let key = existing.key().to_string();
            self.record(format!("delete_trigger {key}"));
            if self.trigger_fails(&existing.name) {
                return Err(request_error("trigger delete rejected"));
            }
            match self
                .triggers
                .lock()
                .unwrap()
                .remove(&(identity.to_string(), key.clone()))
            {
                Some(_) => Ok(()),
                None => Err(ServiceError::NotFound(key)),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Gateway sub-system
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockGateway {
    pub provisions: Mutex<Vec<GatewayRequest>>,
    pub deprovisions: Mutex<Vec<(String, String)>>,
    /// Service names whose provisioning fails.
    pub fail_services: Mutex<Vec<String>>,
    pub fail_deprovision: Mutex<bool>,
}

impl GatewayProvisioner for MockGateway {
    fn provision<'a>(
        &'a self,
        request: &'a GatewayRequest,
    ) -> ServiceFuture<'a, GatewayDeployment> {
        Box::pin(async move {
            self.provisions.lock().unwrap().push(request.clone());
            if self
                .fail_services
                .lock()
                .unwrap()
                .contains(&request.service_name)
            {
                return Err(request_error("gateway quota exceeded"));
            }
            let apis = request
                .triggers
                .iter()
                .flat_map(|t| t.endpoints.iter())
                .map(|e| GatewayApi {
                    method: e.method.clone(),
                    path: e.path.clone(),
                })
                .collect();
            let environment = request
                .triggers
                .first()
                .map(|t| t.environment.clone())
                .unwrap_or_else(|| "release".into());
            Ok(GatewayDeployment {
                apis,
                sub_domain: format!("{}.gw.example.com", request.service_name),
                protocols: vec!["http".into(), "https".into()],
                environment,
            })
        })
    }

    fn deprovision<'a>(
        &'a self,
        service_name: &'a str,
        client_remark: &'a str,
    ) -> ServiceFuture<'a, ()> {
        Box::pin(async move {
            self.deprovisions
                .lock()
                .unwrap()
                .push((service_name.into(), client_remark.into()));
            if *self.fail_deprovision.lock().unwrap() {
                return Err(request_error("gateway already gone"));
            }
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// One set of mocks plus typed handles for assertions.
pub struct Harness {
    pub packager: Arc<MockPackager>,
    pub fingerprinter: Arc<MockFingerprinter>,
    pub storage: Arc<MockStorage>,
    pub functions: Arc<MockFunctions>,
    pub gateway: Arc<MockGateway>,
    pub state: Arc<MemoryStore>,
}

impl Harness {
    pub fn new(hash: &str) -> Self {
        Self::with_state(hash, MemoryStore::new())
    }

    pub fn with_state(hash: &str, state: MemoryStore) -> Self {
        Self {
            packager: Arc::new(MockPackager::default()),
            fingerprinter: Arc::new(MockFingerprinter::new(hash)),
            storage: Arc::new(MockStorage::default()),
            functions: Arc::new(MockFunctions::default()),
            gateway: Arc::new(MockGateway::default()),
            state: Arc::new(state),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            packager: self.packager.clone(),
            fingerprinter: self.fingerprinter.clone(),
            storage: self.storage.clone(),
            functions: self.functions.clone(),
            gateway: self.gateway.clone(),
            state: self.state.clone(),
        }
    }
}

/// Engine config with a fast readiness poll.
pub fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.state_root = PathBuf::from("/tmp/scfdeploy-test");
    config.readiness.interval_ms = 10;
    config.readiness.max_attempts = 5;
    config
}

pub fn desired(name: &str) -> DesiredSpec {
    DesiredSpec {
        name: name.into(),
        runtime: "python3.9".into(),
        handler: "index.main".into(),
        memory_size: 128,
        timeout: 3,
        description: String::new(),
        environment: BTreeMap::new(),
        role: None,
        namespace: "default".into(),
        region: "ap-guangzhou".into(),
        code_uri: "./src".into(),
        include: Vec::new(),
        exclude: Vec::new(),
        events: Vec::new(),
        tags: BTreeMap::new(),
        enable_role_auth: None,
        client_remark: None,
    }
}

pub fn timer_event(name: &str, cron: &str) -> EventSpec {
    EventSpec {
        name: name.into(),
        trigger: TriggerSpec::Timer(TimerTrigger {
            cron_expression: cron.into(),
            enable: true,
            argument: None,
        }),
    }
}

pub fn queue_event(name: &str, topic: &str) -> EventSpec {
    EventSpec {
        name: name.into(),
        trigger: TriggerSpec::Queue(QueueTrigger {
            topic: topic.into(),
            enable: true,
        }),
    }
}

pub fn record_for(event: &EventSpec, trigger_id: &str) -> TriggerRecord {
    TriggerRecord {
        name: event.name.clone(),
        trigger_id: trigger_id.into(),
        spec: event.trigger.clone(),
    }
}

/// Descriptor for a function that already exists remotely.
pub fn descriptor(name: &str) -> FunctionDescriptor {
    FunctionDescriptor {
        identity: FunctionIdentity::new(name, "default", "ap-guangzhou"),
        runtime: "python3.9".into(),
        handler: "index.main".into(),
        memory_size: 128,
        timeout: 3,
        description: String::new(),
        environment: BTreeMap::new(),
        role: None,
        status: FunctionStatus::Ready,
    }
}

/// State committed by an earlier pass that deployed `name` with code `hash`.
pub fn deployed_state(name: &str, hash: &str, triggers: Vec<TriggerRecord>) -> DeployedState {
    DeployedState {
        deployed: Some(DeployedFunction {
            name: name.into(),
            namespace: "default".into(),
            region: "ap-guangzhou".into(),
            runtime: "python3.9".into(),
            handler: "index.main".into(),
            memory_size: 128,
            timeout: 3,
            description: String::new(),
            role: None,
            environment: BTreeMap::new(),
            gateway: Vec::new(),
            client_remark: None,
        }),
        code_fingerprint: Some(Fingerprint::new(hash)),
        artifact: Some(ArtifactLocation {
            bucket: "code".into(),
            key: format!("{name}-0.zip"),
        }),
        triggers,
        deployed_at: None,
    }
}

pub fn gateway_summary(service: &str, method: &str, path: &str) -> GatewaySummary {
    GatewaySummary {
        service_name: service.into(),
        method: method.into(),
        url: format!("https://{service}.gw.example.com/release{path}"),
    }
}

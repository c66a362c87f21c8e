//! Collaborator interfaces consumed by the engine.
//!
//! Credentials, packaging, object-storage transport, the remote function
//! API and the gateway sub-system all live outside this crate. Callers
//! implement these traits on top of their SDKs; keeping them as traits
//! keeps the reconciliation logic testable with mocks.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use scfdeploy_protocol::{
    ArtifactLocation, ConfigUpdate, EventSpec, Fingerprint, FunctionConfig, FunctionDescriptor,
    FunctionIdentity, FunctionStatus, GatewayDeployment, GatewayTrigger, TriggerRecord,
};
use scfdeploy_state::StateStore;
use scfdeploy_transfer::{ProgressObserver, TransferError};

/// Error reported by a collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Boxed future returned by collaborator calls.
pub type ServiceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ServiceError>> + Send + 'a>>;

/// Builds the code archive for a function.
pub trait Packager: Send + Sync {
    /// Archives `source_dir` into `output`, honouring include/exclude globs,
    /// and returns the archive path.
    fn pack<'a>(
        &'a self,
        source_dir: &'a Path,
        include: &'a [String],
        exclude: &'a [String],
        output: &'a Path,
    ) -> ServiceFuture<'a, PathBuf>;
}

/// Computes the content fingerprint of a packaged artifact.
pub trait Fingerprinter: Send + Sync {
    fn fingerprint(&self, artifact: &Path) -> Result<Fingerprint, TransferError>;
}

/// SHA-256 over the archive bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Fingerprinter;

impl Fingerprinter for Sha256Fingerprinter {
    fn fingerprint(&self, artifact: &Path) -> Result<Fingerprint, TransferError> {
        scfdeploy_transfer::fingerprint_file(artifact)
    }
}

/// Object storage holding uploaded code artifacts.
pub trait ObjectStorage: Send + Sync {
    /// Allocates a fresh upload location scoped to `identity`.
    fn artifact_location<'a>(
        &'a self,
        identity: &'a FunctionIdentity,
    ) -> ServiceFuture<'a, ArtifactLocation>;

    fn exists<'a>(&'a self, location: &'a ArtifactLocation) -> ServiceFuture<'a, bool>;

    /// Uploads `artifact`, reporting progress to `observer`.
    fn upload<'a>(
        &'a self,
        location: &'a ArtifactLocation,
        artifact: &'a Path,
        observer: &'a dyn ProgressObserver,
    ) -> ServiceFuture<'a, ()>;
}

/// The remote function service.
pub trait FunctionService: Send + Sync {
    /// Returns `None` when the function does not exist.
    fn get<'a>(
        &'a self,
        identity: &'a FunctionIdentity,
    ) -> ServiceFuture<'a, Option<FunctionDescriptor>>;

    fn create_or_update<'a>(
        &'a self,
        config: &'a FunctionConfig,
    ) -> ServiceFuture<'a, FunctionDescriptor>;

    fn status<'a>(&'a self, identity: &'a FunctionIdentity) -> ServiceFuture<'a, FunctionStatus>;

    /// Deletes the function together with the triggers it owns.
    fn delete<'a>(&'a self, identity: &'a FunctionIdentity) -> ServiceFuture<'a, ()>;

    fn tag<'a>(
        &'a self,
        identity: &'a FunctionIdentity,
        tags: &'a BTreeMap<String, String>,
    ) -> ServiceFuture<'a, ()>;

    /// Makes sure the execution role used by functions exists.
    fn ensure_role<'a>(&'a self, region: &'a str) -> ServiceFuture<'a, ()>;

    /// Applies configuration fields only; code is left untouched.
    fn update_configuration<'a>(&'a self, update: &'a ConfigUpdate) -> ServiceFuture<'a, ()>;

    /// Creates a native trigger and returns its server-assigned id.
    ///
    /// Fails with [`ServiceError::AlreadyExists`] when a trigger with the
    /// same name and kind is already attached to the function.
    fn create_trigger<'a>(
        &'a self,
        identity: &'a FunctionIdentity,
        event: &'a EventSpec,
    ) -> ServiceFuture<'a, String>;

    /// Overwrites an existing native trigger and returns its (possibly new) id.
    ///
    /// The trigger is located by name and kind; `existing.trigger_id` is
    /// empty when no pass has recorded it yet. Fails with
    /// [`ServiceError::NotFound`] when no such trigger exists.
    fn update_trigger<'a>(
        &'a self,
        identity: &'a FunctionIdentity,
        existing: &'a TriggerRecord,
        event: &'a EventSpec,
    ) -> ServiceFuture<'a, String>;

    /// Fails with [`ServiceError::NotFound`] when the trigger is already gone.
    fn delete_trigger<'a>(
        &'a self,
        identity: &'a FunctionIdentity,
        existing: &'a TriggerRecord,
    ) -> ServiceFuture<'a, ()>;
}

/// Everything the gateway sub-system needs to provision one gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    pub service_name: String,
    /// Function the routes forward to.
    pub function: FunctionIdentity,
    /// All gateway triggers declared for `service_name`, in declaration order.
    pub triggers: Vec<GatewayTrigger>,
    /// Correlation tag passed through to the sub-system.
    pub client_remark: String,
}

/// The external gateway sub-system owning delegated triggers.
pub trait GatewayProvisioner: Send + Sync {
    fn provision<'a>(&'a self, request: &'a GatewayRequest)
    -> ServiceFuture<'a, GatewayDeployment>;

    fn deprovision<'a>(
        &'a self,
        service_name: &'a str,
        client_remark: &'a str,
    ) -> ServiceFuture<'a, ()>;
}

/// The full set of collaborators a pass runs against.
#[derive(Clone)]
pub struct Collaborators {
    pub packager: Arc<dyn Packager>,
    pub fingerprinter: Arc<dyn Fingerprinter>,
    pub storage: Arc<dyn ObjectStorage>,
    pub functions: Arc<dyn FunctionService>,
    pub gateway: Arc<dyn GatewayProvisioner>,
    pub state: Arc<dyn StateStore>,
}

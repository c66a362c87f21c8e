//! Trigger reconciliation.
//!
//! Gateway triggers are handed to the gateway sub-system, one call per
//! service name. Every other trigger is native and is diffed by logical key
//! against the records of the last committed pass:
//!
//! | desired | prior | operation |
//! |---------|-------|-----------|
//! | yes     | no    | create    |
//! | yes     | yes   | update    |
//! | no      | yes   | delete    |
//!
//! A failed pass commits nothing, so the next pass may replay operations
//! that already reached the service. Each operation tolerates that.

use futures_util::future::join_all;
use scfdeploy_protocol::{
    EventSpec, FunctionIdentity, GatewaySummary, GatewayTrigger, TriggerKey, TriggerRecord,
    TriggerSpec,
};
use tracing::{debug, error, info};

use crate::error::ReconcileError;
use crate::service::{FunctionService, GatewayProvisioner, GatewayRequest, ServiceError};
use crate::types::{DeployEvent, EventSink, TriggerAction};

/// Gateway triggers sharing one service name.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayGroup {
    pub service_name: String,
    pub triggers: Vec<GatewayTrigger>,
}

/// One native trigger operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NativeOp<'a> {
    Create(&'a EventSpec),
    Update(&'a TriggerRecord, &'a EventSpec),
    Delete(&'a TriggerRecord),
}

impl NativeOp<'_> {
    pub fn action(&self) -> TriggerAction {
        match self {
            NativeOp::Create(_) => TriggerAction::Create,
            NativeOp::Update(..) => TriggerAction::Update,
            NativeOp::Delete(_) => TriggerAction::Delete,
        }
    }

    pub fn key(&self) -> TriggerKey {
        match self {
            NativeOp::Create(event) | NativeOp::Update(_, event) => event.key(),
            NativeOp::Delete(record) => record.key(),
        }
    }
}

/// Everything a trigger pass will do, computed without any I/O.
///
/// Deletes come first, followed by creates and updates in declaration
/// order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerPlan<'a> {
    pub gateways: Vec<GatewayGroup>,
    pub native: Vec<NativeOp<'a>>,
}

impl TriggerPlan<'_> {
    pub fn keys(&self, action: TriggerAction) -> Vec<TriggerKey> {
        self.native
            .iter()
            .filter(|op| op.action() == action)
            .map(NativeOp::key)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty() && self.native.is_empty()
    }
}

/// Splits `desired` into gateway groups and native operations against
/// `prior`. A key declared twice keeps its last declaration.
pub fn plan<'a>(desired: &'a [EventSpec], prior: &'a [TriggerRecord]) -> TriggerPlan<'a> {
    let mut gateways: Vec<GatewayGroup> = Vec::new();
    let mut native: Vec<&'a EventSpec> = Vec::new();

    for event in desired {
        match &event.trigger {
            TriggerSpec::ApiGateway(gw) => {
                match gateways
                    .iter_mut()
                    .find(|g| g.service_name == gw.service_name)
                {
                    Some(group) => group.triggers.push(gw.clone()),
                    None => gateways.push(GatewayGroup {
                        service_name: gw.service_name.clone(),
                        triggers: vec![gw.clone()],
                    }),
                }
            }
            _ => match native.iter().position(|e| e.key() == event.key()) {
                Some(i) => native[i] = event,
                None => native.push(event),
            },
        }
    }

    let mut ops: Vec<NativeOp<'a>> = prior
        .iter()
        .filter(|record| !native.iter().any(|e| e.key() == record.key()))
        .map(NativeOp::Delete)
        .collect();

    for event in native {
        let key = event.key();
        match prior.iter().find(|record| record.key() == key) {
            Some(record) => ops.push(NativeOp::Update(record, event)),
            None => ops.push(NativeOp::Create(event)),
        }
    }

    TriggerPlan {
        gateways,
        native: ops,
    }
}

/// Result of a fully successful trigger pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerOutcome {
    pub records: Vec<TriggerRecord>,
    pub gateway: Vec<GatewaySummary>,
}

/// Applies a [`TriggerPlan`] for one function.
pub struct TriggerReconciler<'a> {
    functions: &'a dyn FunctionService,
    gateway: &'a dyn GatewayProvisioner,
    events: &'a EventSink,
    client_remark: &'a str,
}

impl<'a> TriggerReconciler<'a> {
    pub fn new(
        functions: &'a dyn FunctionService,
        gateway: &'a dyn GatewayProvisioner,
        events: &'a EventSink,
        client_remark: &'a str,
    ) -> Self {
        Self {
            functions,
            gateway,
            events,
            client_remark,
        }
    }

    /// Converges the triggers of `identity` to `desired`.
    ///
    /// Gateway groups are provisioned concurrently and must all succeed
    /// before any native trigger is touched. Native operations are each
    /// attempted; the first failure is returned once all have run.
    pub async fn reconcile(
        &self,
        identity: &FunctionIdentity,
        desired: &[EventSpec],
        prior: &[TriggerRecord],
    ) -> Result<TriggerOutcome, ReconcileError> {
        let plan = plan(desired, prior);
        debug!(
            function = %identity,
            gateways = plan.gateways.len(),
            native_ops = plan.native.len(),
            "trigger plan"
        );

        let gateway = self.provision_gateways(identity, &plan.gateways).await?;
        let records = self.apply_native(identity, &plan.native).await?;

        Ok(TriggerOutcome { records, gateway })
    }

    async fn provision_gateways(
        &self,
        identity: &FunctionIdentity,
        groups: &[GatewayGroup],
    ) -> Result<Vec<GatewaySummary>, ReconcileError> {
        let requests: Vec<GatewayRequest> = groups
            .iter()
            .map(|group| GatewayRequest {
                service_name: group.service_name.clone(),
                function: identity.clone(),
                triggers: group.triggers.clone(),
                client_remark: self.client_remark.to_string(),
            })
            .collect();

        let results = join_all(requests.iter().map(|r| self.gateway.provision(r))).await;

        let mut summaries = Vec::new();
        let mut first_failure = None;
        for (request, result) in requests.iter().zip(results) {
            match result {
                Ok(deployment) => {
                    let endpoints: Vec<GatewaySummary> = deployment
                        .apis
                        .iter()
                        .map(|api| GatewaySummary {
                            service_name: request.service_name.clone(),
                            method: api.method.clone(),
                            url: deployment.url_for(api),
                        })
                        .collect();
                    info!(
                        function = %identity,
                        service = %request.service_name,
                        endpoints = endpoints.len(),
                        "gateway provisioned"
                    );
                    self.events.emit(DeployEvent::GatewayProvisioned {
                        service_name: request.service_name.clone(),
                        endpoints: endpoints.clone(),
                    });
                    summaries.extend(endpoints);
                }
                Err(e) => {
                    error!(
                        function = %identity,
                        service = %request.service_name,
                        error = %e,
                        "gateway provisioning failed"
                    );
                    if first_failure.is_none() {
                        first_failure = Some((request.service_name.clone(), e));
                    }
                }
            }
        }

        match first_failure {
            Some((service, source)) => {
                Err(ReconcileError::DelegatedProvisioning { service, source })
            }
            None => Ok(summaries),
        }
    }

    async fn apply_native(
        &self,
        identity: &FunctionIdentity,
        ops: &[NativeOp<'_>],
    ) -> Result<Vec<TriggerRecord>, ReconcileError> {
        let mut records = Vec::new();
        let mut failed = 0;
        let mut first_failure = None;

        for op in ops {
            let key = op.key();
            let action = op.action();
            match self.apply_op(identity, *op).await {
                Ok(created) => {
                    debug!(function = %identity, trigger = %key, %action, "trigger applied");
                    self.events.emit(DeployEvent::TriggerApplied {
                        trigger: key,
                        action,
                    });
                    records.extend(created);
                }
                Err(e) => {
                    error!(function = %identity, trigger = %key, %action, error = %e, "trigger failed");
                    self.events.emit(DeployEvent::TriggerFailed {
                        trigger: key.clone(),
                        action,
                        error: e.to_string(),
                    });
                    failed += 1;
                    if first_failure.is_none() {
                        first_failure = Some((key, action, e));
                    }
                }
            }
        }

        match first_failure {
            Some((trigger, action, source)) => Err(ReconcileError::TriggerReconciliation {
                trigger,
                action,
                failed,
                source,
            }),
            None => Ok(records),
        }
    }

    /// Applies one operation, tolerating replays after an interrupted pass:
    ///
    /// - a create of a trigger that already exists overwrites it
    /// - an update of a missing trigger recreates it
    /// - a delete of a missing trigger succeeds
    async fn apply_op(
        &self,
        identity: &FunctionIdentity,
        op: NativeOp<'_>,
    ) -> Result<Option<TriggerRecord>, ServiceError> {
        match op {
            NativeOp::Create(event) => {
                let id = match self.functions.create_trigger(identity, event).await {
                    Err(ServiceError::AlreadyExists(_)) => {
                        debug!(function = %identity, trigger = %event.key(), "trigger already exists, overwriting");
                        let leftover = record(event, String::new());
                        self.functions
                            .update_trigger(identity, &leftover, event)
                            .await?
                    }
                    other => other?,
                };
                Ok(Some(record(event, id)))
            }
            NativeOp::Update(existing, event) => {
                let id = match self.functions.update_trigger(identity, existing, event).await {
                    Err(ServiceError::NotFound(_)) => {
                        debug!(function = %identity, trigger = %event.key(), "trigger missing, recreating");
                        self.functions.create_trigger(identity, event).await?
                    }
                    other => other?,
                };
                Ok(Some(record(event, id)))
            }
            NativeOp::Delete(existing) => {
                match self.functions.delete_trigger(identity, existing).await {
                    Ok(()) => Ok(None),
                    Err(ServiceError::NotFound(_)) => {
                        debug!(function = %identity, trigger = %existing.key(), "trigger already gone");
                        Ok(None)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }
}

fn record(event: &EventSpec, trigger_id: String) -> TriggerRecord {
    TriggerRecord {
        name: event.name.clone(),
        trigger_id,
        spec: event.trigger.clone(),
    }
}

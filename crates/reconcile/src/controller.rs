//! Event handling: fetch, lock, run, report

use crate::context::{CancelToken, ResourceStore, StatusReporter};
use crate::error::{ErrorKind, ReconcileError};
use crate::lock::RunLocks;
use crate::pipeline::{PassReport, Pipeline};
use crate::types::{ResourceIdentity, Stage, Status};
use rayon::prelude::*;

/// A resource-changed notification.
#[derive(Debug, Clone)]
pub struct Event {
    /// Resource that changed
    pub identity: ResourceIdentity,
    /// Cancelled when the event is withdrawn
    pub cancel: CancelToken,
}

impl Event {
    /// Event with a fresh cancellation token.
    pub fn new(identity: ResourceIdentity) -> Self {
        Self {
            identity,
            cancel: CancelToken::new(),
        }
    }
}

/// Terminal outcome of handling one event.
#[derive(Debug)]
pub enum Outcome {
    /// The resource no longer exists; nothing to do
    NotFound,
    /// Init and apply succeeded
    Done(Box<PassReport>),
    /// The pass stopped on an error
    Failed(ReconcileError),
}

impl Outcome {
    /// Whether the pass failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Stage that failed, if failed.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::Failed(err) => Some(err.stage()),
            _ => None,
        }
    }

    /// Failure class, if failed.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Failed(err) => Some(err.kind()),
            _ => None,
        }
    }
}

/// Serializes passes per identity and reports their status.
pub struct Controller {
    resources: Box<dyn ResourceStore>,
    status: Box<dyn StatusReporter>,
    pipeline: Pipeline,
    locks: RunLocks,
}

impl Controller {
    /// Controller over `resources`, reporting to `status`.
    pub fn new(
        resources: Box<dyn ResourceStore>,
        status: Box<dyn StatusReporter>,
        pipeline: Pipeline,
    ) -> Self {
        Self {
            resources,
            status,
            pipeline,
            locks: RunLocks::new(),
        }
    }

    /// Handle one event to completion.
    ///
    /// The identity's run lock is held from fetching the spec through
    /// reporting the terminal status.
    pub fn handle(&self, event: &Event) -> Outcome {
        let identity = &event.identity;
        let _guard = self.locks.acquire(identity);

        let spec = match self.resources.fetch(identity) {
            Ok(Some(spec)) => spec,
            Ok(None) => {
                log::info!("{}: resource not found, nothing to reconcile", identity);
                return Outcome::NotFound;
            }
            Err(message) => return self.fail(identity, ReconcileError::Load(message)),
        };

        self.report(identity, &Status::reconciling());
        log::info!("{}: reconciling with terraform {}", identity, spec.toolchain_version);

        match self.pipeline.run(identity, &spec, &event.cancel) {
            Ok(report) => {
                log::info!("{}: applied", identity);
                self.report(identity, &Status::done(&report.toolchain.version));
                Outcome::Done(Box::new(report))
            }
            Err(err) => self.fail(identity, err),
        }
    }

    /// Handle many events on a pool of `jobs` threads.
    ///
    /// Distinct identities run concurrently; repeated identities wait for
    /// each other. Results come back in input order.
    pub fn handle_all(
        &self,
        events: &[Event],
        jobs: usize,
    ) -> Result<Vec<(ResourceIdentity, Outcome)>, rayon::ThreadPoolBuildError> {
        if jobs <= 1 || events.len() <= 1 {
            return Ok(events
                .iter()
                .map(|event| (event.identity.clone(), self.handle(event)))
                .collect());
        }

        let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
        Ok(pool.install(|| {
            events
                .par_iter()
                .map(|event| (event.identity.clone(), self.handle(event)))
                .collect()
        }))
    }

    /// Render the module call of a stored resource.
    pub fn render(&self, identity: &ResourceIdentity) -> Result<Option<String>, ReconcileError> {
        let Some(spec) = self.resources.fetch(identity).map_err(ReconcileError::Load)? else {
            return Ok(None);
        };
        Ok(Some(self.pipeline.render(&spec)?.text))
    }

    fn fail(&self, identity: &ResourceIdentity, err: ReconcileError) -> Outcome {
        log::error!("{}: {} stage failed: {}", identity, err.stage(), err);
        self.report(identity, &Status::failed(err.stage(), err.to_string()));
        Outcome::Failed(err)
    }

    fn report(&self, identity: &ResourceIdentity, status: &Status) {
        if let Err(e) = self.status.report(identity, status) {
            log::warn!("{}: could not record {} status: {}", identity, status.phase, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{MemoryResources, MemoryStatus};
    use crate::engine::ExitOutcome;
    use crate::testing::{Harness, scenario_spec};
    use crate::types::Phase;

    fn controller(harness: &Harness, resources: &MemoryResources, status: &MemoryStatus) -> Controller {
        Controller::new(
            Box::new(resources.clone()),
            Box::new(status.clone()),
            harness.pipeline(),
        )
    }

    #[test]
    fn test_scenario_done_status() {
        let harness = Harness::new(&[]);
        let resources = MemoryResources::new();
        let status = MemoryStatus::new();
        let id = ResourceIdentity::new("app");
        resources.insert(id.clone(), scenario_spec());

        let outcome = controller(&harness, &resources, &status).handle(&Event::new(id.clone()));
        assert!(matches!(outcome, Outcome::Done(_)));

        let history = status.history(&id);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].phase, Phase::Reconciling);
        assert_eq!(history[1].phase, Phase::Done);
        assert_eq!(history[1].toolchain_version.as_deref(), Some("1.5.0"));
    }

    #[test]
    fn test_scenario_failed_status_names_key() {
        let harness = Harness::new(&[]);
        harness.store.fail("kv/data/app:password");
        let resources = MemoryResources::new();
        let status = MemoryStatus::new();
        let id = ResourceIdentity::new("app");
        resources.insert(id.clone(), scenario_spec());

        let outcome = controller(&harness, &resources, &status).handle(&Event::new(id.clone()));
        assert_eq!(outcome.error_kind(), Some(ErrorKind::Resolution));
        assert!(harness.runner.calls().is_empty());

        let latest = status.latest(&id).unwrap();
        assert_eq!(latest.phase, Phase::Failed);
        assert_eq!(latest.stage, Some(Stage::Secrets));
        let reason = latest.reason.unwrap();
        assert!(reason.contains("db_pass"));
        assert!(!reason.contains("s3cr3t"));
    }

    #[test]
    fn test_rejected_login_reported_as_credentials_failure() {
        let harness = Harness::with_rejected_login(&[]);
        let resources = MemoryResources::new();
        let status = MemoryStatus::new();
        let id = ResourceIdentity::new("app");
        resources.insert(id.clone(), scenario_spec());

        let outcome = controller(&harness, &resources, &status).handle(&Event::new(id.clone()));
        assert_eq!(outcome.failed_stage(), Some(Stage::Credentials));
        assert_eq!(outcome.error_kind(), Some(ErrorKind::Resolution));
        assert_eq!(harness.toolchain.calls(), 0);
        assert!(harness.runner.calls().is_empty());

        let latest = status.latest(&id).unwrap();
        assert_eq!(latest.phase, Phase::Failed);
        assert_eq!(latest.stage, Some(Stage::Credentials));
        assert!(latest.reason.unwrap().contains("app-role login"));
    }

    #[test]
    fn test_missing_credentials_reported_at_secrets() {
        let harness = Harness::with_credential(vaultkit::Credential::missing(), &[]);
        let resources = MemoryResources::new();
        let status = MemoryStatus::new();
        let id = ResourceIdentity::new("app");
        resources.insert(id.clone(), scenario_spec());

        let outcome = controller(&harness, &resources, &status).handle(&Event::new(id.clone()));
        assert_eq!(outcome.failed_stage(), Some(Stage::Secrets));

        let reason = status.latest(&id).unwrap().reason.unwrap();
        assert!(!reason.contains("app-role login"));
    }

    #[test]
    fn test_not_found_is_not_an_error() {
        let harness = Harness::new(&[]);
        let status = MemoryStatus::new();
        let id = ResourceIdentity::new("gone");

        let outcome =
            controller(&harness, &MemoryResources::new(), &status).handle(&Event::new(id.clone()));
        assert!(matches!(outcome, Outcome::NotFound));
        assert!(!outcome.is_failed());
        assert!(status.history(&id).is_empty());
        assert!(harness.runner.calls().is_empty());
    }

    #[test]
    fn test_apply_failure_reported() {
        let harness = Harness::new(&[ExitOutcome::Success, ExitOutcome::Failed(Some(1))]);
        let resources = MemoryResources::new();
        let status = MemoryStatus::new();
        let id = ResourceIdentity::new("app");
        resources.insert(id.clone(), scenario_spec());

        let outcome = controller(&harness, &resources, &status).handle(&Event::new(id.clone()));
        assert_eq!(outcome.failed_stage(), Some(Stage::Apply));
        assert_eq!(status.latest(&id).unwrap().stage, Some(Stage::Apply));
    }

    #[test]
    fn test_handle_all_distinct_and_repeated() {
        let harness = Harness::new(&[]);
        let resources = MemoryResources::new();
        let status = MemoryStatus::new();
        for name in ["a", "b", "c"] {
            resources.insert(ResourceIdentity::new(name), scenario_spec());
        }
        let events: Vec<Event> = ["a", "b", "a", "c", "missing"]
            .into_iter()
            .map(|n| Event::new(ResourceIdentity::new(n)))
            .collect();

        let results = controller(&harness, &resources, &status)
            .handle_all(&events, 3)
            .unwrap();

        let names: Vec<&str> = results.iter().map(|(id, _)| id.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "a", "c", "missing"]);
        assert_eq!(results.iter().filter(|(_, o)| matches!(o, Outcome::Done(_))).count(), 4);
        assert!(matches!(results[4].1, Outcome::NotFound));

        // init then apply for each of the four passes, never interleaved per workspace.
        assert_eq!(harness.runner.calls().len(), 8);
        assert_eq!(status.history(&ResourceIdentity::new("a")).len(), 4);
    }

    #[test]
    fn test_render() {
        let harness = Harness::new(&[]);
        let resources = MemoryResources::new();
        let id = ResourceIdentity::new("app");
        resources.insert(id.clone(), scenario_spec());

        let ctl = controller(&harness, &resources, &MemoryStatus::new());
        let text = ctl.render(&id).unwrap().unwrap();
        assert!(text.contains("eu-west-1"));
        assert!(ctl.render(&ResourceIdentity::new("none")).unwrap().is_none());
        assert!(harness.runner.calls().is_empty());
    }
}

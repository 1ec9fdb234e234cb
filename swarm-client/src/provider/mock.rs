//! Mock provider for testing.
//!
//! Keeps an in-memory instance table, lets tests script how long launches
//! take to reach `running`, and records every call for verification.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use swarm_types::InstanceId;

use super::{InstanceDescription, InstanceState, LaunchSpec, Provider, ProviderError};

/// Mock provider for testing.
#[derive(Debug, Default)]
pub struct MockProvider {
    inner: Arc<Mutex<MockProviderInner>>,
}

#[derive(Debug, Default)]
struct MockProviderInner {
    instances: BTreeMap<InstanceId, InstanceDescription>,
    /// Describe calls left before a pending instance turns running.
    pending_polls: BTreeMap<InstanceId, u32>,
    next_id: u32,
    polls_until_running: u32,
    never_running: bool,
    launched: Vec<LaunchSpec>,
    tags: Vec<(InstanceId, String, String)>,
    terminate_requests: Vec<InstanceId>,
    unconfirmed: Vec<InstanceId>,
    security_groups: Vec<(String, String)>,
    fail_next_launch: Option<String>,
    fail_next_describe: Option<String>,
    fail_next_terminate: Option<String>,
}

impl MockProvider {
    /// Create a mock provider with no instances.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance that is already running at `address`.
    pub fn add_running(&self, id: &str, address: &str) {
        let mut inner = self.inner.lock().unwrap();
        let id = InstanceId::new(id);
        inner.instances.insert(
            id.clone(),
            InstanceDescription {
                id,
                state: InstanceState::Running,
                public_address: Some(address.to_string()),
            },
        );
    }

    /// Launched instances stay pending for this many describe calls.
    pub fn set_polls_until_running(&self, polls: u32) {
        self.inner.lock().unwrap().polls_until_running = polls;
    }

    /// Launched instances never leave the pending state.
    pub fn never_reach_running(&self) {
        self.inner.lock().unwrap().never_running = true;
    }

    /// Register a security group visible to `resolve_security_group_ids`.
    pub fn add_security_group(&self, name: &str, id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .security_groups
            .push((name.to_string(), id.to_string()));
    }

    /// Termination of `id` is requested but not confirmed.
    pub fn leave_unconfirmed(&self, id: &str) {
        self.inner
            .lock()
            .unwrap()
            .unconfirmed
            .push(InstanceId::new(id));
    }

    /// Cause the next launch to fail with the given error.
    pub fn fail_next_launch(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_launch = Some(error.to_string());
    }

    /// Cause the next describe to fail with the given error.
    pub fn fail_next_describe(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_describe = Some(error.to_string());
    }

    /// Cause the next terminate to fail with the given error.
    pub fn fail_next_terminate(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_terminate = Some(error.to_string());
    }

    /// Every launch request received.
    pub fn launched(&self) -> Vec<LaunchSpec> {
        self.inner.lock().unwrap().launched.clone()
    }

    /// Every `(instance, key, value)` tag applied.
    pub fn tags(&self) -> Vec<(InstanceId, String, String)> {
        self.inner.lock().unwrap().tags.clone()
    }

    /// Every instance termination was requested for.
    pub fn terminate_requests(&self) -> Vec<InstanceId> {
        self.inner.lock().unwrap().terminate_requests.clone()
    }

    /// Current state of an instance.
    pub fn state_of(&self, id: &str) -> Option<InstanceState> {
        self.inner
            .lock()
            .unwrap()
            .instances
            .get(&InstanceId::new(id))
            .map(|i| i.state.clone())
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn resolve_security_group_ids(
        &self,
        names: &[String],
        _subnet: Option<&str>,
    ) -> Result<Vec<String>, ProviderError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .security_groups
            .iter()
            .filter(|(name, _)| names.contains(name))
            .map(|(_, id)| id.clone())
            .collect())
    }

    async fn launch_instances(
        &self,
        spec: &LaunchSpec,
    ) -> Result<Vec<InstanceDescription>, ProviderError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(error) = inner.fail_next_launch.take() {
            return Err(ProviderError::Rejected {
                operation: "run-instances",
                detail: error,
            });
        }

        inner.launched.push(spec.clone());
        let polls = inner.polls_until_running;
        let mut launched = Vec::with_capacity(spec.count);
        for _ in 0..spec.count {
            let n = inner.next_id;
            inner.next_id += 1;
            let id = InstanceId::new(format!("i-{:04}", n));
            let description = InstanceDescription {
                id: id.clone(),
                state: InstanceState::Pending,
                public_address: None,
            };
            inner.instances.insert(id.clone(), description.clone());
            inner.pending_polls.insert(id, polls);
            launched.push(description);
        }
        Ok(launched)
    }

    async fn describe_instances(
        &self,
        ids: &[InstanceId],
    ) -> Result<Vec<InstanceDescription>, ProviderError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(error) = inner.fail_next_describe.take() {
            return Err(ProviderError::Rejected {
                operation: "describe-instances",
                detail: error,
            });
        }

        let never_running = inner.never_running;
        let mut described = Vec::new();
        for id in ids {
            let ready = match inner.pending_polls.get_mut(id) {
                Some(0) => !never_running,
                Some(left) => {
                    *left -= 1;
                    false
                }
                None => false,
            };
            if ready {
                inner.pending_polls.remove(id);
                if let Some(instance) = inner.instances.get_mut(id) {
                    if instance.state == InstanceState::Pending {
                        instance.state = InstanceState::Running;
                        instance.public_address = Some(format!("{}.bees.test", id));
                    }
                }
            }
            if let Some(instance) = inner.instances.get(id) {
                described.push(instance.clone());
            }
        }
        Ok(described)
    }

    async fn tag_instances(
        &self,
        ids: &[InstanceId],
        tags: &[(String, String)],
    ) -> Result<(), ProviderError> {
        let mut inner = self.inner.lock().unwrap();
        for id in ids {
            for (key, value) in tags {
                inner.tags.push((id.clone(), key.clone(), value.clone()));
            }
        }
        Ok(())
    }

    async fn terminate_instances(
        &self,
        ids: &[InstanceId],
    ) -> Result<Vec<InstanceId>, ProviderError> {
        let mut inner = self.inner.lock().unwrap();
        inner.terminate_requests.extend(ids.iter().cloned());

        if let Some(error) = inner.fail_next_terminate.take() {
            return Err(ProviderError::Rejected {
                operation: "terminate-instances",
                detail: error,
            });
        }

        let mut confirmed = Vec::new();
        for id in ids {
            if inner.unconfirmed.contains(id) {
                continue;
            }
            if let Some(instance) = inner.instances.get_mut(id) {
                instance.state = InstanceState::ShuttingDown;
                confirmed.push(id.clone());
            }
        }
        Ok(confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(count: usize) -> LaunchSpec {
        LaunchSpec {
            image_id: "ami-1".into(),
            instance_type: "t3.micro".into(),
            count,
            key_name: "k".into(),
            security_group_ids: vec![],
            zone: "us-east-1a".into(),
            subnet: None,
        }
    }

    #[tokio::test]
    async fn launched_instances_become_running_after_polls() {
        let provider = MockProvider::new();
        provider.set_polls_until_running(1);

        let launched = provider.launch_instances(&spec(2)).await.unwrap();
        let ids: Vec<InstanceId> = launched.iter().map(|i| i.id.clone()).collect();

        let first = provider.describe_instances(&ids).await.unwrap();
        assert!(first.iter().all(|i| i.state == InstanceState::Pending));

        let second = provider.describe_instances(&ids).await.unwrap();
        assert!(second.iter().all(|i| i.state == InstanceState::Running));
        assert!(second.iter().all(|i| i.public_address.is_some()));
    }

    #[tokio::test]
    async fn terminate_confirms_known_instances() {
        let provider = MockProvider::new();
        provider.add_running("i-a", "a.test");
        provider.add_running("i-b", "b.test");
        provider.leave_unconfirmed("i-b");

        let confirmed = provider
            .terminate_instances(&["i-a".into(), "i-b".into(), "i-zzz".into()])
            .await
            .unwrap();
        assert_eq!(confirmed, vec![InstanceId::new("i-a")]);
        assert_eq!(provider.state_of("i-a"), Some(InstanceState::ShuttingDown));
        assert_eq!(provider.terminate_requests().len(), 3);
    }

    #[tokio::test]
    async fn forced_launch_failure() {
        let provider = MockProvider::new();
        provider.fail_next_launch("InsufficientInstanceCapacity");
        assert!(provider.launch_instances(&spec(1)).await.is_err());
        assert!(provider.launch_instances(&spec(1)).await.is_ok());
    }
}

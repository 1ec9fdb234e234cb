//! EC2 provider backed by the `aws` command line tool.
//!
//! Uses `tokio::process::Command` to shell out to `aws ec2 ... --output json`.
//! Credentials come from the usual AWS CLI configuration.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use swarm_types::InstanceId;

use super::{InstanceDescription, InstanceState, LaunchSpec, Provider, ProviderError};

/// EC2 provider for one region.
#[derive(Debug, Clone)]
pub struct AwsCliProvider {
    region: String,
    program: String,
}

impl AwsCliProvider {
    /// Create a provider for `region` (e.g. `us-east-1`).
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            program: "aws".to_string(),
        }
    }

    /// Use a different executable than `aws` on `PATH`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Region every call is made against.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Run one `aws ec2` subcommand and decode its JSON output.
    async fn call<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        args: &[String],
    ) -> Result<T, ProviderError> {
        let stdout = self.call_raw(operation, args).await?;
        serde_json::from_str(&stdout).map_err(|e| ProviderError::InvalidResponse {
            operation,
            detail: e.to_string(),
        })
    }

    async fn call_raw(
        &self,
        operation: &'static str,
        args: &[String],
    ) -> Result<String, ProviderError> {
        tracing::debug!("aws ec2 {} {}", operation, args.join(" "));
        let output = tokio::process::Command::new(&self.program)
            .arg("ec2")
            .arg(operation)
            .args(["--region", self.region.as_str(), "--output", "json"])
            .args(args)
            .output()
            .await?;

        if !output.status.success() {
            return Err(ProviderError::Rejected {
                operation,
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SecurityGroupsResponse {
    #[serde(default)]
    security_groups: Vec<SecurityGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SecurityGroup {
    group_name: String,
    group_id: String,
    #[serde(default)]
    vpc_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RunInstancesResponse {
    #[serde(default)]
    instances: Vec<Instance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstancesResponse {
    #[serde(default)]
    reservations: Vec<Reservation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Reservation {
    #[serde(default)]
    instances: Vec<Instance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Instance {
    instance_id: String,
    state: StateName,
    #[serde(default)]
    public_dns_name: Option<String>,
    #[serde(default)]
    public_ip_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StateName {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TerminateInstancesResponse {
    #[serde(default)]
    terminating_instances: Vec<TerminatingInstance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TerminatingInstance {
    instance_id: String,
}

impl From<Instance> for InstanceDescription {
    fn from(instance: Instance) -> Self {
        let public_address = instance
            .public_dns_name
            .filter(|name| !name.is_empty())
            .or(instance.public_ip_address)
            .filter(|addr| !addr.is_empty());
        InstanceDescription {
            id: InstanceId::new(instance.instance_id),
            state: InstanceState::from_name(&instance.state.name),
            public_address,
        }
    }
}

fn id_args(flag: &str, ids: &[InstanceId]) -> Vec<String> {
    std::iter::once(flag.to_string())
        .chain(ids.iter().map(|id| id.to_string()))
        .collect()
}

/// Security groups matching `names`; with a subnet only VPC groups count.
fn matching_group_ids(
    groups: Vec<SecurityGroup>,
    names: &[String],
    subnet: Option<&str>,
) -> Vec<String> {
    groups
        .into_iter()
        .filter(|g| names.iter().any(|n| *n == g.group_name))
        .filter(|g| subnet.is_none() || g.vpc_id.is_some())
        .map(|g| g.group_id)
        .collect()
}

#[async_trait]
impl Provider for AwsCliProvider {
    async fn resolve_security_group_ids(
        &self,
        names: &[String],
        subnet: Option<&str>,
    ) -> Result<Vec<String>, ProviderError> {
        // Groups inside a VPC cannot be looked up by name, so list them all.
        let response: SecurityGroupsResponse =
            self.call("describe-security-groups", &[]).await?;
        Ok(matching_group_ids(response.security_groups, names, subnet))
    }

    async fn launch_instances(
        &self,
        spec: &LaunchSpec,
    ) -> Result<Vec<InstanceDescription>, ProviderError> {
        let mut args = vec![
            "--image-id".to_string(),
            spec.image_id.clone(),
            "--count".to_string(),
            format!("{}:{}", spec.count, spec.count),
            "--instance-type".to_string(),
            spec.instance_type.clone(),
            "--key-name".to_string(),
            spec.key_name.clone(),
            "--placement".to_string(),
            format!("AvailabilityZone={}", spec.zone),
        ];
        if !spec.security_group_ids.is_empty() {
            args.push("--security-group-ids".to_string());
            args.extend(spec.security_group_ids.iter().cloned());
        }
        if let Some(subnet) = &spec.subnet {
            args.push("--subnet-id".to_string());
            args.push(subnet.clone());
        }

        let response: RunInstancesResponse = self.call("run-instances", &args).await?;
        Ok(response.instances.into_iter().map(Into::into).collect())
    }

    async fn describe_instances(
        &self,
        ids: &[InstanceId],
    ) -> Result<Vec<InstanceDescription>, ProviderError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let response: DescribeInstancesResponse = self
            .call("describe-instances", &id_args("--instance-ids", ids))
            .await?;
        Ok(response
            .reservations
            .into_iter()
            .flat_map(|r| r.instances)
            .map(Into::into)
            .collect())
    }

    async fn tag_instances(
        &self,
        ids: &[InstanceId],
        tags: &[(String, String)],
    ) -> Result<(), ProviderError> {
        if ids.is_empty() || tags.is_empty() {
            return Ok(());
        }
        let mut args = id_args("--resources", ids);
        args.push("--tags".to_string());
        args.extend(tags.iter().map(|(k, v)| format!("Key={},Value={}", k, v)));
        // create-tags prints nothing on success.
        self.call_raw("create-tags", &args).await?;
        Ok(())
    }

    async fn terminate_instances(
        &self,
        ids: &[InstanceId],
    ) -> Result<Vec<InstanceId>, ProviderError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let response: TerminateInstancesResponse = self
            .call("terminate-instances", &id_args("--instance-ids", ids))
            .await?;
        Ok(response
            .terminating_instances
            .into_iter()
            .map(|t| InstanceId::new(t.instance_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_response_flattens_reservations() {
        let json = r#"{
            "Reservations": [
                {"Instances": [
                    {"InstanceId": "i-1", "State": {"Code": 16, "Name": "running"},
                     "PublicDnsName": "ec2-1.compute.amazonaws.com", "PublicIpAddress": "1.2.3.4"}
                ]},
                {"Instances": [
                    {"InstanceId": "i-2", "State": {"Code": 0, "Name": "pending"}, "PublicDnsName": ""}
                ]}
            ]
        }"#;
        let response: DescribeInstancesResponse = serde_json::from_str(json).unwrap();
        let described: Vec<InstanceDescription> = response
            .reservations
            .into_iter()
            .flat_map(|r| r.instances)
            .map(Into::into)
            .collect();

        assert_eq!(described.len(), 2);
        assert_eq!(described[0].state, InstanceState::Running);
        assert_eq!(
            described[0].public_address.as_deref(),
            Some("ec2-1.compute.amazonaws.com")
        );
        assert_eq!(described[1].state, InstanceState::Pending);
        assert_eq!(described[1].public_address, None);
    }

    #[test]
    fn ip_address_used_when_dns_name_empty() {
        let instance = Instance {
            instance_id: "i-3".into(),
            state: StateName {
                name: "running".into(),
            },
            public_dns_name: Some(String::new()),
            public_ip_address: Some("10.0.0.7".into()),
        };
        let described = InstanceDescription::from(instance);
        assert_eq!(described.public_address.as_deref(), Some("10.0.0.7"));
    }

    #[test]
    fn security_groups_filtered_by_name_and_vpc() {
        let json = r#"{"SecurityGroups": [
            {"GroupName": "public", "GroupId": "sg-classic"},
            {"GroupName": "public", "GroupId": "sg-vpc", "VpcId": "vpc-1"},
            {"GroupName": "other", "GroupId": "sg-other", "VpcId": "vpc-1"}
        ]}"#;
        let names = vec!["public".to_string()];

        let response: SecurityGroupsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            matching_group_ids(response.security_groups, &names, None),
            vec!["sg-classic", "sg-vpc"]
        );

        let response: SecurityGroupsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            matching_group_ids(response.security_groups, &names, Some("subnet-1")),
            vec!["sg-vpc"]
        );
    }

    #[test]
    fn terminate_response_lists_ids() {
        let json = r#"{"TerminatingInstances": [
            {"InstanceId": "i-1", "CurrentState": {"Name": "shutting-down"}},
            {"InstanceId": "i-2", "CurrentState": {"Name": "shutting-down"}}
        ]}"#;
        let response: TerminateInstancesResponse = serde_json::from_str(json).unwrap();
        let ids: Vec<String> = response
            .terminating_instances
            .into_iter()
            .map(|t| t.instance_id)
            .collect();
        assert_eq!(ids, vec!["i-1", "i-2"]);
    }

    #[test]
    fn id_args_prefix_flag() {
        let ids = vec![InstanceId::new("i-1"), InstanceId::new("i-2")];
        assert_eq!(id_args("--instance-ids", &ids), vec!["--instance-ids", "i-1", "i-2"]);
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let provider = AwsCliProvider::new("us-east-1").with_program("/nonexistent/aws-cli-xyz");
        let result = provider.describe_instances(&[InstanceId::new("i-1")]).await;
        assert!(matches!(result, Err(ProviderError::Spawn(_))));
    }
}

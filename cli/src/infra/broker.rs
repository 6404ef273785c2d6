//! Broker infrastructure: implements the broker ports over the delivery
//! controller's HTTP admin API using `ureq` on a blocking worker.

use std::io::Read;
use std::time::Duration;

use serde::Serialize;

use crate::application::ports::{MachineCommands, MachineInventory};
use crate::domain::machine::MachineRecord;
use crate::domain::remediation::DISABLE_MAINTENANCE_LABEL;
use crate::domain::{CommandError, ConnectionError, Machine, PowerAction};

/// Largest error body kept in a `CommandError`.
const MAX_ERROR_DETAIL: u64 = 512;

/// Delivery controller client. Built once per run and passed to every call.
#[derive(Clone)]
pub struct HttpBrokerClient {
    agent: ureq::Agent,
    base_url: String,
    address: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PowerActionBody<'a> {
    machine_name: &'a str,
    action: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MaintenanceModeBody<'a> {
    machine_name: &'a str,
    enabled: bool,
}

impl HttpBrokerClient {
    /// Create a client for `http://{host}:{port}/api/v1` with a per-call timeout.
    #[must_use]
    pub fn new(host: &str, port: u16, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout(timeout)
            .user_agent(concat!("remediate/", env!("CARGO_PKG_VERSION")))
            .build();
        let address = format!("{host}:{port}");
        Self {
            agent,
            base_url: format!("http://{address}/api/v1"),
            address,
        }
    }

    async fn post_command(
        &self,
        machine: &str,
        command: &str,
        path: &str,
        body: String,
    ) -> Result<(), CommandError> {
        let agent = self.agent.clone();
        let url = format!("{}/{path}", self.base_url);
        tracing::debug!(%url, machine, command, "sending broker command");
        let result = tokio::task::spawn_blocking(move || {
            agent
                .post(&url)
                .set("Content-Type", "application/json")
                .send_string(&body)
        })
        .await;

        match result {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(ureq::Error::Status(status, response))) => Err(CommandError::Rejected {
                machine: machine.to_string(),
                command: command.to_string(),
                status,
                detail: error_detail(response),
            }),
            Ok(Err(ureq::Error::Transport(t))) => Err(CommandError::Transport {
                machine: machine.to_string(),
                command: command.to_string(),
                reason: t.to_string(),
            }),
            Err(e) => Err(CommandError::Transport {
                machine: machine.to_string(),
                command: command.to_string(),
                reason: format!("spawn_blocking panicked: {e}"),
            }),
        }
    }
}

impl MachineInventory for HttpBrokerClient {
    async fn list_machines(&self) -> Result<Vec<Machine>, ConnectionError> {
        let agent = self.agent.clone();
        let url = format!("{}/machines", self.base_url);
        let address = self.address.clone();
        tracing::debug!(%url, "querying machine inventory");

        let result = tokio::task::spawn_blocking(move || {
            let response = agent
                .get(&url)
                .query("deliveryType", "AppsOnly")
                .set("Accept", "application/json")
                .call()?;
            response.into_string().map_err(ureq::Error::from)
        })
        .await
        .map_err(|e| ConnectionError::Unreachable {
            address: self.address.clone(),
            reason: format!("spawn_blocking panicked: {e}"),
        })?;

        match result {
            Ok(body) => parse_inventory(&address, &body),
            Err(e) => Err(classify_inventory_error(&address, e)),
        }
    }

    fn address(&self) -> String {
        self.address.clone()
    }
}

impl MachineCommands for HttpBrokerClient {
    async fn power_action(&self, machine: &str, action: PowerAction) -> Result<(), CommandError> {
        let body = to_json(&PowerActionBody {
            machine_name: machine,
            action: action.as_wire(),
        });
        self.post_command(machine, action.as_wire(), "power-actions", body)
            .await
    }

    async fn disable_maintenance_mode(&self, machine: &str) -> Result<(), CommandError> {
        let body = to_json(&MaintenanceModeBody {
            machine_name: machine,
            enabled: false,
        });
        self.post_command(machine, DISABLE_MAINTENANCE_LABEL, "maintenance-mode", body)
            .await
    }
}

/// Decode the inventory response body.
///
/// # Errors
///
/// Returns `ConnectionError::InvalidResponse` if the body is not a JSON array
/// of machine records.
pub fn parse_inventory(address: &str, body: &str) -> Result<Vec<Machine>, ConnectionError> {
    let records: Vec<MachineRecord> =
        serde_json::from_str(body).map_err(|e| ConnectionError::InvalidResponse {
            address: address.to_string(),
            reason: e.to_string(),
        })?;
    Ok(records.into_iter().map(Machine::from).collect())
}

/// Map a failed inventory call onto the connection error taxonomy.
#[must_use]
pub fn classify_inventory_error(address: &str, err: ureq::Error) -> ConnectionError {
    match err {
        ureq::Error::Status(status @ (401 | 403), _) => ConnectionError::Unauthorized {
            address: address.to_string(),
            status,
        },
        ureq::Error::Status(status, _) => ConnectionError::UnexpectedStatus {
            address: address.to_string(),
            status,
        },
        ureq::Error::Transport(t) => ConnectionError::Unreachable {
            address: address.to_string(),
            reason: t.to_string(),
        },
    }
}

fn error_detail(response: ureq::Response) -> String {
    let mut detail = String::new();
    let _ = response
        .into_reader()
        .take(MAX_ERROR_DETAIL)
        .read_to_string(&mut detail);
    let detail = detail.trim();
    if detail.is_empty() {
        "no details".to_string()
    } else {
        detail.to_string()
    }
}

fn to_json(body: &impl Serialize) -> String {
    // Plain structs of strings and bools always serialize.
    serde_json::to_string(body).unwrap_or_default()
}

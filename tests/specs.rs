//! Black-box specs against the real `hvfleetd` binary.
//!
//! Each test spawns the daemon as a subprocess with `HVFLEET_DUMMY_DATA=true`
//! (the same fake-backed session factory and remote agent the binary wires
//! for local/dev use, see `hvfleet-transport`'s `test-support` feature) and
//! drives it over HTTP, so these exercise the real router, auth extractor,
//! and job/inventory services together rather than any one crate in
//! isolation.

use std::net::TcpListener;
use std::process::Stdio;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::process::{Child, Command};
use tokio::time::Instant;

const SPEC_WAIT_MAX: Duration = Duration::from_secs(5);

/// A running `hvfleetd` subprocess bound to a scratch port, killed on drop.
struct Daemon {
    child: Child,
    base_url: String,
    client: reqwest::Client,
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
}

impl Daemon {
    /// Starts the daemon with dummy data enabled and auth disabled, plus
    /// whatever extra `HVFLEET_*` overrides the test needs.
    async fn start(extra_env: &[(&str, &str)]) -> Self {
        let port = free_port();
        let addr = format!("127.0.0.1:{port}");

        let mut command = Command::new(assert_cmd::cargo::cargo_bin("hvfleetd"));
        command
            .env("HVFLEET_LISTEN_ADDR", &addr)
            .env("HVFLEET_DUMMY_DATA", "true")
            .env("HVFLEET_AUTH_ENABLED", "false")
            .env("HVFLEET_HYPERV_HOSTS", "hv-test-01,hv-test-02")
            .env("HVFLEET_INVENTORY_REFRESH_INTERVAL_SECS", "1")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in extra_env {
            command.env(key, value);
        }

        let child = command.spawn().expect("hvfleetd should spawn");
        let daemon = Daemon { child, base_url: format!("http://{addr}"), client: reqwest::Client::new() };
        daemon.wait_ready().await;
        daemon
    }

    /// Polls `/healthz` until it answers or the process exits early.
    async fn wait_ready(&self) {
        let deadline = Instant::now() + SPEC_WAIT_MAX;
        loop {
            if let Ok(resp) = self.client.get(self.url("/healthz")).send().await {
                if resp.status().is_success() {
                    return;
                }
            }
            assert!(Instant::now() < deadline, "hvfleetd never became reachable on {}", self.base_url);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn wait_until_ready_for_traffic(&self) {
        let deadline = Instant::now() + SPEC_WAIT_MAX;
        loop {
            let resp = self.client.get(self.url("/readyz")).send().await;
            if let Ok(resp) = resp {
                if resp.status().is_success() {
                    return;
                }
            }
            assert!(Instant::now() < deadline, "hvfleetd never reached readyz=ready");
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Polls `GET /api/v1/jobs/{id}` until the job reaches a terminal status.
    async fn wait_for_job_completion(&self, job_id: &str) -> Value {
        let deadline = Instant::now() + SPEC_WAIT_MAX;
        loop {
            let job: Value = self
                .client
                .get(self.url(&format!("/api/v1/jobs/{job_id}")))
                .send()
                .await
                .expect("job lookup should succeed")
                .json()
                .await
                .expect("job response should be json");
            let status = job["status"].as_str().unwrap_or_default();
            if status == "completed" || status == "failed" {
                return job;
            }
            assert!(Instant::now() < deadline, "job {job_id} never reached a terminal status, last seen: {job}");
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.child.start_kill();
    }
}

#[tokio::test]
async fn healthz_is_reachable_and_readyz_reports_ready_once_inventory_has_run() {
    let daemon = Daemon::start(&[]).await;

    let health: Value = daemon.client.get(daemon.url("/healthz")).send().await.unwrap().json().await.unwrap();
    assert_eq!(health["status"], "ok");

    daemon.wait_until_ready_for_traffic().await;
}

#[tokio::test]
async fn inventory_endpoints_list_the_configured_dummy_hosts() {
    let daemon = Daemon::start(&[]).await;
    daemon.wait_until_ready_for_traffic().await;

    let hosts: Value = daemon.client.get(daemon.url("/api/v1/hosts")).send().await.unwrap().json().await.unwrap();
    let names: Vec<&str> = hosts.as_array().unwrap().iter().map(|h| h["hostname"].as_str().unwrap()).collect();
    assert!(names.contains(&"hv-test-01"), "hosts response was {hosts}");
    assert!(names.contains(&"hv-test-02"), "hosts response was {hosts}");
}

#[tokio::test]
async fn a_submitted_vm_create_job_round_trips_to_completed_over_http() {
    let daemon = Daemon::start(&[]).await;
    daemon.wait_until_ready_for_traffic().await;

    let job: Value = daemon
        .client
        .post(daemon.url("/api/v1/vms/create"))
        .json(&json!({ "target_host": "hv-test-01", "vm_spec": { "name": "spec-vm-01", "cpu_cores": 2, "memory_gb": 4.0 } }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(job["status"], "pending");
    assert_eq!(job["job_type"], "provision_vm");

    let job_id = job["job_id"].as_str().unwrap();
    let completed = daemon.wait_for_job_completion(job_id).await;
    assert_eq!(completed["status"], "completed", "job ended as {completed}");
}

#[tokio::test]
async fn a_managed_deployment_chains_domain_join_after_initialize() {
    let daemon = Daemon::start(&[]).await;
    daemon.wait_until_ready_for_traffic().await;

    let job: Value = daemon
        .client
        .post(daemon.url("/api/v1/deployments"))
        .json(&json!({
            "target_host": "hv-test-01",
            "vm_spec": { "name": "spec-vm-02", "cpu_cores": 2, "memory_gb": 4.0 },
            "guest_config": {
                "guest_la_uid": "localadmin",
                "guest_la_pw": "super-secret",
                "domain_target": "CORP",
                "domain_uid": "joiner",
                "domain_pw": "join-secret",
                "domain_ou": "OU=Servers,DC=corp,DC=example",
            },
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let job_id = job["job_id"].as_str().unwrap();
    let completed = daemon.wait_for_job_completion(job_id).await;

    let children = completed["child_jobs"].as_array().cloned().unwrap_or_default();
    assert!(!children.is_empty(), "managed deployment should record child jobs: {completed}");
    let steps: Vec<&str> = children.iter().map(|c| c["step"].as_str().unwrap()).collect();
    let create_pos = steps.iter().position(|s| *s == "vm.create").expect("vm.create step present");
    let init_pos = steps.iter().position(|s| *s == "initialize").expect("initialize step present, carrying guest config and domain join");
    assert!(create_pos < init_pos, "the VM must be created before guest config/domain join runs, got steps {steps:?}");
}

#[tokio::test]
async fn notifications_list_and_mark_read_round_trip_over_http() {
    let daemon = Daemon::start(&[]).await;
    daemon.wait_until_ready_for_traffic().await;

    // Submitting a job against a host that never responds to inventory
    // collection isn't needed here; a disconnect notification is raised by
    // the dummy fleet the moment a collection cycle observes a failure, but
    // since the fakes default to success we instead just exercise the read
    // path end to end against whatever the feed currently holds.
    let unread: Value = daemon.client.get(daemon.url("/api/v1/notifications/unread")).send().await.unwrap().json().await.unwrap();
    assert!(unread.is_array());

    let changed: Value =
        daemon.client.post(daemon.url("/api/v1/notifications/read-all")).send().await.unwrap().json().await.unwrap();
    assert!(changed["changed"].is_number());

    let unread_after: Value = daemon.client.get(daemon.url("/api/v1/notifications/unread")).send().await.unwrap().json().await.unwrap();
    assert_eq!(unread_after.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn requests_without_a_credential_are_rejected_when_auth_is_enabled() {
    let daemon = Daemon::start(&[("HVFLEET_AUTH_ENABLED", "true"), ("HVFLEET_API_TOKEN", "spec-token"), ("HVFLEET_ALLOW_DEV_AUTH", "false")]).await;
    daemon.wait_until_ready_for_traffic().await;

    let resp = daemon.client.get(daemon.url("/api/v1/hosts")).send().await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

    let authed = daemon
        .client
        .get(daemon.url("/api/v1/hosts"))
        .bearer_auth("spec-token")
        .send()
        .await
        .unwrap();
    assert_eq!(authed.status(), reqwest::StatusCode::OK);

    let wrong_token = daemon.client.get(daemon.url("/api/v1/hosts")).bearer_auth("not-the-token").send().await.unwrap();
    assert_eq!(wrong_token.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_configuration_fails_startup_before_binding_a_listener() {
    let port = free_port();
    let mut command = Command::new(assert_cmd::cargo::cargo_bin("hvfleetd"));
    command
        .env("HVFLEET_LISTEN_ADDR", format!("127.0.0.1:{port}"))
        .env("HVFLEET_JOB_WORKER_CONCURRENCY", "0")
        .env("HVFLEET_SCHEDULER_MIN_WORKERS", "8")
        .env("HVFLEET_SCHEDULER_MAX_WORKERS", "2")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = command.output().await.expect("hvfleetd should run to completion");
    assert!(!output.status.success(), "hvfleetd should exit nonzero on invalid configuration");

    // Both violations must be present in the one reported error, not just
    // whichever was checked first.
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("job_worker_concurrency"), "stderr was: {stderr}");
    assert!(stderr.contains("scheduler_max_workers"), "stderr was: {stderr}");

    // Nothing should be listening on the port we picked.
    assert!(TcpListener::bind(format!("127.0.0.1:{port}")).is_ok(), "listener must not have bound after a failed config load");
}

/// Application lifecycle control across deployment methods
///
/// The controller never holds a handle to the application process:
/// starts are fire-and-forget (or delegated to pm2/compose/kubectl),
/// and status/health/logs are independent out-of-band observations.

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::{DeployMethod, StopMethod};
use crate::core::exec::CommandRunner;
use crate::core::health::HealthMonitor;
use crate::utils::{format_duration, APP_NAME, K8S_NAMESPACE};

pub struct LifecycleManager<'a> {
    root: PathBuf,
    runner: &'a dyn CommandRunner,
    health: &'a HealthMonitor,
}

impl<'a> LifecycleManager<'a> {
    pub fn new(
        root: impl Into<PathBuf>,
        runner: &'a dyn CommandRunner,
        health: &'a HealthMonitor,
    ) -> Self {
        Self {
            root: root.into(),
            runner,
            health,
        }
    }

    pub async fn start(&self, method: DeployMethod) -> Result<bool> {
        match method {
            DeployMethod::Docker => self.start_docker().await,
            DeployMethod::Kubernetes => self.start_kubernetes(),
            DeployMethod::Traditional => self.start_traditional().await,
        }
    }

    async fn start_docker(&self) -> Result<bool> {
        println!("Starting with Docker Compose...");

        if !self.root.join("docker-compose.yml").exists() {
            println!("docker-compose.yml not found");
            return Ok(false);
        }

        let up = self.runner.run("docker-compose", &["up", "-d"])?;
        if !up.status_ok {
            println!("Docker start failed: {}", up.stderr.trim());
            return Ok(false);
        }
        println!("Docker containers started");

        Ok(self.health.wait_for_health().await)
    }

    async fn start_traditional(&self) -> Result<bool> {
        println!("Starting as a direct process...");

        if !self.root.join(".next").exists() {
            println!("Building application...");
            let build = self.runner.run("pnpm", &["build"])?;
            if !build.status_ok {
                println!("Build failed: {}", build.stderr.trim());
                return Ok(false);
            }
        }

        if self.runner.which("pm2") {
            println!("Starting with pm2...");
            let start = self
                .runner
                .run("pm2", &["start", "pnpm", "--name", APP_NAME, "--", "start"])?;
            if !start.status_ok {
                println!("pm2 start failed: {}", start.stderr.trim());
                return Ok(false);
            }
            self.runner.run("pm2", &["save"])?;
        } else {
            println!("Starting with pnpm...");
            self.runner.spawn_detached("pnpm", &["start"])?;
        }
        println!("Application started");

        Ok(self.health.wait_for_health().await)
    }

    fn start_kubernetes(&self) -> Result<bool> {
        println!("Deploying to Kubernetes...");

        let namespace = format!("--namespace={}", K8S_NAMESPACE);
        let apply = self
            .runner
            .run("kubectl", &["apply", "-f", "k8s/", &namespace])?;
        if !apply.status_ok {
            println!("Kubernetes deployment failed: {}", apply.stderr.trim());
            return Ok(false);
        }
        println!("Kubernetes deployment created");

        // The readiness gate stands in for the HTTP health wait
        println!("Waiting for pods to be ready...");
        let selector = format!("app={}", APP_NAME);
        let wait = self.runner.run(
            "kubectl",
            &[
                "wait",
                "--for=condition=ready",
                "pod",
                "-l",
                &selector,
                "--timeout=300s",
                &namespace,
            ],
        )?;
        if !wait.status_ok {
            println!("Pods did not become ready: {}", wait.stderr.trim());
            return Ok(false);
        }

        println!("Kubernetes deployment ready");
        Ok(true)
    }

    pub fn stop(&self, method: StopMethod) -> Result<bool> {
        match method {
            StopMethod::Docker => {
                let down = self.runner.run("docker-compose", &["down"])?;
                if !down.status_ok {
                    println!("Docker stop failed: {}", down.stderr.trim());
                    return Ok(false);
                }
                println!("Docker containers stopped");
                Ok(true)
            }
            StopMethod::Traditional => {
                if self.runner.which("pm2") {
                    // Best-effort: the process may already be gone
                    let _ = self.runner.run("pm2", &["stop", APP_NAME]);
                    let _ = self.runner.run("pm2", &["delete", APP_NAME]);
                }
                println!("Application stopped");
                Ok(true)
            }
        }
    }

    pub async fn restart(&self, method: StopMethod) -> Result<bool> {
        println!("Restarting application...");
        self.stop(method)?;
        tokio::time::sleep(Duration::from_secs(2)).await;
        self.start(method.into()).await
    }

    pub async fn status(&self) -> Result<()> {
        println!("Checking application status...\n");

        match self.health.check_health().await {
            Some(health) => {
                println!("Application: Running");
                println!("   Status: {}", health.status);
                println!("   Uptime: {}", format_duration(health.uptime as u64));
            }
            None => println!("Application: Not running or unhealthy"),
        }

        if let Some(ready) = self.health.check_ready().await {
            println!("Database: {}", ready.database);
        }

        if self.runner.which("docker-compose") {
            let ps = self.runner.run("docker-compose", &["ps"])?;
            if ps.status_ok && !ps.stdout.trim().is_empty() {
                println!("\nDocker Containers:");
                print!("{}", ps.stdout);
            }
        }

        Ok(())
    }

    pub fn logs(&self, follow: bool, lines: usize) -> Result<()> {
        println!("Viewing logs (last {} lines)...", lines);

        let lines_arg = lines.to_string();

        if self.runner.which("pm2") {
            let mut args = vec!["logs", APP_NAME];
            if !follow {
                args.extend(["--lines", &lines_arg, "--nostream"]);
            }
            self.runner.run_streaming("pm2", &args, &[])?;
        } else if self.root.join("docker-compose.yml").exists() {
            let mut args = vec!["logs"];
            if follow {
                args.push("-f");
            } else {
                args.extend(["--tail", &lines_arg]);
            }
            args.push(APP_NAME);
            self.runner.run_streaming("docker-compose", &args, &[])?;
        } else {
            println!("No logs available");
        }

        Ok(())
    }

    /// Run the app in the foreground with verbose debugging enabled
    pub fn debug(&self) -> Result<()> {
        println!("Starting in debug mode...");
        self.runner.run_streaming(
            "pnpm",
            &["dev"],
            &[("NODE_ENV", "development"), ("DEBUG", "*")],
        )?;
        Ok(())
    }
}

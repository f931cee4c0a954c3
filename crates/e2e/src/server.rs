//! Application server lifecycle - process-group spawn, readiness, teardown

use std::collections::HashMap;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{HarnessError, HarnessResult};

/// Handle to the application server's process group
pub struct ServerHandle {
    child: Child,
    pgid: Pid,
    base_url: String,
    ready_timeout: Duration,
    stopped: bool,
}

impl ServerHandle {
    /// Spawn the server command as a new process-group leader, so nested
    /// tooling (package manager, bundler, dev server) shares one
    /// terminable group.
    pub fn start(config: ServerConfig) -> HarnessResult<Self> {
        info!("Starting application server: {}", config.command);

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&config.command)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0);

        let child = cmd.spawn().map_err(|e| {
            HarnessError::ServerStartup(format!("failed to spawn `{}`: {}", config.command, e))
        })?;

        let pgid = Pid::from_raw(child.id() as i32);
        debug!("Server process group {} started", pgid);

        Ok(Self {
            child,
            pgid,
            base_url: config.base_url,
            ready_timeout: config.ready_timeout,
            stopped: false,
        })
    }

    /// Poll the base URL until the server answers. The bound is the fixed
    /// warm-up the original flow budgeted; exceeding it is fatal.
    pub async fn wait_until_ready(&self) -> HarnessResult<()> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0usize;

        while start.elapsed() < self.ready_timeout {
            attempts += 1;

            match client.get(&self.base_url).send().await {
                Ok(resp) => {
                    debug!(
                        "Server answered {} after {} attempt(s)",
                        resp.status(),
                        attempts
                    );
                    return Ok(());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for server at {}...", self.base_url);
                    }
                    // Connection refused is expected while the server boots
                    if !e.is_connect() && !e.is_timeout() {
                        warn!("Readiness probe error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(250)).await;
        }

        Err(HarnessError::ServerUnreachable {
            url: self.base_url.clone(),
            waited: self.ready_timeout,
        })
    }

    /// Base URL the server listens on
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Kill the whole process tree. Idempotent: a second call, or a tree
    /// that already exited, is success.
    pub fn stop(&mut self) -> HarnessResult<()> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;

        info!("Stopping server process group {}", self.pgid);

        let root = Pid::from_raw(self.child.id() as i32);
        for pid in descendants_of(root) {
            let _ = kill(pid, Signal::SIGKILL);
        }

        // The group kill catches anything the /proc walk raced against.
        match killpg(self.pgid, Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => warn!("killpg({}) failed: {}", self.pgid, e),
        }

        let _ = self.child.kill();
        let _ = self.child.wait();
        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Configuration for launching the application server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Shell command that starts the dev server
    pub command: String,

    /// Base URL the server listens on once up
    pub base_url: String,

    /// Worst-case bound on startup
    pub ready_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: "pnpm run dev".to_string(),
            base_url: "http://localhost:5173".to_string(),
            ready_timeout: Duration::from_secs(15),
        }
    }
}

/// Collect every live descendant of `root` by walking /proc parent links.
fn descendants_of(root: Pid) -> Vec<Pid> {
    let mut children: HashMap<i32, Vec<i32>> = HashMap::new();

    if let Ok(entries) = std::fs::read_dir("/proc") {
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(pid) = name.to_str().and_then(|s| s.parse::<i32>().ok()) else {
                continue;
            };
            if let Some(ppid) = parent_of(pid) {
                children.entry(ppid).or_default().push(pid);
            }
        }
    }

    let mut out = Vec::new();
    let mut stack = vec![root.as_raw()];
    while let Some(pid) = stack.pop() {
        if let Some(kids) = children.get(&pid) {
            for &kid in kids {
                out.push(Pid::from_raw(kid));
                stack.push(kid);
            }
        }
    }
    out
}

/// Parse the ppid out of /proc/<pid>/stat. The comm field may contain
/// spaces, so fields are split after the closing paren.
fn parent_of(pid: i32) -> Option<i32> {
    let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
    let rest = &stat[stat.rfind(')')? + 1..];
    rest.split_whitespace().nth(1)?.parse().ok()
}

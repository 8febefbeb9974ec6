//! Annotation tool process supervision.
//!
//! The tool is considered started once its port accepts TCP connections.
//! Stopping asks politely first (SIGTERM on unix) and kills after a
//! bounded wait.

use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use doclabel::config::AnnotatorSettings;
use tracing::{debug, info, warn};

use crate::SupervisorError;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A spawned annotation tool.
pub struct AnnotatorProcess {
    program: String,
    port: u16,
    process: Option<Child>,
}

impl AnnotatorProcess {
    /// Whether the configured program is on PATH.
    pub fn is_available(settings: &AnnotatorSettings) -> bool {
        which::which(&settings.program).is_ok()
    }

    /// Spawn the tool without waiting for it to listen.
    pub fn spawn(settings: &AnnotatorSettings) -> Result<Self, SupervisorError> {
        let binary = which::which(&settings.program)
            .map_err(|_| SupervisorError::NotFound(settings.program.clone()))?;
        let args = settings.command_args();
        info!("Starting {} {}", settings.program, args.join(" "));

        let mut process = Command::new(&binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SupervisorError::Spawn {
                program: settings.program.clone(),
                source: e,
            })?;

        if let Some(stderr) = process.stderr.take() {
            let program = settings.program.clone();
            std::thread::spawn(move || {
                let reader = BufReader::new(stderr);
                for line in reader.lines().map_while(Result::ok) {
                    if line.contains("ERROR") || line.contains("Traceback") {
                        warn!("{}: {}", program, line);
                    } else {
                        debug!("{}: {}", program, line);
                    }
                }
            });
        }

        Ok(Self {
            program: settings.program.clone(),
            port: settings.port,
            process: Some(process),
        })
    }

    /// Spawn the tool and wait until `127.0.0.1:<port>` accepts connections.
    ///
    /// The process is killed if it does not come up within the start timeout.
    pub async fn start(settings: &AnnotatorSettings) -> Result<Self, SupervisorError> {
        let mut annotator = Self::spawn(settings)?;
        match annotator.wait_ready(settings.start_timeout).await {
            Ok(()) => {
                info!("{} ready on port {}", annotator.program, annotator.port);
                Ok(annotator)
            }
            Err(e) => {
                annotator.kill();
                Err(e)
            }
        }
    }

    async fn wait_ready(&mut self, timeout: Duration) -> Result<(), SupervisorError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if let Some(status) = self.try_wait()? {
                return Err(SupervisorError::Exited {
                    program: self.program.clone(),
                    status: status.to_string(),
                });
            }
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                return Ok(());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        Err(SupervisorError::StartTimeout {
            program: self.program.clone(),
            port: self.port,
            secs: timeout.as_secs(),
        })
    }

    fn try_wait(&mut self) -> Result<Option<std::process::ExitStatus>, SupervisorError> {
        match self.process.as_mut() {
            Some(process) => Ok(process.try_wait()?),
            None => Ok(None),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn id(&self) -> Option<u32> {
        self.process.as_ref().map(Child::id)
    }

    /// Whether the process is still running.
    pub fn is_running(&mut self) -> bool {
        matches!(self.try_wait(), Ok(None)) && self.process.is_some()
    }

    /// Terminate, wait up to `timeout`, then kill.
    pub async fn stop(&mut self, timeout: Duration) -> Result<(), SupervisorError> {
        let Some(mut process) = self.process.take() else {
            return Ok(());
        };
        if process.try_wait()?.is_some() {
            return Ok(());
        }

        info!("Stopping {}...", self.program);
        terminate(&mut process);

        let start = Instant::now();
        while start.elapsed() < timeout {
            if process.try_wait()?.is_some() {
                debug!("{} exited", self.program);
                return Ok(());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        warn!(
            "{} did not exit within {}s; killing",
            self.program,
            timeout.as_secs()
        );
        process.kill()?;
        process.wait()?;
        Ok(())
    }

    fn kill(&mut self) {
        if let Some(mut process) = self.process.take() {
            let _ = process.kill();
            let _ = process.wait();
        }
    }
}

#[cfg(unix)]
fn terminate(process: &mut Child) {
    // SAFETY: signalling a child we spawned and have not yet reaped
    let rc = unsafe { libc::kill(process.id() as libc::pid_t, libc::SIGTERM) };
    if rc != 0 {
        let _ = process.kill();
    }
}

#[cfg(not(unix))]
fn terminate(process: &mut Child) {
    let _ = process.kill();
}

impl Drop for AnnotatorProcess {
    fn drop(&mut self) {
        self.kill();
    }
}

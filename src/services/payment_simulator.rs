use crate::{
    errors::ServiceError,
    models::{format_crypto, format_fiat, Credential, ExchangeQuote, SimulationOutcome},
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::{process::Stdio, time::Duration};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Command,
    task::JoinHandle,
};
use tracing::{debug, error, info, instrument, warn};

const REDACTED: &str = "***";

/// How long to keep draining pipes after a timed-out child has been killed
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Runs one payment simulation for a crypto amount
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentSimulator: Send + Sync {
    async fn run_simulation(
        &self,
        crypto_amount: Decimal,
        credential: &Credential,
    ) -> Result<SimulationOutcome, ServiceError>;
}

/// Spawns the external simulation routine as a child process.
///
/// The command line is `program [args..] <crypto amount> <credential>`.
#[derive(Debug, Clone)]
pub struct ProcessSimulator {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ProcessSimulator {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }
}

#[async_trait]
impl PaymentSimulator for ProcessSimulator {
    #[instrument(skip(self, credential), fields(program = %self.program))]
    async fn run_simulation(
        &self,
        crypto_amount: Decimal,
        credential: &Credential,
    ) -> Result<SimulationOutcome, ServiceError> {
        let amount = format_crypto(crypto_amount);
        info!(%amount, "Starting payment simulation");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&amount)
            .arg(credential.expose())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                error!(error = %e, "Failed to launch payment simulator");
                ServiceError::SimulatorLaunchError(e.to_string())
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            ServiceError::SimulatorLaunchError("stdout was not captured".to_string())
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            ServiceError::SimulatorLaunchError("stderr was not captured".to_string())
        })?;

        let stdout_task = tokio::spawn(collect_output(stdout, credential.clone(), false));
        let stderr_task = tokio::spawn(collect_output(stderr, credential.clone(), true));

        let waited = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait()).await.ok(),
            None => Some(child.wait().await),
        };

        let outcome = match waited {
            Some(status) => {
                let status = status.map_err(|e| {
                    error!(error = %e, "Failed to wait for payment simulator");
                    ServiceError::SimulatorLaunchError(e.to_string())
                })?;
                let stdout = join_output(stdout_task, None).await;
                let stderr = join_output(stderr_task, None).await;
                info!(exit_code = ?status.code(), "Payment simulator exited");
                classify(status.code(), &stdout, &stderr)
            }
            None => {
                let limit = self.timeout.unwrap_or_default();
                warn!(timeout_secs = limit.as_secs(), "Payment simulation timed out");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill timed out payment simulator");
                }
                let stdout = join_output(stdout_task, Some(DRAIN_GRACE)).await;
                let stderr = join_output(stderr_task, Some(DRAIN_GRACE)).await;
                timed_out(limit, &stdout, &stderr)
            }
        };

        Ok(outcome)
    }
}

/// Reads a pipe line by line until EOF, scrubbing the credential
async fn collect_output<R>(pipe: R, credential: Credential, is_stderr: bool) -> String
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(pipe);
    let mut collected = String::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = redact(&String::from_utf8_lossy(&buf), &credential);
                if is_stderr {
                    warn!(line = %line.trim_end(), "Simulator stderr");
                } else {
                    debug!(line = %line.trim_end(), "Simulator stdout");
                }
                collected.push_str(&line);
            }
            Err(e) => {
                warn!(error = %e, "Failed reading simulator output");
                break;
            }
        }
    }

    collected
}

async fn join_output(task: JoinHandle<String>, grace: Option<Duration>) -> String {
    let joined = match grace {
        Some(grace) => match tokio::time::timeout(grace, task).await {
            Ok(joined) => joined,
            Err(_) => return String::new(),
        },
        None => task.await,
    };

    joined.unwrap_or_else(|e| {
        warn!(error = %e, "Simulator output reader failed");
        String::new()
    })
}

fn redact(text: &str, credential: &Credential) -> String {
    let secret = credential.expose();
    if secret.trim().is_empty() {
        return text.to_string();
    }
    text.replace(secret, REDACTED)
}

/// Maps an exit code and captured output to an outcome.
///
/// Success needs exit code 0 and something on stdout; a clean exit that only
/// wrote to stderr is a failure carrying the stderr text. `None` means the
/// process did not exit normally (killed by a signal).
pub fn classify(exit_code: Option<i32>, stdout: &str, stderr: &str) -> SimulationOutcome {
    match exit_code {
        Some(0) if !stdout.trim().is_empty() => SimulationOutcome {
            succeeded: true,
            log: stdout.to_string(),
        },
        _ => SimulationOutcome {
            succeeded: false,
            log: failure_detail(stdout, stderr),
        },
    }
}

fn timed_out(limit: Duration, stdout: &str, stderr: &str) -> SimulationOutcome {
    let mut log = failure_detail(stdout, stderr);
    if !log.is_empty() && !log.ends_with('\n') {
        log.push('\n');
    }
    log.push_str(&format!(
        "Simulation timed out after {} seconds.",
        limit.as_secs()
    ));
    SimulationOutcome {
        succeeded: false,
        log,
    }
}

fn failure_detail(stdout: &str, stderr: &str) -> String {
    if stderr.is_empty() {
        stdout.to_string()
    } else {
        stderr.to_string()
    }
}

/// Display prefix for a fiat code; unknown codes fall back to the upper-cased code and a space
fn currency_sign(fiat_currency: &str) -> String {
    match fiat_currency.to_ascii_lowercase().as_str() {
        "inr" => "₹".to_string(),
        "usd" => "$".to_string(),
        "eur" => "€".to_string(),
        "gbp" => "£".to_string(),
        other => format!("{} ", other.to_ascii_uppercase()),
    }
}

/// Header prepended to every simulation log, whatever the outcome
pub fn report_header(quote: &ExchangeQuote, fiat_currency: &str, crypto_symbol: &str) -> String {
    let sign = currency_sign(fiat_currency);
    format!(
        "--- Order & Exchange Rate ---\n\
         Order Total: {sign}{total}\n\
         Live {symbol} Price: {sign}{rate}\n\
         Calculated Payment: {amount} {symbol}\n\
         ---------------------------------\n\n",
        sign = sign,
        total = format_fiat(quote.fiat_amount),
        rate = quote.rate.normalize(),
        amount = quote.crypto_amount_display(),
        symbol = crypto_symbol,
    )
}

/// Full customer-facing log for one simulation run
pub fn final_report(header: &str, outcome: &SimulationOutcome) -> String {
    if outcome.succeeded {
        format!("{}{}", header, outcome.log)
    } else {
        format!("{}Error running simulation.\n\n{}", header, outcome.log)
    }
}

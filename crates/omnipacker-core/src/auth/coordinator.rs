use super::{EmailState, HardwareTokenState, QrState};
use crate::classify::{ClassifyContext, Signal};
use crate::job::{Credentials, Job, JobId};

/// What the scheduler should surface after an auth signal was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAction {
    ShowQr(String),
    QrLoggedIn { remembered: Option<String> },
    HardwareTokenPrompt,
    HardwareTokenConfirmed,
    EmailPrompt { provider: Option<String> },
    EmailCancelled,
    /// Scheduler must cancel the running phase and restart the job once it is terminal.
    RestartRequested,
}

/// Session-scoped auth state.
///
/// `remembered_qr_username` lives until the queue goes idle; `retry_in_flight`
/// lives from a rejected email code until the restarted job has been started.
#[derive(Debug, Default)]
pub struct AuthChallengeCoordinator {
    remembered_qr_username: Option<String>,
    retry_in_flight: Option<JobId>,
}

impl AuthChallengeCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remembered_qr_username(&self) -> Option<&str> {
        self.remembered_qr_username.as_deref()
    }

    pub fn retry_in_flight(&self) -> Option<JobId> {
        self.retry_in_flight
    }

    /// Capture context the classifier reads a line against.
    pub fn context(job: &Job) -> ClassifyContext {
        match &job.auth.qr {
            QrState::Capturing { art } => ClassifyContext {
                qr_capturing: true,
                qr_art_lines: art.len(),
            },
            _ => ClassifyContext::default(),
        }
    }

    /// Login snapshot handed to the runner. A QR job reuses the remembered
    /// username so it does not have to scan again.
    pub fn credentials_for(&self, job: &Job) -> Credentials {
        let mut creds = job.spec.credentials.clone();
        if creds.qr_enabled {
            if let Some(username) = &self.remembered_qr_username {
                creds.qr_enabled = false;
                creds.username = username.clone();
                creds.password.clear();
            }
        }
        creds
    }

    /// Applies one auth-related signal to `job`. Non-auth signals return `None`.
    pub fn apply(&mut self, job: &mut Job, signal: &Signal, line: &str) -> Option<AuthAction> {
        match signal {
            Signal::QrPromptStart => {
                job.auth.qr = QrState::Capturing { art: Vec::new() };
                job.qr_text = None;
                None
            }
            Signal::QrArtLine => {
                if let QrState::Capturing { art } = &mut job.auth.qr {
                    art.push(line.to_string());
                }
                None
            }
            Signal::QrCaptureEnd => {
                let QrState::Capturing { art } = std::mem::take(&mut job.auth.qr) else {
                    return None;
                };
                let text = art.join("\n");
                job.auth.qr = QrState::Displaying;
                job.qr_text = Some(text.clone());
                Some(AuthAction::ShowQr(text))
            }
            Signal::QrLoginSuccess { username } => {
                job.auth.qr = QrState::Idle;
                job.qr_text = None;
                if job.spec.credentials.qr_enabled {
                    if let Some(name) = username {
                        tracing::info!(job = %job.id(), "remembering QR login for this session");
                        self.remembered_qr_username = Some(name.clone());
                    }
                }
                Some(AuthAction::QrLoggedIn {
                    remembered: self.remembered_qr_username.clone(),
                })
            }
            Signal::HardwareTokenPrompt => {
                job.auth.hardware_token = HardwareTokenState::Pending;
                Some(AuthAction::HardwareTokenPrompt)
            }
            Signal::HardwareTokenConfirmed => {
                if job.auth.hardware_token != HardwareTokenState::Pending {
                    return None;
                }
                job.auth.hardware_token = HardwareTokenState::Idle;
                Some(AuthAction::HardwareTokenConfirmed)
            }
            Signal::EmailPrompt { provider } => {
                if job.auth.email == EmailState::RetryInFlight {
                    return None;
                }
                job.auth.email = EmailState::Pending {
                    provider: provider.clone(),
                };
                Some(AuthAction::EmailPrompt {
                    provider: provider.clone(),
                })
            }
            Signal::EmailNoCodeProvided => {
                if job.auth.email == EmailState::RetryInFlight {
                    return None;
                }
                job.auth.email = EmailState::Idle;
                Some(AuthAction::EmailCancelled)
            }
            Signal::EmailInvalidCode => {
                if !self.begin_retry(job.id()) {
                    tracing::debug!(job = %job.id(), "retry already in flight; ignoring rejected code");
                    return None;
                }
                job.auth.email = EmailState::RetryInFlight;
                Some(AuthAction::RestartRequested)
            }
            _ => None,
        }
    }

    /// Arms the single-flight guard. False if a retry is already in flight anywhere.
    pub fn begin_retry(&mut self, job: JobId) -> bool {
        if self.retry_in_flight.is_some() {
            return false;
        }
        self.retry_in_flight = Some(job);
        true
    }

    pub fn retry_pending_for(&self, job: JobId) -> bool {
        self.retry_in_flight == Some(job)
    }

    pub fn finish_retry(&mut self) {
        self.retry_in_flight = None;
    }

    /// Queue went idle: forget the remembered QR login.
    pub fn on_queue_idle(&mut self) {
        if self.remembered_qr_username.take().is_some() {
            tracing::debug!("queue idle; cleared remembered QR login");
        }
    }
}

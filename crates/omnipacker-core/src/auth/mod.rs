//! Authentication challenges surfaced by the downloader's login flow.
//!
//! Per job: QR capture, hardware-token confirmation and email-code
//! confirmation. Session-wide: the remembered QR username and the
//! single-flight retry guard, both owned by [`AuthChallengeCoordinator`].

mod coordinator;

pub use coordinator::{AuthAction, AuthChallengeCoordinator};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum QrState {
    #[default]
    Idle,
    /// Collecting art lines after the QR prompt.
    Capturing { art: Vec<String> },
    /// Capture finished; the code is on screen until login succeeds.
    Displaying,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HardwareTokenState {
    #[default]
    Idle,
    Pending,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EmailState {
    #[default]
    Idle,
    Pending { provider: Option<String> },
    /// An automatic cancel + restart is under way after a rejected code.
    RetryInFlight,
}

/// The three independent challenge sub-states of one job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthChallengeState {
    pub qr: QrState,
    pub hardware_token: HardwareTokenState,
    pub email: EmailState,
}

impl AuthChallengeState {
    pub fn qr_art(&self) -> &[String] {
        match &self.qr {
            QrState::Capturing { art } => art,
            _ => &[],
        }
    }

    pub fn email_pending(&self) -> bool {
        matches!(self.email, EmailState::Pending { .. })
    }

    pub fn hardware_token_pending(&self) -> bool {
        self.hardware_token == HardwareTokenState::Pending
    }
}

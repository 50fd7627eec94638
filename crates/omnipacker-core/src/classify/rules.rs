//! Ordered line rules. Each rule is a plain function so it can be tested
//! against literal sample lines.

use super::percent::extract_percent;
use super::{LineInput, Signal};
use crate::console::Stream;

/// Rules in the same category are mutually exclusive for one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Progress,
    Qr,
    HardwareToken,
    Email,
    Depots,
}

pub struct Rule {
    pub name: &'static str,
    pub category: Category,
    pub matcher: fn(&LineInput<'_>) -> Option<Signal>,
}

/// Evaluated top to bottom; first hit per category wins.
pub const LINE_RULES: &[Rule] = &[
    Rule {
        name: "progress_percent",
        category: Category::Progress,
        matcher: progress_percent,
    },
    Rule {
        name: "qr_login_success",
        category: Category::Qr,
        matcher: qr_login_success,
    },
    Rule {
        name: "qr_prompt_start",
        category: Category::Qr,
        matcher: qr_prompt_start,
    },
    Rule {
        name: "qr_art_line",
        category: Category::Qr,
        matcher: qr_art_line,
    },
    Rule {
        name: "qr_capture_end",
        category: Category::Qr,
        matcher: qr_capture_end,
    },
    Rule {
        name: "hardware_token_prompt",
        category: Category::HardwareToken,
        matcher: hardware_token_prompt,
    },
    Rule {
        name: "hardware_token_confirmed",
        category: Category::HardwareToken,
        matcher: hardware_token_confirmed,
    },
    Rule {
        name: "email_no_code",
        category: Category::Email,
        matcher: email_no_code,
    },
    Rule {
        name: "email_invalid_code",
        category: Category::Email,
        matcher: email_invalid_code,
    },
    Rule {
        name: "email_prompt",
        category: Category::Email,
        matcher: email_prompt,
    },
    Rule {
        name: "missing_depots",
        category: Category::Depots,
        matcher: missing_depots,
    },
];

const STEAM_GUARD: &str = "steam guard";
const QR_PROMPT: &str = "qr code";
const MIN_BLANK_ART_LEN: usize = 10;

fn lower(line: &str) -> String {
    line.to_lowercase()
}

fn is_box_glyph(ch: char) -> bool {
    // Box Drawing and Block Elements.
    ('\u{2500}'..='\u{259F}').contains(&ch)
}

/// QR art: any box/block glyph, or a whitespace-only line of at least 10 chars.
pub fn is_qr_art(line: &str) -> bool {
    if line.chars().any(is_box_glyph) {
        return true;
    }
    !line.is_empty()
        && line.chars().all(char::is_whitespace)
        && line.chars().count() >= MIN_BLANK_ART_LEN
}

fn progress_percent(input: &LineInput<'_>) -> Option<Signal> {
    extract_percent(input.line).map(Signal::Progress)
}

fn qr_login_success(input: &LineInput<'_>) -> Option<Signal> {
    let line = input.line;
    if !line.contains("-username") || !line.contains("-remember-password") {
        return None;
    }
    let mut parts = line.split_whitespace();
    let mut username = None;
    while let Some(part) = parts.next() {
        if part == "-username" {
            username = parts
                .next()
                .filter(|u| !u.starts_with('-'))
                .map(str::to_string);
            break;
        }
    }
    Some(Signal::QrLoginSuccess { username })
}

fn qr_prompt_start(input: &LineInput<'_>) -> Option<Signal> {
    lower(input.line)
        .contains(QR_PROMPT)
        .then_some(Signal::QrPromptStart)
}

fn qr_art_line(input: &LineInput<'_>) -> Option<Signal> {
    (input.ctx.qr_capturing && is_qr_art(input.line)).then_some(Signal::QrArtLine)
}

fn qr_capture_end(input: &LineInput<'_>) -> Option<Signal> {
    let ends = input.ctx.qr_capturing
        && input.ctx.qr_art_lines > 0
        && !input.line.trim().is_empty()
        && !is_qr_art(input.line);
    ends.then_some(Signal::QrCaptureEnd)
}

fn hardware_token_prompt(input: &LineInput<'_>) -> Option<Signal> {
    let l = lower(input.line);
    let mobile = l.contains("mobile app") && l.contains("confirm");
    (l.contains(STEAM_GUARD) && mobile).then_some(Signal::HardwareTokenPrompt)
}

fn hardware_token_confirmed(input: &LineInput<'_>) -> Option<Signal> {
    let exact = input.line.trim() == "Done!";
    let tagged = input.stream == Stream::Stdout && input.line.contains("Done!");
    (exact || tagged).then_some(Signal::HardwareTokenConfirmed)
}

fn email_no_code(input: &LineInput<'_>) -> Option<Signal> {
    let l = lower(input.line);
    (l.contains("no code was provided") || l.contains("no code provided"))
        .then_some(Signal::EmailNoCodeProvided)
}

fn email_invalid_code(input: &LineInput<'_>) -> Option<Signal> {
    if input.line.contains("InvalidLoginAuthCode") {
        return Some(Signal::EmailInvalidCode);
    }
    let l = lower(input.line);
    (l.contains("code") && l.contains("incorrect")).then_some(Signal::EmailInvalidCode)
}

fn email_prompt(input: &LineInput<'_>) -> Option<Signal> {
    let l = lower(input.line);
    if !l.contains(STEAM_GUARD) || !(l.contains("email") && l.contains("code")) {
        return None;
    }
    Some(Signal::EmailPrompt {
        provider: email_provider(input.line),
    })
}

/// Text between "email at " and the next colon.
fn email_provider(line: &str) -> Option<String> {
    const MARKER: &str = "email at ";
    let start = line.find(MARKER)? + MARKER.len();
    let rest = &line[start..];
    let end = rest.find(':').unwrap_or(rest.len());
    let provider = rest[..end].trim();
    (!provider.is_empty()).then(|| provider.to_string())
}

fn missing_depots(input: &LineInput<'_>) -> Option<Signal> {
    let l = lower(input.line);
    (l.contains("couldn't find any depots") || l.contains("found 0 depots"))
        .then_some(Signal::MissingDepotsWarning)
}

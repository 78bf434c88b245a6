//! Common test utilities
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDate;
use tokio::time::Instant;

use court_booker::captcha::OcrEngine;
use court_booker::config::AccountConfig;
use court_booker::error::Result;
use court_booker::notifications::{ChannelResult, DeliveryStatus, Notifier};
use court_booker::platform::classifier::{LOGIN_FAILURE_MARKER, RESERVATION_SUCCESS_MARKER};
use court_booker::platform::{CaptchaResponse, PlatformClient};
use court_booker::utils::error::TransportError;

pub const TOKEN: &str = "ASP.NET_SessionId=k3j2h1g0f9";

pub fn rejected_login_body() -> String {
    format!("<script>alert('{LOGIN_FAILURE_MARKER}');history.back();</script>")
}

pub fn accepted_login_body() -> String {
    "<html><body>歡迎登入</body></html>".to_string()
}

pub fn booked_body() -> String {
    format!("<script>window.location.href='{RESERVATION_SUCCESS_MARKER}';</script>")
}

pub fn account() -> AccountConfig {
    AccountConfig {
        login_id: "A123456789".to_string(),
        password: "secret".to_string(),
    }
}

/// OCR engine that always reads the same text
pub struct FixedOcr(pub &'static str);

#[async_trait]
impl OcrEngine for FixedOcr {
    async fn recognize(&self, _image: &[u8]) -> Result<String> {
        Ok(self.0.to_string())
    }
}

/// Scripted booking site
pub struct StubPlatform {
    /// Cookie issued with every captcha; `None` means no `Set-Cookie`
    pub session_token: Option<String>,
    /// Login bodies served in order; the last one repeats
    login_bodies: Mutex<VecDeque<String>>,
    /// Reservation call numbers (0-based) that fail with a transport error
    failing_reservations: Vec<usize>,
    /// Reservation call numbers (0-based) that panic mid-request
    panicking_reservations: Vec<usize>,

    pub captcha_fetches: AtomicUsize,
    pub login_submissions: AtomicUsize,
    pub submitted_captchas: Mutex<Vec<String>>,
    /// (court, elapsed since `epoch`) for every reservation call
    pub reservations: Mutex<Vec<(String, std::time::Duration)>>,
    epoch: Instant,
}

impl StubPlatform {
    pub fn new() -> Self {
        Self {
            session_token: Some(TOKEN.to_string()),
            login_bodies: Mutex::new(VecDeque::from([accepted_login_body()])),
            failing_reservations: Vec::new(),
            panicking_reservations: Vec::new(),
            captcha_fetches: AtomicUsize::new(0),
            login_submissions: AtomicUsize::new(0),
            submitted_captchas: Mutex::new(Vec::new()),
            reservations: Mutex::new(Vec::new()),
            epoch: Instant::now(),
        }
    }

    pub fn with_token(mut self, token: Option<&str>) -> Self {
        self.session_token = token.map(str::to_string);
        self
    }

    pub fn with_login_bodies(self, bodies: Vec<String>) -> Self {
        *self.login_bodies.lock().unwrap() = bodies.into();
        self
    }

    pub fn failing_reservation(mut self, call: usize) -> Self {
        self.failing_reservations.push(call);
        self
    }

    pub fn panicking_reservation(mut self, call: usize) -> Self {
        self.panicking_reservations.push(call);
        self
    }

    pub fn captcha_fetches(&self) -> usize {
        self.captcha_fetches.load(Ordering::SeqCst)
    }

    pub fn login_submissions(&self) -> usize {
        self.login_submissions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlatformClient for StubPlatform {
    async fn fetch_captcha_image(&self) -> std::result::Result<CaptchaResponse, TransportError> {
        self.captcha_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(CaptchaResponse {
            image: Bytes::from_static(b"\x89PNG fake"),
            session_token: self.session_token.clone(),
        })
    }

    async fn submit_login(
        &self,
        _token: &str,
        _credentials: &AccountConfig,
        captcha_text: &str,
    ) -> std::result::Result<String, TransportError> {
        self.login_submissions.fetch_add(1, Ordering::SeqCst);
        self.submitted_captchas
            .lock()
            .unwrap()
            .push(captcha_text.to_string());

        let mut bodies = self.login_bodies.lock().unwrap();
        let body = if bodies.len() > 1 {
            bodies.pop_front().unwrap()
        } else {
            bodies.front().cloned().unwrap_or_default()
        };
        Ok(body)
    }

    async fn submit_reservation(
        &self,
        _token: &str,
        _date: NaiveDate,
        _start_hour: u32,
        court: &str,
    ) -> std::result::Result<String, TransportError> {
        let call = {
            let mut reservations = self.reservations.lock().unwrap();
            reservations.push((court.to_string(), self.epoch.elapsed()));
            reservations.len() - 1
        };

        if self.panicking_reservations.contains(&call) {
            panic!("reservation call {call} blew up");
        }
        if self.failing_reservations.contains(&call) {
            return Err(TransportError::Timeout);
        }
        Ok(booked_body())
    }
}

/// Notifier that remembers every message
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, message: &str) -> ChannelResult<DeliveryStatus> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(DeliveryStatus::success(self.name(), 200))
    }
}

//! Captcha recognition
//!
//! The booking sites serve a short numeric captcha. An [`OcrEngine`] turns the
//! image into raw text; [`CaptchaSolver`] reduces that text to the first run
//! of ASCII digits and judges whether it is long enough to be worth a login
//! submission.

pub mod tesseract;

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use bytes::Bytes;
use regex::Regex;

use crate::error::{Error, Result};

pub use tesseract::TesseractEngine;

/// Captchas shorter than this are treated as OCR misreads
pub const MIN_CAPTCHA_DIGITS: usize = 5;

/// Raw image-to-text recognition
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognize text in an encoded image
    async fn recognize(&self, image: &[u8]) -> Result<String>;
}

/// One captcha image and what was read from it
///
/// Created fresh for every login iteration and dropped with it.
#[derive(Debug, Clone)]
pub struct CaptchaAttempt {
    /// Raw image bytes as served
    pub image: Bytes,
    /// First digit run found in the OCR output, if any
    pub digits: Option<String>,
    min_digits: usize,
}

impl CaptchaAttempt {
    /// Build an attempt from OCR output
    pub fn from_ocr_text(image: Bytes, ocr_text: &str, min_digits: usize) -> Self {
        Self {
            image,
            digits: first_digit_run(ocr_text),
            min_digits,
        }
    }

    /// Whether the recognized digits may be submitted
    pub fn is_valid(&self) -> bool {
        self.digits
            .as_ref()
            .is_some_and(|digits| digits.len() >= self.min_digits)
    }

    /// The captcha text to submit, or `CaptchaUnreadable`
    pub fn into_text(self) -> Result<String> {
        if self.is_valid() {
            // is_valid guarantees Some
            Ok(self.digits.unwrap_or_default())
        } else {
            Err(Error::CaptchaUnreadable {
                recognized: self.digits,
            })
        }
    }
}

/// First run of ASCII digits in `text`
pub fn first_digit_run(text: &str) -> Option<String> {
    static DIGITS_RE: OnceLock<Regex> = OnceLock::new();

    let re = DIGITS_RE.get_or_init(|| Regex::new(r"[0-9]+").expect("Invalid regex pattern"));

    re.find(text).map(|m| m.as_str().to_string())
}

/// Turns captcha images into [`CaptchaAttempt`]s
#[derive(Clone)]
pub struct CaptchaSolver {
    engine: Arc<dyn OcrEngine>,
    min_digits: usize,
}

impl CaptchaSolver {
    /// Create a solver with the default minimum length
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        Self {
            engine,
            min_digits: MIN_CAPTCHA_DIGITS,
        }
    }

    /// Override the minimum accepted digit count
    pub fn with_min_digits(mut self, min_digits: usize) -> Self {
        self.min_digits = min_digits;
        self
    }

    /// Recognize one captcha image
    ///
    /// Only engine failures are errors; unreadable text yields an invalid attempt.
    pub async fn solve(&self, image: Bytes) -> Result<CaptchaAttempt> {
        let text = self.engine.recognize(&image).await?;
        tracing::debug!(ocr_text = %text.trim(), "OCR output");
        Ok(CaptchaAttempt::from_ocr_text(image, &text, self.min_digits))
    }
}

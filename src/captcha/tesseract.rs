//! Tesseract-backed OCR
//!
//! The image is normalized to an 8-bit grayscale PNG and piped to the
//! `tesseract` CLI restricted to its `digits` character set.

use std::io::Cursor;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::OcrEngine;
use crate::error::{Error, Result};

/// OCR engine that shells out to `tesseract`
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: PathBuf,
    args: Vec<String>,
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            args: ["--oem", "3", "--psm", "6", "digits"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl TesseractEngine {
    /// Engine using `tesseract` from `PATH`
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific tesseract binary
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }
}

/// Decode any supported captcha format and re-encode as grayscale PNG
pub fn normalize_for_ocr(image: &[u8]) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(image)
        .map_err(|e| Error::Ocr(format!("Failed to decode captcha image: {e}")))?;

    let gray = DynamicImage::ImageLuma8(decoded.to_luma8());

    let mut png = Vec::new();
    gray.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| Error::Ocr(format!("Failed to encode captcha image: {e}")))?;

    Ok(png)
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(&self, image: &[u8]) -> Result<String> {
        let png = normalize_for_ocr(image)?;

        let mut child = Command::new(&self.binary)
            .arg("stdin")
            .arg("stdout")
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::Ocr(format!(
                    "Failed to start {}: {e}",
                    self.binary.display()
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&png)
                .await
                .map_err(|e| Error::Ocr(format!("Failed to write image to tesseract: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Error::Ocr(format!("tesseract did not finish: {e}")))?;

        if !output.status.success() {
            return Err(Error::Ocr(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn sample_png() -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(12, 6, |x, _| Rgb([(x * 20) as u8, 40, 200]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_normalize_produces_grayscale_png() {
        let normalized = normalize_for_ocr(&sample_png()).unwrap();
        let decoded = image::load_from_memory(&normalized).unwrap();

        assert_eq!(decoded.width(), 12);
        assert_eq!(decoded.height(), 6);
        assert!(matches!(decoded, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        let err = normalize_for_ocr(b"<html>not an image</html>").unwrap_err();
        assert!(matches!(err, Error::Ocr(_)));
    }

    #[tokio::test]
    async fn test_missing_binary_is_ocr_error() {
        let engine = TesseractEngine::new().with_binary("/nonexistent/tesseract-binary");
        let err = engine.recognize(&sample_png()).await.unwrap_err();
        assert!(matches!(err, Error::Ocr(_)));
    }
}

//! Response classification by marker substrings
//!
//! The booking sites give no structured status; outcome is read off the HTML.
//! Login and booking use opposite polarity and that asymmetry is kept as is:
//!
//! | Endpoint    | Marker                                                  | Marker present means |
//! |-------------|---------------------------------------------------------|----------------------|
//! | login       | `驗證碼錯誤` ("incorrect captcha")                       | failure              |
//! | reservation | `CG01.aspx?module=net_booking&files=booking_place&X=1`  | success              |

/// Login failure marker
pub const LOGIN_FAILURE_MARKER: &str = "驗證碼錯誤";

/// Reservation success marker; every venue redirects to the CG01 page on success
pub const RESERVATION_SUCCESS_MARKER: &str =
    "CG01.aspx?module=net_booking&files=booking_place&X=1";

/// How the presence of a marker maps to an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerPolarity {
    /// Marker present means the operation failed
    FailureIfPresent,
    /// Marker present means the operation succeeded
    SuccessIfPresent,
}

/// Classifies a response body as success or failure
pub trait ResponseClassifier: Send + Sync {
    /// Whether the body represents a successful operation
    fn is_success(&self, body: &str) -> bool;

    /// The marker string this classifier looks for
    fn marker(&self) -> &str;
}

/// Substring-based classifier
#[derive(Debug, Clone)]
pub struct MarkerClassifier {
    marker: String,
    polarity: MarkerPolarity,
}

impl MarkerClassifier {
    /// Create a classifier for an arbitrary marker
    pub fn new(marker: impl Into<String>, polarity: MarkerPolarity) -> Self {
        Self {
            marker: marker.into(),
            polarity,
        }
    }

    /// Login classifier: success iff the failure marker is absent
    pub fn login() -> Self {
        Self::new(LOGIN_FAILURE_MARKER, MarkerPolarity::FailureIfPresent)
    }

    /// Reservation classifier: success iff the success marker is present
    pub fn reservation() -> Self {
        Self::new(RESERVATION_SUCCESS_MARKER, MarkerPolarity::SuccessIfPresent)
    }

    pub fn polarity(&self) -> MarkerPolarity {
        self.polarity
    }
}

impl ResponseClassifier for MarkerClassifier {
    fn is_success(&self, body: &str) -> bool {
        let present = body.contains(&self.marker);
        match self.polarity {
            MarkerPolarity::FailureIfPresent => !present,
            MarkerPolarity::SuccessIfPresent => present,
        }
    }

    fn marker(&self) -> &str {
        &self.marker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_REJECTED_BODY: &str = r#"<html><body><script>alert('驗證碼錯誤');history.back();</script></body></html>"#;
    const LOGIN_OK_BODY: &str = r#"<html><body><a href="wd02.aspx?module=member&files=orderx_mt">會員專區</a></body></html>"#;
    const BOOKING_OK_BODY: &str = r#"<script>window.location.href='CG01.aspx?module=net_booking&files=booking_place&X=1&Y=1';</script>"#;
    const BOOKING_FULL_BODY: &str = r#"<script>alert('該時段已額滿');</script>"#;

    #[test]
    fn test_login_marker_present_is_failure() {
        assert!(!MarkerClassifier::login().is_success(LOGIN_REJECTED_BODY));
    }

    #[test]
    fn test_login_marker_absent_is_success() {
        assert!(MarkerClassifier::login().is_success(LOGIN_OK_BODY));
        assert!(MarkerClassifier::login().is_success(""));
    }

    #[test]
    fn test_reservation_marker_present_is_success() {
        assert!(MarkerClassifier::reservation().is_success(BOOKING_OK_BODY));
        assert!(MarkerClassifier::reservation()
            .is_success("CG01.aspx?module=net_booking&files=booking_place&X=1"));
    }

    #[test]
    fn test_reservation_marker_absent_is_failure() {
        assert!(!MarkerClassifier::reservation().is_success(BOOKING_FULL_BODY));
        assert!(!MarkerClassifier::reservation().is_success(""));
    }

    #[test]
    fn test_polarities_are_opposite() {
        assert_eq!(
            MarkerClassifier::login().polarity(),
            MarkerPolarity::FailureIfPresent
        );
        assert_eq!(
            MarkerClassifier::reservation().polarity(),
            MarkerPolarity::SuccessIfPresent
        );
    }
}

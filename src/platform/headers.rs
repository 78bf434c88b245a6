use rand::seq::SliceRandom;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE, REFERER,
    SET_COOKIE, USER_AGENT,
};

/// Pool of realistic User-Agent strings for rotation
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

/// Get a random user agent from the pool
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS.choose(&mut rng).unwrap_or(&USER_AGENTS[0])
}

/// Build browser-like headers for the booking site
///
/// `Accept-Encoding` is left to reqwest so that it matches the decoders compiled in.
///
/// # Arguments
///
/// * `user_agent` - User agent string (typically a modern browser UA)
/// * `referer` - Referer URL (the venue page)
/// * `cookie` - Session cookie to present, if any
pub fn build_browser_headers(user_agent: &str, referer: &str, cookie: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Ok(value) = HeaderValue::from_str(user_agent) {
        headers.insert(USER_AGENT, value);
    }
    if let Ok(value) = HeaderValue::from_str(referer) {
        headers.insert(REFERER, value);
    }
    if let Some(cookie) = cookie {
        match HeaderValue::from_str(cookie) {
            Ok(value) => {
                headers.insert(COOKIE, value);
            }
            Err(_) => tracing::warn!(
                len = cookie.len(),
                "Session token is not a valid Cookie header, sending without it"
            ),
        }
    }

    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-TW,zh;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers.insert(
        HeaderName::from_static("upgrade-insecure-requests"),
        HeaderValue::from_static("1"),
    );

    headers
}

/// Whether a session token can be sent back as a `Cookie` header
pub fn is_valid_cookie(token: &str) -> bool {
    HeaderValue::from_str(token).is_ok()
}

/// Extract the session token from a response's `Set-Cookie` headers
///
/// Keeps the `name=value` pair of every cookie and drops attributes such as
/// `path` or `HttpOnly`, so the result can be sent back verbatim as a
/// `Cookie` header.
pub fn session_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let pairs: Vec<&str> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('=') && !pair.starts_with('='))
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_browser_headers() {
        let headers = build_browser_headers(
            "Mozilla/5.0",
            "https://bwd.xuanen.com.tw/wd02.aspx",
            Some("ASP.NET_SessionId=abc"),
        );

        assert_eq!(
            headers.get(USER_AGENT).unwrap(),
            HeaderValue::from_static("Mozilla/5.0")
        );
        assert_eq!(
            headers.get(REFERER).unwrap(),
            HeaderValue::from_static("https://bwd.xuanen.com.tw/wd02.aspx")
        );
        assert_eq!(
            headers.get(COOKIE).unwrap(),
            HeaderValue::from_static("ASP.NET_SessionId=abc")
        );
        assert!(headers.contains_key(ACCEPT));
        assert!(headers.contains_key(ACCEPT_LANGUAGE));
        assert!(headers.contains_key("upgrade-insecure-requests"));
    }

    #[test]
    fn test_headers_without_cookie() {
        let headers = build_browser_headers("Mozilla/5.0", "https://example.com", None);
        assert!(!headers.contains_key(COOKIE));
    }

    #[test]
    fn test_unsendable_cookie_is_left_out() {
        assert!(!is_valid_cookie("ASP.NET_SessionId=壞掉"));
        assert!(!is_valid_cookie("ASP.NET_SessionId=a\nb"));
        assert!(is_valid_cookie("ASP.NET_SessionId=abc; lb=node2"));

        let headers = build_browser_headers(
            "Mozilla/5.0",
            "https://example.com",
            Some("ASP.NET_SessionId=壞掉"),
        );
        assert!(!headers.contains_key(COOKIE));
    }

    #[test]
    fn test_user_agent_rotation() {
        let mut agents = std::collections::HashSet::new();
        for _ in 0..100 {
            let agent = random_user_agent();
            assert!(USER_AGENTS.contains(&agent));
            agents.insert(agent);
        }
        assert!(agents.len() > 1, "User agents should rotate");
    }

    #[test]
    fn test_session_token_strips_attributes() {
        let mut headers = HeaderMap::new();
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("ASP.NET_SessionId=x1y2z3; path=/; HttpOnly; SameSite=Lax"),
        );

        assert_eq!(
            session_token_from_headers(&headers),
            Some("ASP.NET_SessionId=x1y2z3".to_string())
        );
    }

    #[test]
    fn test_session_token_joins_multiple_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("ASP.NET_SessionId=abc; path=/"),
        );
        headers.append(SET_COOKIE, HeaderValue::from_static("lb=node2; path=/"));

        assert_eq!(
            session_token_from_headers(&headers),
            Some("ASP.NET_SessionId=abc; lb=node2".to_string())
        );
    }

    #[test]
    fn test_missing_set_cookie() {
        assert_eq!(session_token_from_headers(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("; path=/"));
        assert_eq!(session_token_from_headers(&headers), None);
    }
}

use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{FromRequest, HttpRequest, HttpResponseBuilder, dev::Payload, error::ErrorBadRequest};
use futures::future::{Ready, ready};

pub const VIEW_SESSION_HEADER: &str = "x-view-session";
const MAX_LEN: usize = 64;

/// Identifies which schedule view a request acts on. Taken from the
/// `X-View-Session` header; a fresh id is issued when the header is absent
/// and echoed back so the caller can keep using it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSession(String);

impl ViewSession {
    pub fn id(&self) -> &str {
        &self.0
    }

    /// Stamps the session header on a response.
    pub fn echo<'a>(&self, res: &'a mut HttpResponseBuilder) -> &'a mut HttpResponseBuilder {
        match HeaderValue::from_str(&self.0) {
            Ok(value) => res.insert_header((HeaderName::from_static(VIEW_SESSION_HEADER), value)),
            Err(_) => res,
        }
    }
}

fn is_valid(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_LEN
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl FromRequest for ViewSession {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let id = match req.headers().get(VIEW_SESSION_HEADER) {
            None => uuid::Uuid::new_v4().to_string(),
            Some(value) => match value.to_str() {
                Ok(v) if is_valid(v.trim()) => v.trim().to_string(),
                _ => return ready(Err(ErrorBadRequest("Invalid X-View-Session header"))),
            },
        };
        ready(Ok(ViewSession(id)))
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    fn extract(req: TestRequest) -> Result<ViewSession, actix_web::Error> {
        let (req, mut payload) = req.to_http_parts();
        futures::executor::block_on(ViewSession::from_request(&req, &mut payload))
    }

    #[test]
    fn header_value_is_used() {
        let session = extract(TestRequest::default().insert_header((VIEW_SESSION_HEADER, "tab-1")))
            .unwrap();
        assert_eq!(session.id(), "tab-1");
    }

    #[test]
    fn missing_header_issues_uuid() {
        let a = extract(TestRequest::default()).unwrap();
        let b = extract(TestRequest::default()).unwrap();

        assert_eq!(a.id().len(), 36);
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_header_is_rejected() {
        assert!(extract(TestRequest::default().insert_header((VIEW_SESSION_HEADER, "a b/c"))).is_err());
    }
}

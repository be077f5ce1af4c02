use crate::{ApiError, Expect, Response};

/// Accepts or rejects a received response.
///
/// An explicit expectation is checked first, so a mismatch is reported even
/// for a non-error status. Without one, any status `>= 400` is rejected.
pub(crate) fn classify_response(response: Response, expect: &Expect) -> Result<Response, ApiError> {
    if !expect.accepts(response.status) || response.status >= 400 {
        return Err(ApiError::UnexpectedStatus {
            status: response.status,
            expected: expect.clone(),
            body: response.body,
        });
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderMap;

    use super::classify_response;
    use crate::{ApiError, Expect, Response};

    fn response(status: u16) -> Response {
        Response {
            status,
            headers: HeaderMap::new(),
            body: format!("body-{status}"),
        }
    }

    fn rejected_status(result: Result<Response, ApiError>) -> u16 {
        match result {
            Err(ApiError::UnexpectedStatus { status, body, .. }) => {
                assert_eq!(body, format!("body-{status}"));
                status
            }
            other => panic!("expected unexpected status error, got {other:?}"),
        }
    }

    #[test]
    fn explicit_mismatch_on_success_status_is_error() {
        let status = rejected_status(classify_response(response(201), &Expect::Status(200)));
        assert_eq!(status, 201);
    }

    #[test]
    fn error_status_without_expectation_is_error() {
        let status = rejected_status(classify_response(response(500), &Expect::Any));
        assert_eq!(status, 500);
    }

    #[test]
    fn success_without_expectation_passes_through() {
        let resp = classify_response(response(200), &Expect::Any).expect("must pass");
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, "body-200");
    }

    #[test]
    fn set_membership() {
        let expect = Expect::from([200, 204]);
        assert!(classify_response(response(204), &expect).is_ok());
        rejected_status(classify_response(response(202), &expect));
    }

    #[test]
    fn empty_set_only_rejects_error_statuses() {
        let expect = Expect::OneOf(Vec::new());
        assert!(classify_response(response(200), &expect).is_ok());
        assert_eq!(rejected_status(classify_response(response(502), &expect)), 502);
    }

    #[test]
    fn error_status_is_rejected_even_when_listed() {
        rejected_status(classify_response(response(404), &Expect::Status(404)));
    }

    #[test]
    fn redirect_status_without_expectation_passes() {
        assert!(classify_response(response(304), &Expect::Any).is_ok());
    }
}

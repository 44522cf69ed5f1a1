//! Attribute extraction from requests and responses

use armature_http_client::{Request, Response};
use opentelemetry::KeyValue;

/// Full request URL
pub const HTTP_URL: &str = "http.url";
/// Request method
pub const HTTP_METHOD: &str = "http.method";
/// Response status code
pub const HTTP_STATUS_CODE: &str = "http.status_code";
/// Protocol version of the response, e.g. `HTTP/1.1`
pub const HTTP_FLAVOR: &str = "http.flavor";

/// URL and method of the request; empty when there is no request.
pub fn request_attributes(request: Option<&Request>) -> Vec<KeyValue> {
    match request {
        Some(request) => vec![
            KeyValue::new(HTTP_URL, request.url().to_string()),
            KeyValue::new(HTTP_METHOD, request.method().as_str().to_owned()),
        ],
        None => Vec::new(),
    }
}

/// Status code and protocol of the response; empty when there is no response.
pub fn response_attributes(response: Option<&Response>) -> Vec<KeyValue> {
    match response {
        Some(response) => vec![
            KeyValue::new(HTTP_STATUS_CODE, i64::from(response.status().as_u16())),
            KeyValue::new(HTTP_FLAVOR, response.protocol()),
        ],
        None => Vec::new(),
    }
}

/// A new set holding `base` followed by `extra`. `base` is left untouched.
pub(crate) fn extend(base: &[KeyValue], extra: Vec<KeyValue>) -> Vec<KeyValue> {
    let mut attributes = Vec::with_capacity(base.len() + extra.len());
    attributes.extend_from_slice(base);
    attributes.extend(extra);
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use armature_http_client::{Method, StatusCode, Url, Version};
    use opentelemetry::Value;

    #[test]
    fn test_request_attributes() {
        let request = Request::new(
            Method::POST,
            Url::parse("http://localhost:8080/orders?id=1").unwrap(),
        );

        let attributes = request_attributes(Some(&request));
        assert_eq!(
            attributes,
            vec![
                KeyValue::new(HTTP_URL, "http://localhost:8080/orders?id=1"),
                KeyValue::new(HTTP_METHOD, "POST"),
            ]
        );
        assert!(request_attributes(None).is_empty());
    }

    #[test]
    fn test_response_attributes() {
        let response = Response::builder(Url::parse("http://localhost/").unwrap())
            .status(StatusCode::NOT_FOUND)
            .version(Version::HTTP_10)
            .build();

        let attributes = response_attributes(Some(&response));
        assert_eq!(attributes[0].value, Value::I64(404));
        assert_eq!(attributes[1].value, Value::from("HTTP/1.0"));
        assert!(response_attributes(None).is_empty());
    }

    #[test]
    fn test_extend_copies_base() {
        let base = vec![KeyValue::new("service.name", "status")];
        let extended = extend(&base, vec![KeyValue::new(HTTP_METHOD, "GET")]);

        assert_eq!(base.len(), 1);
        assert_eq!(extended.len(), 2);
        assert_eq!(extended[0], base[0]);
    }
}

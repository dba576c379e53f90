// Response analysis for authorder
// Extracts structured error fields from SNS error envelopes
//
// SNS answers query-protocol calls with an XML `ErrorResponse`; some
// gateways and newer endpoints answer with a JSON envelope instead. Both are
// reduced to the same optional code/type/message triple. Anything that
// cannot be read degrades to all-absent; parsing never fails.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

/// Structured fields of an error envelope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorFields {
    pub code: Option<String>,
    pub error_type: Option<String>,
    pub message: Option<String>,
}

impl ErrorFields {
    pub fn is_empty(&self) -> bool {
        self.code.is_none() && self.error_type.is_none() && self.message.is_none()
    }
}

/// Pulls error fields out of a response body.
pub trait ResponseParser: Send + Sync {
    fn parse(&self, body: &str) -> ErrorFields;
}

lazy_static! {
    // The first <Error> block; a response never carries more than one.
    static ref ERROR_BLOCK: Regex = Regex::new(r"(?s)<Error>(.*?)</Error>").unwrap();
    static ref CODE: Regex = Regex::new(r"(?s)<Code>\s*(.*?)\s*</Code>").unwrap();
    static ref TYPE: Regex = Regex::new(r"(?s)<Type>\s*(.*?)\s*</Type>").unwrap();
    static ref MESSAGE: Regex = Regex::new(r"(?s)<Message>\s*(.*?)\s*</Message>").unwrap();
}

/// Parser for SNS XML and JSON error envelopes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorEnvelopeParser;

impl ResponseParser for ErrorEnvelopeParser {
    fn parse(&self, body: &str) -> ErrorFields {
        let trimmed = body.trim_start();
        if trimmed.starts_with('{') {
            parse_json(trimmed)
        } else if trimmed.starts_with('<') {
            parse_xml(trimmed)
        } else {
            ErrorFields::default()
        }
    }
}

fn capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|cap| cap.get(1))
        .map(|m| unescape_xml(m.as_str()))
        .filter(|s| !s.is_empty())
}

fn parse_xml(body: &str) -> ErrorFields {
    let block = match ERROR_BLOCK.captures(body).and_then(|cap| cap.get(1)) {
        Some(m) => m.as_str(),
        None => return ErrorFields::default(),
    };
    ErrorFields {
        code: capture(&CODE, block),
        error_type: capture(&TYPE, block),
        message: capture(&MESSAGE, block),
    }
}

fn parse_json(body: &str) -> ErrorFields {
    let json: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return ErrorFields::default(),
    };
    // Query-style JSON nests the fields under "Error"
    let root = json.get("Error").filter(|v| v.is_object()).unwrap_or(&json);

    let text = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| root.get(*k).and_then(Value::as_str))
            .map(str::to_string)
            .filter(|s| !s.is_empty())
    };

    // "__type" looks like "com.amazonaws.sns#AuthorizationError"
    let code = text(&["Code", "code"]).or_else(|| {
        text(&["__type"]).map(|t| t.rsplit('#').next().unwrap_or(&t).to_string())
    });

    ErrorFields {
        code,
        error_type: text(&["Type", "type"]),
        message: text(&["Message", "message"]),
    }
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNS_AUTH_ERROR: &str = r#"<ErrorResponse xmlns="http://sns.amazonaws.com/doc/2010-03-31/">
  <Error>
    <Type>Sender</Type>
    <Code>AuthorizationError</Code>
    <Message>User: arn:aws:iam::123456789012:user/probe is not authorized to perform: SNS:Publish on resource: arn:aws:sns:us-east-1:123456789012:orders</Message>
  </Error>
  <RequestId>6c3d9f0e-4f0b-5a5c-9b43-3f1f5e2c1d11</RequestId>
</ErrorResponse>"#;

    #[test]
    fn parses_sns_xml_error() {
        let fields = ErrorEnvelopeParser.parse(SNS_AUTH_ERROR);
        assert_eq!(fields.code.as_deref(), Some("AuthorizationError"));
        assert_eq!(fields.error_type.as_deref(), Some("Sender"));
        assert!(fields.message.unwrap().contains("not authorized"));
    }

    #[test]
    fn unescapes_xml_entities() {
        let body = "<ErrorResponse><Error><Code>InvalidParameter</Code><Message>Invalid parameter: Message &lt;too long&gt; &amp; more</Message></Error></ErrorResponse>";
        let fields = ErrorEnvelopeParser.parse(body);
        assert_eq!(fields.message.as_deref(), Some("Invalid parameter: Message <too long> & more"));
        assert_eq!(fields.error_type, None);
    }

    #[test]
    fn success_xml_has_no_error_fields() {
        let body = "<PublishResponse><PublishResult><MessageId>1</MessageId></PublishResult></PublishResponse>";
        assert!(ErrorEnvelopeParser.parse(body).is_empty());
    }

    #[test]
    fn parses_json_type_suffix() {
        let body = r#"{"__type":"com.amazonaws.sns#NotFoundException","message":"Topic does not exist"}"#;
        let fields = ErrorEnvelopeParser.parse(body);
        assert_eq!(fields.code.as_deref(), Some("NotFoundException"));
        assert_eq!(fields.message.as_deref(), Some("Topic does not exist"));
    }

    #[test]
    fn parses_nested_json_error() {
        let body = r#"{"Error":{"Code":"InvalidParameter","Type":"Sender","Message":"bad"},"RequestId":"x"}"#;
        let fields = ErrorEnvelopeParser.parse(body);
        assert_eq!(fields.code.as_deref(), Some("InvalidParameter"));
        assert_eq!(fields.error_type.as_deref(), Some("Sender"));
    }

    #[test]
    fn garbage_degrades_to_absent() {
        for body in ["", "not xml", "{truncated", "<Error><Code>", "\u{0}\u{1}binary"] {
            assert!(ErrorEnvelopeParser.parse(body).is_empty(), "{:?}", body);
        }
    }
}

// Query-Protocol Form Encoding
//
// SNS accepts every action as an `application/x-www-form-urlencoded` POST
// body. The signer hashes exactly the bytes produced here, and the
// transport sends exactly those bytes, so both go through one function.

use crate::models::ParamMap;
use url::form_urlencoded;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Encode parameters as a form body, keys in sorted order.
pub fn encode_form(params: &ParamMap) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_in_key_order() {
        let mut params = ParamMap::new();
        params.insert("Version".to_string(), "2010-03-31".to_string());
        params.insert("Action".to_string(), "GetTopicAttributes".to_string());
        assert_eq!(encode_form(&params), "Action=GetTopicAttributes&Version=2010-03-31");
    }

    #[test]
    fn escapes_reserved_characters() {
        let mut params = ParamMap::new();
        params.insert("TopicArn".to_string(), "arn:aws:sns:us-east-1:123456789012:t".to_string());
        params.insert("Message".to_string(), "a b&c".to_string());
        let body = encode_form(&params);
        assert!(body.contains("Message=a+b%26c"));
        assert!(body.contains("TopicArn=arn%3Aaws%3Asns%3Aus-east-1%3A123456789012%3At"));
    }

    #[test]
    fn empty_map_encodes_to_empty_body() {
        assert_eq!(encode_form(&ParamMap::new()), "");
    }
}

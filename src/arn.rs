// ARN handling for authorder
// Parses target identifiers and derives the guaranteed-nonexistent target

use crate::error::{ProbeError, Result};
use std::fmt;
use uuid::Uuid;

/// Prefix of every generated nonexistent resource name.
pub const NONEXISTENT_PREFIX: &str = "authorder-nonexistent-";

/// A parsed Amazon Resource Name.
///
/// Only the shape is validated; whether the resource exists is never
/// checked here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arn {
    pub partition: String,
    pub service: String,
    pub region: String,
    pub account_id: String,
    pub resource: String,
}

impl Arn {
    /// Parse `arn:partition:service:region:account:resource`.
    ///
    /// The resource part may itself contain `:` (subscription ARNs do).
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| ProbeError::InvalidArn {
            arn: raw.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = raw.splitn(6, ':').collect();
        if parts.len() != 6 {
            return Err(invalid("expected 6 colon-separated fields"));
        }
        if parts[0] != "arn" {
            return Err(invalid("must start with `arn:`"));
        }

        let (partition, service, region, account_id, resource) =
            (parts[1], parts[2], parts[3], parts[4], parts[5]);

        if partition.is_empty() {
            return Err(invalid("empty partition"));
        }
        if service.is_empty() {
            return Err(invalid("empty service"));
        }
        if region.is_empty() {
            return Err(invalid("empty region"));
        }
        if account_id.len() != 12 || !account_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("account id must be 12 digits"));
        }
        if resource.is_empty() {
            return Err(invalid("empty resource"));
        }

        Ok(Self {
            partition: partition.to_string(),
            service: service.to_string(),
            region: region.to_string(),
            account_id: account_id.to_string(),
            resource: resource.to_string(),
        })
    }

    /// Same partition/service/region/account, different resource.
    pub fn with_resource(&self, resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..self.clone()
        }
    }

    /// DNS suffix of the partition's public endpoints.
    pub fn dns_suffix(&self) -> &'static str {
        match self.partition.as_str() {
            "aws-cn" => "amazonaws.com.cn",
            _ => "amazonaws.com",
        }
    }

    /// Default regional endpoint for the ARN's service.
    pub fn default_endpoint(&self) -> String {
        format!("https://{}.{}.{}/", self.service, self.region, self.dns_suffix())
    }
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:{}:{}:{}:{}:{}",
            self.partition, self.service, self.region, self.account_id, self.resource
        )
    }
}

/// Produces identifiers for resources that cannot exist.
pub trait IdentityGenerator: Send + Sync {
    /// Derive a syntactically valid ARN in the allowed target's
    /// partition, region and account whose resource does not exist.
    fn nonexistent_for(&self, allowed: &Arn) -> Arn;
}

/// Appends a fresh v4 UUID to a fixed prefix, so every run gets a name
/// nobody has created.
pub struct UuidIdentityGenerator;

impl IdentityGenerator for UuidIdentityGenerator {
    fn nonexistent_for(&self, allowed: &Arn) -> Arn {
        let name = format!("{}{}", NONEXISTENT_PREFIX, Uuid::new_v4().simple());
        allowed.with_resource(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOPIC: &str = "arn:aws:sns:us-east-1:123456789012:orders";

    #[test]
    fn parse_topic_arn() {
        let arn = Arn::parse(TOPIC).unwrap();
        assert_eq!(arn.partition, "aws");
        assert_eq!(arn.service, "sns");
        assert_eq!(arn.region, "us-east-1");
        assert_eq!(arn.account_id, "123456789012");
        assert_eq!(arn.resource, "orders");
        assert_eq!(arn.to_string(), TOPIC);
    }

    #[test]
    fn parse_keeps_colons_in_resource() {
        let raw = "arn:aws:sns:us-east-1:123456789012:orders:5f1c1a2e";
        let arn = Arn::parse(raw).unwrap();
        assert_eq!(arn.resource, "orders:5f1c1a2e");
        assert_eq!(arn.to_string(), raw);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(Arn::parse("orders").is_err());
        assert!(Arn::parse("urn:aws:sns:us-east-1:123456789012:orders").is_err());
        assert!(Arn::parse("arn:aws:sns:us-east-1:1234:orders").is_err());
        assert!(Arn::parse("arn:aws:sns::123456789012:orders").is_err());
        assert!(Arn::parse("arn:aws:sns:us-east-1:123456789012:").is_err());
    }

    #[test]
    fn endpoint_follows_partition() {
        let arn = Arn::parse(TOPIC).unwrap();
        assert_eq!(arn.default_endpoint(), "https://sns.us-east-1.amazonaws.com/");

        let cn = Arn::parse("arn:aws-cn:sns:cn-north-1:123456789012:orders").unwrap();
        assert_eq!(cn.default_endpoint(), "https://sns.cn-north-1.amazonaws.com.cn/");
    }

    #[test]
    fn nonexistent_keeps_scope_and_changes_resource() {
        let allowed = Arn::parse(TOPIC).unwrap();
        let first = UuidIdentityGenerator.nonexistent_for(&allowed);
        let second = UuidIdentityGenerator.nonexistent_for(&allowed);

        assert_eq!(first.partition, allowed.partition);
        assert_eq!(first.region, allowed.region);
        assert_eq!(first.account_id, allowed.account_id);
        assert!(first.resource.starts_with(NONEXISTENT_PREFIX));
        assert_ne!(first.resource, allowed.resource);
        assert_ne!(first, second);
        // Still a valid ARN
        assert!(Arn::parse(&first.to_string()).is_ok());
    }
}

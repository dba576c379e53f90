// Mutation catalog for authorder
// Structural parameter mutations used to probe validation-vs-authorization order
//
// Every mutation is a pure `(parameters, target) -> parameters` function that
// returns its input unchanged when the parameter it needs is absent. The
// catalog is applied to every action; mutations filter themselves, so no
// action-to-mutation table exists and adding a mutation is one new record.
//
// No mutation may touch `TopicArn` or `ResourceArn`: each leg of the probe
// triple must still hit its own resource after mutation.

use crate::models::ParamMap;
use std::fmt;

/// Parameters that identify the probed resource.
pub const RESOURCE_PARAMS: &[&str] = &["TopicArn", "ResourceArn"];

/// SNS limits that boundary mutations step one past.
pub const MAX_SUBJECT_CHARS: usize = 100;
pub const MAX_MESSAGE_BYTES: usize = 256 * 1024;
pub const MAX_LABEL_CHARS: usize = 80;
pub const MAX_TAG_VALUE_CHARS: usize = 256;

/// Tag key that the probe never attaches to any resource.
pub const NONEXISTENT_TAG_KEY: &str = "authorder-absent-tag";
/// Permission label that the probe never grants.
pub const NONEXISTENT_LABEL: &str = "authorder-absent-label";

/// (action, mutation) pairs proven not to change state when they succeed.
pub const NO_OP_SAFE_PAIRS: &[(&str, &str)] = &[
    ("UntagResource", "nonexistent-tag-key"),
    ("RemovePermission", "nonexistent-permission-label"),
];

/// True if a 200 for this pair cannot have changed anything.
pub fn is_no_op_safe(action: &str, mutation: &str) -> bool {
    NO_OP_SAFE_PAIRS
        .iter()
        .any(|(a, m)| *a == action && *m == mutation)
}

/// Kind of malformation a mutation introduces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Drops a required meta-parameter
    Structural,
    /// Invalid enum or action name
    ValueDomain,
    /// Value one past a documented limit
    Boundary,
    /// Malformed structured document
    Encoding,
    /// Off-by-one or non-canonical collection index
    Indexing,
    /// Valid request that cannot change state
    NoOpSafe,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MutationKind::Structural => "structural",
            MutationKind::ValueDomain => "value-domain",
            MutationKind::Boundary => "boundary",
            MutationKind::Encoding => "encoding",
            MutationKind::Indexing => "indexing",
            MutationKind::NoOpSafe => "no-op-safe",
        };
        f.write_str(s)
    }
}

/// One catalog entry.
#[derive(Debug, Clone, Copy)]
pub struct Mutation {
    pub id: &'static str,
    pub description: &'static str,
    pub kind: MutationKind,
    pub apply: fn(&ParamMap, &str) -> ParamMap,
}

impl Mutation {
    pub fn apply(&self, params: &ParamMap, target_id: &str) -> ParamMap {
        (self.apply)(params, target_id)
    }
}

pub static MUTATIONS: &[Mutation] = &[
    // Structural
    Mutation {
        id: "drop-version",
        description: "Remove the Version meta-parameter",
        kind: MutationKind::Structural,
        apply: drop_version,
    },
    Mutation {
        id: "drop-message",
        description: "Remove the required Message parameter",
        kind: MutationKind::Structural,
        apply: drop_message,
    },
    Mutation {
        id: "drop-attribute-value",
        description: "Remove AttributeValue while keeping AttributeName",
        kind: MutationKind::Structural,
        apply: drop_attribute_value,
    },
    // Value domain
    Mutation {
        id: "invalid-attribute-name",
        description: "Use an attribute name SNS does not define",
        kind: MutationKind::ValueDomain,
        apply: invalid_attribute_name,
    },
    Mutation {
        id: "invalid-protocol",
        description: "Subscribe with an unsupported protocol",
        kind: MutationKind::ValueDomain,
        apply: invalid_protocol,
    },
    Mutation {
        id: "invalid-action-name",
        description: "Grant an SNS action that does not exist",
        kind: MutationKind::ValueDomain,
        apply: invalid_action_name,
    },
    Mutation {
        id: "invalid-message-structure",
        description: "Set MessageStructure to a value other than json",
        kind: MutationKind::ValueDomain,
        apply: invalid_message_structure,
    },
    // Boundary
    Mutation {
        id: "oversized-subject",
        description: "Subject one character past the 100 character limit",
        kind: MutationKind::Boundary,
        apply: oversized_subject,
    },
    Mutation {
        id: "oversized-message",
        description: "Message one byte past the 256 KiB limit",
        kind: MutationKind::Boundary,
        apply: oversized_message,
    },
    Mutation {
        id: "oversized-label",
        description: "Permission label one character past the 80 character limit",
        kind: MutationKind::Boundary,
        apply: oversized_label,
    },
    Mutation {
        id: "oversized-tag-value",
        description: "Tag value one character past the 256 character limit",
        kind: MutationKind::Boundary,
        apply: oversized_tag_value,
    },
    // Encoding
    Mutation {
        id: "malformed-policy-document",
        description: "Truncated JSON data protection policy",
        kind: MutationKind::Encoding,
        apply: malformed_policy_document,
    },
    Mutation {
        id: "malformed-attribute-json",
        description: "Set the Policy attribute to truncated JSON",
        kind: MutationKind::Encoding,
        apply: malformed_attribute_json,
    },
    Mutation {
        id: "malformed-message-json",
        description: "Declare MessageStructure=json with a truncated JSON message",
        kind: MutationKind::Encoding,
        apply: malformed_message_json,
    },
    Mutation {
        id: "malformed-binary-attribute",
        description: "Binary message attribute that is not valid base64",
        kind: MutationKind::Encoding,
        apply: malformed_binary_attribute,
    },
    // Indexing
    Mutation {
        id: "zero-index-tag-key",
        description: "Tag key list starting at index 0 instead of 1",
        kind: MutationKind::Indexing,
        apply: zero_index_tag_key,
    },
    Mutation {
        id: "sparse-tag-index",
        description: "Tag list starting at index 2, leaving a gap",
        kind: MutationKind::Indexing,
        apply: sparse_tag_index,
    },
    Mutation {
        id: "zero-index-account",
        description: "Account id list starting at index 0 instead of 1",
        kind: MutationKind::Indexing,
        apply: zero_index_account,
    },
    Mutation {
        id: "sparse-batch-entry",
        description: "Batch entry list starting at index 2, leaving a gap",
        kind: MutationKind::Indexing,
        apply: sparse_batch_entry,
    },
    // No-op safe
    Mutation {
        id: "nonexistent-tag-key",
        description: "Remove a tag key that is not attached to the resource",
        kind: MutationKind::NoOpSafe,
        apply: nonexistent_tag_key,
    },
    Mutation {
        id: "nonexistent-permission-label",
        description: "Remove a permission label that was never granted",
        kind: MutationKind::NoOpSafe,
        apply: nonexistent_permission_label,
    },
];

/// Look up a mutation by id.
pub fn find_mutation(id: &str) -> Option<&'static Mutation> {
    MUTATIONS.iter().find(|m| m.id == id)
}

// ============================================
// Helpers
// ============================================

fn without(params: &ParamMap, key: &str) -> ParamMap {
    let mut out = params.clone();
    out.remove(key);
    out
}

/// Replace the value of `key` if present; identity otherwise.
fn replace(params: &ParamMap, key: &str, value: impl Into<String>) -> ParamMap {
    let mut out = params.clone();
    if let Some(slot) = out.get_mut(key) {
        *slot = value.into();
    }
    out
}

/// Rename an exact key, keeping its value.
fn move_key(params: &ParamMap, from: &str, to: &str) -> ParamMap {
    let mut out = params.clone();
    if let Some(value) = out.remove(from) {
        out.insert(to.to_string(), value);
    }
    out
}

/// Rename every key under `from` (e.g. `Tags.member.1.`) to `to`.
fn move_prefix(params: &ParamMap, from: &str, to: &str) -> ParamMap {
    params
        .iter()
        .map(|(key, value)| match key.strip_prefix(from) {
            Some(rest) => (format!("{}{}", to, rest), value.clone()),
            None => (key.clone(), value.clone()),
        })
        .collect()
}

fn repeat_char(c: char, n: usize) -> String {
    std::iter::repeat(c).take(n).collect()
}

// ============================================
// Transforms
// ============================================

fn drop_version(params: &ParamMap, _target: &str) -> ParamMap {
    without(params, "Version")
}

fn drop_message(params: &ParamMap, _target: &str) -> ParamMap {
    without(params, "Message")
}

fn drop_attribute_value(params: &ParamMap, _target: &str) -> ParamMap {
    without(params, "AttributeValue")
}

fn invalid_attribute_name(params: &ParamMap, _target: &str) -> ParamMap {
    replace(params, "AttributeName", "AuthorderUndefinedAttribute")
}

fn invalid_protocol(params: &ParamMap, _target: &str) -> ParamMap {
    replace(params, "Protocol", "carrier-pigeon")
}

fn invalid_action_name(params: &ParamMap, _target: &str) -> ParamMap {
    replace(params, "ActionName.member.1", "AuthorderUndefinedAction")
}

fn invalid_message_structure(params: &ParamMap, _target: &str) -> ParamMap {
    if !params.contains_key("Message") {
        return params.clone();
    }
    let mut out = params.clone();
    out.insert("MessageStructure".to_string(), "xml".to_string());
    out
}

fn oversized_subject(params: &ParamMap, _target: &str) -> ParamMap {
    replace(params, "Subject", repeat_char('s', MAX_SUBJECT_CHARS + 1))
}

fn oversized_message(params: &ParamMap, _target: &str) -> ParamMap {
    replace(params, "Message", repeat_char('m', MAX_MESSAGE_BYTES + 1))
}

fn oversized_label(params: &ParamMap, _target: &str) -> ParamMap {
    replace(params, "Label", repeat_char('l', MAX_LABEL_CHARS + 1))
}

fn oversized_tag_value(params: &ParamMap, _target: &str) -> ParamMap {
    replace(params, "Tags.member.1.Value", repeat_char('v', MAX_TAG_VALUE_CHARS + 1))
}

fn malformed_policy_document(params: &ParamMap, _target: &str) -> ParamMap {
    replace(params, "DataProtectionPolicy", r#"{"Name":"authorder","Statement":["#)
}

fn malformed_attribute_json(params: &ParamMap, _target: &str) -> ParamMap {
    if !params.contains_key("AttributeValue") {
        return params.clone();
    }
    let mut out = params.clone();
    out.insert("AttributeName".to_string(), "Policy".to_string());
    out.insert("AttributeValue".to_string(), r#"{"Version":"2012-10-17","Statement":["#.to_string());
    out
}

fn malformed_message_json(params: &ParamMap, _target: &str) -> ParamMap {
    if !params.contains_key("Message") {
        return params.clone();
    }
    let mut out = params.clone();
    out.insert("MessageStructure".to_string(), "json".to_string());
    out.insert("Message".to_string(), r#"{"default":"#.to_string());
    out
}

fn malformed_binary_attribute(params: &ParamMap, _target: &str) -> ParamMap {
    replace(params, "MessageAttributes.entry.1.Value.BinaryValue", "***not base64***")
}

fn zero_index_tag_key(params: &ParamMap, _target: &str) -> ParamMap {
    move_key(params, "TagKeys.member.1", "TagKeys.member.0")
}

fn sparse_tag_index(params: &ParamMap, _target: &str) -> ParamMap {
    if !params.contains_key("Tags.member.1.Key") {
        return params.clone();
    }
    move_prefix(params, "Tags.member.1.", "Tags.member.2.")
}

fn zero_index_account(params: &ParamMap, _target: &str) -> ParamMap {
    move_key(params, "AWSAccountId.member.1", "AWSAccountId.member.0")
}

fn sparse_batch_entry(params: &ParamMap, _target: &str) -> ParamMap {
    if !params.contains_key("PublishBatchRequestEntries.member.1.Id") {
        return params.clone();
    }
    move_prefix(
        params,
        "PublishBatchRequestEntries.member.1.",
        "PublishBatchRequestEntries.member.2.",
    )
}

fn nonexistent_tag_key(params: &ParamMap, _target: &str) -> ParamMap {
    replace(params, "TagKeys.member.1", NONEXISTENT_TAG_KEY)
}

fn nonexistent_permission_label(params: &ParamMap, _target: &str) -> ParamMap {
    // AddPermission also carries a Label; changing it there would grant.
    if params.get("Action").map(String::as_str) != Some("RemovePermission") {
        return params.clone();
    }
    replace(params, "Label", NONEXISTENT_LABEL)
}

// SNS action catalog
//
// One record per operation. Every builder emits `Action`, `Version` and the
// resource-identifying parameter under the exact name SNS expects for that
// operation (`TopicArn` for topic APIs, `ResourceArn` for tagging and data
// protection APIs).

use super::{Action, ActionOrder};
use crate::models::{ActionCategory, ParamMap};
use base64::{engine::general_purpose, Engine as _};

pub const API_VERSION: &str = "2010-03-31";

/// Label used by the AddPermission / RemovePermission pair.
pub const PROBE_LABEL: &str = "authorder-probe";
/// Tag key written by TagResource and removed by UntagResource.
pub const PROBE_TAG_KEY: &str = "authorder-probe";
pub const PROBE_MESSAGE: &str = "authorder probe message";

pub static ACTIONS: &[Action] = &[
    Action {
        name: "GetTopicAttributes",
        category: ActionCategory::Read,
        safe: true,
        order: ActionOrder::Free,
        resource_param: "TopicArn",
        build: get_topic_attributes,
    },
    Action {
        name: "ListSubscriptionsByTopic",
        category: ActionCategory::Read,
        safe: true,
        order: ActionOrder::Free,
        resource_param: "TopicArn",
        build: list_subscriptions_by_topic,
    },
    Action {
        name: "ListTagsForResource",
        category: ActionCategory::Read,
        safe: true,
        order: ActionOrder::Free,
        resource_param: "ResourceArn",
        build: list_tags_for_resource,
    },
    Action {
        name: "GetDataProtectionPolicy",
        category: ActionCategory::Read,
        safe: true,
        order: ActionOrder::Free,
        resource_param: "ResourceArn",
        build: get_data_protection_policy,
    },
    Action {
        name: "SetTopicAttributes",
        category: ActionCategory::Write,
        safe: false,
        order: ActionOrder::Free,
        resource_param: "TopicArn",
        build: set_topic_attributes,
    },
    Action {
        name: "Publish",
        category: ActionCategory::Write,
        safe: false,
        order: ActionOrder::Free,
        resource_param: "TopicArn",
        build: publish,
    },
    Action {
        name: "PublishBatch",
        category: ActionCategory::Write,
        safe: false,
        order: ActionOrder::Free,
        resource_param: "TopicArn",
        build: publish_batch,
    },
    Action {
        name: "Subscribe",
        category: ActionCategory::Write,
        safe: false,
        order: ActionOrder::Free,
        resource_param: "TopicArn",
        build: subscribe,
    },
    Action {
        name: "ConfirmSubscription",
        category: ActionCategory::Write,
        safe: true,
        order: ActionOrder::Free,
        resource_param: "TopicArn",
        build: confirm_subscription,
    },
    Action {
        name: "TagResource",
        category: ActionCategory::Write,
        safe: false,
        order: ActionOrder::Free,
        resource_param: "ResourceArn",
        build: tag_resource,
    },
    Action {
        name: "UntagResource",
        category: ActionCategory::Write,
        safe: true,
        order: ActionOrder::Free,
        resource_param: "ResourceArn",
        build: untag_resource,
    },
    Action {
        name: "PutDataProtectionPolicy",
        category: ActionCategory::Write,
        safe: false,
        order: ActionOrder::Free,
        resource_param: "ResourceArn",
        build: put_data_protection_policy,
    },
    Action {
        name: "AddPermission",
        category: ActionCategory::Write,
        safe: false,
        order: ActionOrder::Grant { revoke: "RemovePermission" },
        resource_param: "TopicArn",
        build: add_permission,
    },
    Action {
        name: "RemovePermission",
        category: ActionCategory::Write,
        safe: true,
        order: ActionOrder::Revoke,
        resource_param: "TopicArn",
        build: remove_permission,
    },
    Action {
        name: "DeleteTopic",
        category: ActionCategory::Write,
        safe: false,
        order: ActionOrder::Destructive,
        resource_param: "TopicArn",
        build: delete_topic,
    },
];

fn base(action: &str, resource_param: &str, target: &str) -> ParamMap {
    let mut params = ParamMap::new();
    params.insert("Action".to_string(), action.to_string());
    params.insert("Version".to_string(), API_VERSION.to_string());
    params.insert(resource_param.to_string(), target.to_string());
    params
}

fn set(params: &mut ParamMap, key: &str, value: impl Into<String>) {
    params.insert(key.to_string(), value.into());
}

/// Account id field of an ARN, empty if the identifier is not ARN-shaped.
fn account_of(target: &str) -> &str {
    target.split(':').nth(4).unwrap_or("")
}

fn get_topic_attributes(target: &str) -> ParamMap {
    base("GetTopicAttributes", "TopicArn", target)
}

fn list_subscriptions_by_topic(target: &str) -> ParamMap {
    base("ListSubscriptionsByTopic", "TopicArn", target)
}

fn list_tags_for_resource(target: &str) -> ParamMap {
    base("ListTagsForResource", "ResourceArn", target)
}

fn get_data_protection_policy(target: &str) -> ParamMap {
    base("GetDataProtectionPolicy", "ResourceArn", target)
}

fn set_topic_attributes(target: &str) -> ParamMap {
    let mut params = base("SetTopicAttributes", "TopicArn", target);
    set(&mut params, "AttributeName", "DisplayName");
    set(&mut params, "AttributeValue", "authorder");
    params
}

fn publish(target: &str) -> ParamMap {
    let mut params = base("Publish", "TopicArn", target);
    set(&mut params, "Message", PROBE_MESSAGE);
    set(&mut params, "Subject", "authorder");
    set(&mut params, "MessageAttributes.entry.1.Name", "probe");
    set(&mut params, "MessageAttributes.entry.1.Value.DataType", "Binary");
    set(
        &mut params,
        "MessageAttributes.entry.1.Value.BinaryValue",
        general_purpose::STANDARD.encode(b"authorder"),
    );
    params
}

fn publish_batch(target: &str) -> ParamMap {
    let mut params = base("PublishBatch", "TopicArn", target);
    set(&mut params, "PublishBatchRequestEntries.member.1.Id", "probe-1");
    set(&mut params, "PublishBatchRequestEntries.member.1.Message", PROBE_MESSAGE);
    params
}

fn subscribe(target: &str) -> ParamMap {
    let mut params = base("Subscribe", "TopicArn", target);
    set(&mut params, "Protocol", "https");
    set(&mut params, "Endpoint", "https://example.invalid/authorder");
    params
}

fn confirm_subscription(target: &str) -> ParamMap {
    let mut params = base("ConfirmSubscription", "TopicArn", target);
    // Never issued by SNS, so confirmation cannot succeed.
    set(&mut params, "Token", "authorder0000000000000000000000000000000000000000");
    params
}

fn tag_resource(target: &str) -> ParamMap {
    let mut params = base("TagResource", "ResourceArn", target);
    set(&mut params, "Tags.member.1.Key", PROBE_TAG_KEY);
    set(&mut params, "Tags.member.1.Value", "1");
    params
}

fn untag_resource(target: &str) -> ParamMap {
    let mut params = base("UntagResource", "ResourceArn", target);
    set(&mut params, "TagKeys.member.1", PROBE_TAG_KEY);
    params
}

fn put_data_protection_policy(target: &str) -> ParamMap {
    let mut params = base("PutDataProtectionPolicy", "ResourceArn", target);
    let policy = serde_json::json!({
        "Name": "authorder",
        "Description": "",
        "Version": "2021-06-01",
        "Statement": []
    });
    set(&mut params, "DataProtectionPolicy", policy.to_string());
    params
}

fn add_permission(target: &str) -> ParamMap {
    let mut params = base("AddPermission", "TopicArn", target);
    set(&mut params, "Label", PROBE_LABEL);
    set(&mut params, "AWSAccountId.member.1", account_of(target));
    set(&mut params, "ActionName.member.1", "Publish");
    params
}

fn remove_permission(target: &str) -> ParamMap {
    let mut params = base("RemovePermission", "TopicArn", target);
    set(&mut params, "Label", PROBE_LABEL);
    params
}

fn delete_topic(target: &str) -> ParamMap {
    base("DeleteTopic", "TopicArn", target)
}

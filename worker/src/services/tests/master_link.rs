use shared::WorkerMessage;

use crate::services::master_link::link_for;
use crate::services::DetachedLink;
use crate::traits::MasterLink;

#[test]
fn test_stdout_channel_selects_connected_link() {
    assert!(link_for(Some("stdout")).is_connected());
}

#[test]
fn test_missing_or_unknown_channel_is_detached() {
    assert!(!link_for(None).is_connected());
    assert!(!link_for(Some("")).is_connected());
    assert!(!link_for(Some("ipc")).is_connected());
}

#[test]
fn test_detached_link_drops_messages_without_error() {
    let message = WorkerMessage::RequestCounts {
        request_count: 4,
        custom_request_count: 1,
    };

    assert!(DetachedLink.send(&message).is_ok());
}
